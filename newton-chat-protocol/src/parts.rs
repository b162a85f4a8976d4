//! Unified message mini-language.
//!
//! A message `text` may be a sequence of typed segments:
//!
//! ```text
//! Some intro text
//! ####code#:
//! print(1)
//! ####ol#:
//! - first
//! - key::bot::second
//! ```
//!
//! Segments are separated by [`SEGMENT_MARKER`]; each segment may start with
//! a type name terminated by [`TYPE_DELIMITER`].

use serde::{Deserialize, Serialize};

/// Separates segments of a unified message.
pub const SEGMENT_MARKER: &str = "####";
/// Separates a segment's type name from its body.
pub const TYPE_DELIMITER: &str = "#:";
/// Separates an explicit option key from its label.
pub const OPTION_KEY_SEPARATOR: &str = "::bot::";

/// Kind of a parsed message segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessagePartType {
    Text,
    Html,
    WebPanel,
    TextPanel,
    HtmlPanel,
    Ul,
    Ol,
    Ful,
    Fol,
    Form,
    Code,
    DirectCode,
    Input,
    Metadata,
    Markdown,
}

impl MessagePartType {
    /// Look up a segment type name. Case-insensitive; unknown names are text.
    pub fn from_alias(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "t" | "text" => Self::Text,
            "h" | "html" => Self::Html,
            "u" | "ul" | "unordered" => Self::Ul,
            "o" | "ol" | "ordered" => Self::Ol,
            "fu" | "ful" | "full-unordered" => Self::Ful,
            "fo" | "fol" | "full-ordered" => Self::Fol,
            "c" | "code" => Self::Code,
            "dc" | "direct-code" => Self::DirectCode,
            "i" | "input" => Self::Input,
            "w" | "web" | "web-panel" => Self::WebPanel,
            "html-panel" => Self::HtmlPanel,
            "text-panel" => Self::TextPanel,
            "f" | "form" => Self::Form,
            "md" | "markdown" => Self::Markdown,
            "m" | "meta" | "metadata" => Self::Metadata,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::WebPanel => "web-panel",
            Self::TextPanel => "text-panel",
            Self::HtmlPanel => "html-panel",
            Self::Ul => "ul",
            Self::Ol => "ol",
            Self::Ful => "ful",
            Self::Fol => "fol",
            Self::Form => "form",
            Self::Code => "code",
            Self::DirectCode => "direct-code",
            Self::Input => "input",
            Self::Metadata => "metadata",
            Self::Markdown => "markdown",
        }
    }

    /// Segments rendered in a side panel instead of inline.
    pub fn is_panel(self) -> bool {
        matches!(self, Self::WebPanel | Self::TextPanel | Self::HtmlPanel)
    }

    /// The option-list kind for list segments, if any.
    pub fn option_list(self) -> Option<OptionListKind> {
        match self {
            Self::Ul | Self::Ful => Some(OptionListKind::Unordered),
            Self::Ol | Self::Fol => Some(OptionListKind::Ordered),
            _ => None,
        }
    }

    pub fn is_option_list(self) -> bool {
        self.option_list().is_some()
    }
}

impl std::fmt::Display for MessagePartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed segment of a unified message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub part_type: MessagePartType,
    /// Trimmed body.
    pub text: String,
    /// Raw segment as found between markers, used to reassemble losslessly.
    pub source: String,
}

/// Split a message text into typed segments.
///
/// Segments that are empty after trimming are dropped.
pub fn split_unified_message(text: &str) -> Vec<MessagePart> {
    text.split(SEGMENT_MARKER)
        .filter_map(|source| {
            let trimmed = source.trim();
            if trimmed.is_empty() {
                return None;
            }
            let (part_type, body) = match trimmed.split_once(TYPE_DELIMITER) {
                Some((name, body)) => (MessagePartType::from_alias(name), body.trim()),
                None => (MessagePartType::Text, trimmed),
            };
            Some(MessagePart {
                part_type,
                text: body.to_string(),
                source: source.to_string(),
            })
        })
        .collect()
}

/// Reassemble parts produced by [`split_unified_message`].
///
/// A leading marker is restored when the first part is not plain text so the
/// result re-parses to the same part types.
pub fn join_unified_message(parts: &[MessagePart]) -> String {
    let joined = parts
        .iter()
        .map(|part| part.source.as_str())
        .collect::<Vec<_>>()
        .join(SEGMENT_MARKER);
    match parts.first() {
        Some(first) if first.part_type != MessagePartType::Text => {
            format!("{SEGMENT_MARKER}{joined}")
        }
        _ => joined,
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Whether an option list is numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionListKind {
    Unordered,
    Ordered,
}

/// A selectable option extracted from a list segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub key: String,
    pub label: String,
}

/// Extract the options of a `ul`/`ol` segment body.
///
/// Lines are separated by `\n-`. A line `key::bot::label` carries its own key;
/// otherwise the key is `OP-<n>: <line>` where `n` is the line index (every
/// line advances it, keyed or not). Ordered labels are prefixed with their
/// 1-based position.
pub fn extract_options(text: &str, kind: OptionListKind) -> Vec<OptionItem> {
    let mut text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if let Some(rest) = text.strip_prefix(['-', '!']) {
        text = rest.trim();
    }

    text.split("\n-")
        .enumerate()
        .map(|(index, line)| {
            let line = line.trim();
            let fields: Vec<&str> = line.split(OPTION_KEY_SEPARATOR).collect();
            let (key, label) = if let [key, label] = fields.as_slice() {
                (key.trim().to_string(), label.trim().to_string())
            } else {
                (format!("OP-{index}: {line}"), line.to_string())
            };
            let label = match kind {
                OptionListKind::Ordered => format!("{}. {label}", index + 1),
                OptionListKind::Unordered => label,
            };
            OptionItem { key, label }
        })
        .collect()
}
