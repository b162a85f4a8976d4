//! Chat message types shared by the client and the kernel counterpart.
//!
//! The kernel encodes the display/process enums as integers (Python
//! `IntEnum`), so [`MessageDisplay`] and [`KernelProcess`] travel as `u8`
//! on the wire. All other field names are camelCase.

use serde::{Deserialize, Deserializer, Serialize};

use crate::target::{MessageTarget, TargetDefinition};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Bot,
    Error,
}

/// Visibility of a message, either in the client chat or in the kernel echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MessageDisplay {
    /// Rendered normally.
    #[default]
    Default = 0,
    /// Kept in the history but not rendered.
    Hidden = 1,
    /// Staged as wizard (build mode) input.
    WizardModeInput = 2,
}

impl From<MessageDisplay> for u8 {
    fn from(display: MessageDisplay) -> Self {
        display as u8
    }
}

impl TryFrom<u8> for MessageDisplay {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Default),
            1 => Ok(Self::Hidden),
            2 => Ok(Self::WizardModeInput),
            other => Err(format!("invalid message display value {other}")),
        }
    }
}

/// Whether the kernel-side bot logic should treat a message as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum KernelProcess {
    #[default]
    Prevent = 0,
    Process = 1,
    Force = 2,
}

impl From<KernelProcess> for u8 {
    fn from(process: KernelProcess) -> Self {
        process as u8
    }
}

impl TryFrom<u8> for KernelProcess {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Prevent),
            1 => Ok(Self::Process),
            2 => Ok(Self::Force),
            other => Err(format!("invalid kernel process value {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// User rating attached to a message after it was shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rate: i64,
    pub reason: String,
    pub otherreason: String,
}

/// The atomic unit of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Id of the message this one answers. Lookup only.
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub display: MessageDisplay,
    #[serde(default)]
    pub kernel_process: KernelProcess,
    #[serde(default)]
    pub kernel_display: MessageDisplay,
    /// Marks a just-arrived message for the renderer. Never sent.
    #[serde(skip)]
    pub new: Option<bool>,
}

impl ChatMessage {
    /// Create a client-originated message with a fresh id and the current time.
    pub fn new(text: impl Into<String>, message_type: MessageType, target: MessageTarget) -> Self {
        let mut message = Self {
            id: new_message_id(),
            text: text.into(),
            message_type,
            timestamp: now_millis(),
            reply: None,
            feedback: Feedback::default(),
            loading: false,
            display: MessageDisplay::Default,
            kernel_process: KernelProcess::Prevent,
            kernel_display: MessageDisplay::Default,
            new: None,
        };
        message.apply_target(target.definition());
        message
    }

    /// Set the answered message id.
    pub fn in_reply_to(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// The `(display, kernelProcess, kernelDisplay)` triple of this message.
    pub fn target_definition(&self) -> TargetDefinition {
        TargetDefinition {
            display: self.display,
            kernel_process: self.kernel_process,
            kernel_display: self.kernel_display,
        }
    }

    /// Resolve the routing target from the current triple.
    pub fn target(&self) -> MessageTarget {
        MessageTarget::of(&self.target_definition())
    }

    /// Overwrite the routing triple.
    pub fn apply_target(&mut self, definition: TargetDefinition) {
        self.display = definition.display;
        self.kernel_process = definition.kernel_process;
        self.kernel_display = definition.kernel_display;
    }

    /// Builder form of [`ChatMessage::apply_target`].
    pub fn with_target(mut self, target: MessageTarget) -> Self {
        self.apply_target(target.definition());
        self
    }

    /// Copy this message, apply `overrides`, then assign a fresh id and timestamp.
    ///
    /// The id and timestamp are always regenerated, even if `overrides` sets them.
    pub fn clone_with(&self, overrides: impl FnOnce(&mut ChatMessage)) -> ChatMessage {
        let mut message = self.clone();
        overrides(&mut message);
        message.id = new_message_id();
        message.timestamp = now_millis();
        message
    }

    /// Clone this message re-targeted as `target`.
    ///
    /// Used to mirror a bot-authored build message into the wizard preview
    /// as if the user wrote it.
    pub fn clone_as(&self, target: MessageTarget) -> ChatMessage {
        self.clone_with(|message| message.apply_target(target.definition()))
    }
}

/// Generate a client-side message id.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Sparse patches
// ---------------------------------------------------------------------------

/// Sparse feedback update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otherreason: Option<String>,
}

/// Sparse update of a message, keyed by id, sent as `sync-message`.
///
/// Only the fields that are `Some` are serialized. `reply` distinguishes
/// "leave alone" (`None`) from "clear" (`Some(None)`, sent as `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub reply: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<MessageDisplay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_process: Option<KernelProcess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_display: Option<MessageDisplay>,
}

impl MessagePatch {
    /// An empty patch for message `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn feedback(mut self, feedback: FeedbackPatch) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

// A present key (even `null`) means "set".
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
