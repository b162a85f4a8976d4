//! Reuse stamps for build messages.
//!
//! When a bot-drafted build message is reused, a trailing `metadata` segment
//! records which instance and message it came from plus a digest of the
//! content. Comparing the digest with a fresh one tells whether the text was
//! edited since, without asking the kernel.

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::message::ChatMessage;
use crate::parts::{
    MessagePart, MessagePartType, SEGMENT_MARKER, TYPE_DELIMITER, join_unified_message,
    split_unified_message,
};

const REUSE_KIND: &str = "reuse";

/// Body of a `metadata` segment of kind `reuse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReuseStamp {
    #[serde(rename = "type")]
    pub kind: String,
    pub instance: String,
    pub id: String,
    pub hash: String,
}

impl ReuseStamp {
    /// Parse a part as a reuse stamp. Other metadata and other parts yield `None`.
    pub fn from_part(part: &MessagePart) -> Option<Self> {
        if part.part_type != MessagePartType::Metadata {
            return None;
        }
        serde_json::from_str::<ReuseStamp>(&part.text)
            .ok()
            .filter(|stamp| stamp.kind == REUSE_KIND)
    }

    /// Find the trailing reuse stamp of a message text.
    pub fn find(text: &str) -> Option<Self> {
        split_unified_message(text)
            .last()
            .and_then(ReuseStamp::from_part)
    }

    /// Whether the stamped text is unchanged since stamping.
    ///
    /// Returns `None` when the text carries no trailing stamp.
    pub fn is_current(text: &str) -> Option<bool> {
        let stamp = Self::find(text)?;
        let (body, _) = strip_reuse_stamps(text);
        Some(content_digest(body.trim()) == stamp.hash)
    }
}

// Any metadata part whose body says `"type": "reuse"`, well-formed or not.
fn is_reuse_part(part: &MessagePart) -> bool {
    part.part_type == MessagePartType::Metadata
        && serde_json::from_str::<serde_json::Value>(&part.text)
            .is_ok_and(|body| body["type"] == REUSE_KIND)
}

/// SHA-1 of `text`, base64 encoded.
pub fn content_digest(text: &str) -> String {
    let digest = Sha1::digest(text.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// Drop every reuse stamp from `text` and rejoin the remaining parts.
fn strip_reuse_stamps(text: &str) -> (String, usize) {
    let parts = split_unified_message(text);
    let total = parts.len();
    let kept: Vec<MessagePart> = parts
        .into_iter()
        .filter(|part| !is_reuse_part(part))
        .collect();
    let dropped = total - kept.len();
    (join_unified_message(&kept), dropped)
}

/// Produce `message.text` with a fresh trailing reuse stamp.
///
/// Stale stamps are not carried forward. The digest covers the trimmed text
/// without any stamp.
pub fn stamp_reuse_metadata(message: &ChatMessage, chat_name: &str) -> String {
    let (body, dropped) = strip_reuse_stamps(&message.text);
    if dropped > 0 {
        log::debug!(
            "Replacing {dropped} stale reuse stamp(s) on message {}",
            message.id
        );
    }
    let stamp = serde_json::json!({
        "type": REUSE_KIND,
        "instance": chat_name,
        "id": message.id,
        "hash": content_digest(body.trim()),
    });
    format!("{body}\n{SEGMENT_MARKER}metadata{TYPE_DELIMITER}\n{stamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use crate::target::MessageTarget;

    fn build_message(text: &str) -> ChatMessage {
        ChatMessage::new(text, MessageType::Bot, MessageTarget::Build)
    }

    #[test]
    fn test_digest_is_base64_sha1() {
        // sha1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        assert_eq!(content_digest("abc"), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
    }

    #[test]
    fn test_stamp_round_trip() {
        let message = build_message("Copy this:\n####code#:\nprint(1)");
        let stamped = stamp_reuse_metadata(&message, "base");

        let parts = split_unified_message(&stamped);
        let stamps: Vec<_> = parts.iter().filter_map(ReuseStamp::from_part).collect();
        assert_eq!(stamps.len(), 1);
        assert!(ReuseStamp::from_part(parts.last().unwrap()).is_some());

        let stamp = &stamps[0];
        assert_eq!(stamp.instance, "base");
        assert_eq!(stamp.id, message.id);
        assert_eq!(stamp.hash, content_digest(message.text.trim()));
        assert_eq!(ReuseStamp::is_current(&stamped), Some(true));
    }

    #[test]
    fn test_restamp_drops_stale_stamp() {
        let mut message = build_message("####code#:\nx = 1");
        message.text = stamp_reuse_metadata(&message, "base");
        message.text = message.text.replace("x = 1", "x = 2");
        assert_eq!(ReuseStamp::is_current(&message.text), Some(false));

        let restamped = stamp_reuse_metadata(&message, "other");
        let stamps: Vec<_> = split_unified_message(&restamped)
            .iter()
            .filter_map(ReuseStamp::from_part)
            .collect();
        assert_eq!(stamps.len(), 1);
        assert_eq!(stamps[0].instance, "other");
        assert_eq!(ReuseStamp::is_current(&restamped), Some(true));
    }

    #[test]
    fn test_restamp_drops_partial_stamp() {
        let message = build_message("x\n####metadata#:\n{\"type\":\"reuse\",\"hash\":7}");
        let stamped = stamp_reuse_metadata(&message, "base");

        let parts = split_unified_message(&stamped);
        assert_eq!(parts.iter().filter(|part| is_reuse_part(part)).count(), 1);
        assert!(!stamped.contains("\"hash\":7"));
        assert_eq!(ReuseStamp::find(&stamped).unwrap().hash, content_digest("x"));
        assert_eq!(ReuseStamp::is_current(&stamped), Some(true));
    }

    #[test]
    fn test_other_metadata_is_kept() {
        let message = build_message("hi\n####meta#:\n{\"type\": \"note\"}");
        let stamped = stamp_reuse_metadata(&message, "base");
        let parts = split_unified_message(&stamped);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].part_type, MessagePartType::Metadata);
        assert!(ReuseStamp::from_part(&parts[1]).is_none());
    }

    #[test]
    fn test_unstamped_text() {
        assert_eq!(ReuseStamp::is_current("plain"), None);
        assert!(ReuseStamp::find("####metadata#:\nnot json").is_none());
    }
}
