//! Messages sent from the kernel to the client.
//!
//! These are **not** trusted as already-typed: [`KernelMessage::decode`]
//! validates the envelope and the body of every known operation and returns a
//! [`DecodeError`] when the shape is wrong.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::message::ChatMessage;

/// Fields needed to create an instance of one mode: form key -> (label, default).
pub type LoaderForm = BTreeMap<String, (String, Value)>;

/// One auto-complete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCompleteItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// `sync-meta`: the kernel's authoritative registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncMeta {
    #[serde(default)]
    pub loaders: BTreeMap<String, LoaderForm>,
    /// Instance name -> mode.
    pub instances: BTreeMap<String, String>,
}

/// `init` / `refresh`: full instance state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceState {
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// `error`: a command failed on the kernel side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KernelError {
    pub command: String,
    pub message: String,
}

/// `autocomplete-response`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCompleteResponse {
    pub response_id: i64,
    #[serde(default)]
    pub items: Vec<AutoCompleteItem>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ConfigBody {
    config: Map<String, Value>,
}

#[derive(Deserialize)]
struct DataBody {
    data: Value,
}

/// A decoded kernel operation.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelOperation {
    SyncMeta(SyncMeta),
    Init(InstanceState),
    Refresh(InstanceState),
    /// Append one message.
    Reply(ChatMessage),
    /// Replace one message by id.
    UpdateMessage(ChatMessage),
    /// Merge config values.
    UpdateConfig(Map<String, Value>),
    Error(KernelError),
    AutocompleteResponse(AutoCompleteResponse),
    /// Snapshot returned for `save-instances`.
    Instances(Value),
    /// An operation this client does not know. Ignored by the dispatcher.
    Unknown(String),
}

/// A validated kernel -> client payload.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelMessage {
    pub instance: String,
    pub operation: KernelOperation,
}

impl KernelMessage {
    /// Validate and decode a raw comm payload.
    pub fn decode(value: &Value) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let operation = object
            .get("operation")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("operation"))?;
        let instance = object
            .get("instance")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("instance"))?
            .to_string();

        let operation = match operation {
            "sync-meta" => KernelOperation::SyncMeta(body(operation, value)?),
            "init" => KernelOperation::Init(body(operation, value)?),
            "refresh" => KernelOperation::Refresh(body(operation, value)?),
            "reply" => KernelOperation::Reply(body::<MessageBody>(operation, value)?.message),
            "update-message" => {
                KernelOperation::UpdateMessage(body::<MessageBody>(operation, value)?.message)
            }
            "update-config" => {
                KernelOperation::UpdateConfig(body::<ConfigBody>(operation, value)?.config)
            }
            "error" => KernelOperation::Error(body(operation, value)?),
            "autocomplete-response" => KernelOperation::AutocompleteResponse(body(operation, value)?),
            "instances" => KernelOperation::Instances(body::<DataBody>(operation, value)?.data),
            other => KernelOperation::Unknown(other.to_string()),
        };

        Ok(Self {
            instance,
            operation,
        })
    }
}

impl KernelOperation {
    /// The wire name of the operation.
    pub fn name(&self) -> &str {
        match self {
            Self::SyncMeta(_) => "sync-meta",
            Self::Init(_) => "init",
            Self::Refresh(_) => "refresh",
            Self::Reply(_) => "reply",
            Self::UpdateMessage(_) => "update-message",
            Self::UpdateConfig(_) => "update-config",
            Self::Error(_) => "error",
            Self::AutocompleteResponse(_) => "autocomplete-response",
            Self::Instances(_) => "instances",
            Self::Unknown(name) => name,
        }
    }

    /// Whether this operation proves a live kernel-side counterpart.
    pub fn confirms_kernel(&self) -> bool {
        matches!(
            self,
            Self::Init(_) | Self::Refresh(_) | Self::Reply(_) | Self::UpdateMessage(_)
        )
    }
}

fn body<T: DeserializeOwned>(operation: &str, value: &Value) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|source| DecodeError::InvalidBody {
        operation: operation.to_string(),
        source,
    })
}
