//! Requests sent from the client to the kernel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ALL_INSTANCES, META_INSTANCE};
use crate::message::{ChatMessage, MessagePatch};

/// Whether a config write is the first one for its variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMode {
    Init,
    Update,
}

/// A client -> kernel comm request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum ClientRequest {
    /// Bootstrap handshake, normally addressed to `<all>`.
    Init { instance: String },
    /// A new chat message.
    Message {
        instance: String,
        message: ChatMessage,
    },
    /// Ask the kernel to resend an instance's history, or the registry for `<meta>`.
    Refresh { instance: String },
    /// Create an instance from a loader form.
    NewInstance {
        instance: String,
        name: String,
        mode: String,
        data: BTreeMap<String, Option<String>>,
    },
    RemoveInstance { instance: String, name: String },
    /// Write one config variable.
    Config {
        instance: String,
        key: String,
        value: Value,
        #[serde(rename = "_mode")]
        mode: ConfigMode,
    },
    /// Sparse message update; applied locally only when the kernel echoes it.
    SyncMessage {
        instance: String,
        message: MessagePatch,
    },
    AutocompleteQuery {
        instance: String,
        #[serde(rename = "requestId")]
        request_id: i64,
        query: String,
    },
    /// Ask the kernel for a snapshot of all instances.
    SaveInstances { instance: String },
    /// Replace the kernel's instances with a snapshot.
    LoadInstances { instance: String, data: Value },
}

impl ClientRequest {
    pub fn init_all() -> Self {
        Self::Init {
            instance: ALL_INSTANCES.to_string(),
        }
    }

    pub fn message(instance: &str, message: ChatMessage) -> Self {
        Self::Message {
            instance: instance.to_string(),
            message,
        }
    }

    pub fn refresh(instance: &str) -> Self {
        Self::Refresh {
            instance: instance.to_string(),
        }
    }

    pub fn refresh_loaders() -> Self {
        Self::refresh(META_INSTANCE)
    }

    pub fn new_instance(name: &str, mode: &str, data: BTreeMap<String, Option<String>>) -> Self {
        Self::NewInstance {
            instance: META_INSTANCE.to_string(),
            name: name.to_string(),
            mode: mode.to_string(),
            data,
        }
    }

    pub fn remove_instance(name: &str) -> Self {
        Self::RemoveInstance {
            instance: META_INSTANCE.to_string(),
            name: name.to_string(),
        }
    }

    pub fn config(instance: &str, key: &str, value: Value, mode: ConfigMode) -> Self {
        Self::Config {
            instance: instance.to_string(),
            key: key.to_string(),
            value,
            mode,
        }
    }

    pub fn sync_message(instance: &str, message: MessagePatch) -> Self {
        Self::SyncMessage {
            instance: instance.to_string(),
            message,
        }
    }

    pub fn autocomplete_query(instance: &str, request_id: i64, query: &str) -> Self {
        Self::AutocompleteQuery {
            instance: instance.to_string(),
            request_id,
            query: query.to_string(),
        }
    }

    pub fn save_instances() -> Self {
        Self::SaveInstances {
            instance: META_INSTANCE.to_string(),
        }
    }

    pub fn load_instances(data: Value) -> Self {
        Self::LoadInstances {
            instance: META_INSTANCE.to_string(),
            data,
        }
    }

    /// The instance this request is addressed to.
    pub fn instance(&self) -> &str {
        match self {
            Self::Init { instance }
            | Self::Message { instance, .. }
            | Self::Refresh { instance }
            | Self::NewInstance { instance, .. }
            | Self::RemoveInstance { instance, .. }
            | Self::Config { instance, .. }
            | Self::SyncMessage { instance, .. }
            | Self::AutocompleteQuery { instance, .. }
            | Self::SaveInstances { instance }
            | Self::LoadInstances { instance, .. } => instance,
        }
    }

    /// The wire name of the operation.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Message { .. } => "message",
            Self::Refresh { .. } => "refresh",
            Self::NewInstance { .. } => "new-instance",
            Self::RemoveInstance { .. } => "remove-instance",
            Self::Config { .. } => "config",
            Self::SyncMessage { .. } => "sync-message",
            Self::AutocompleteQuery { .. } => "autocomplete-query",
            Self::SaveInstances { .. } => "save-instances",
            Self::LoadInstances { .. } => "load-instances",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_init_all_wire_format() {
        let value = serde_json::to_value(ClientRequest::init_all()).unwrap();
        assert_eq!(value, json!({"operation": "init", "instance": "<all>"}));
    }

    #[test]
    fn test_config_wire_format() {
        let request = ClientRequest::config("base", "show_time", json!(false), ConfigMode::Init);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "operation": "config",
                "instance": "base",
                "key": "show_time",
                "value": false,
                "_mode": "init"
            })
        );
    }

    #[test]
    fn test_autocomplete_query_wire_format() {
        let request = ClientRequest::autocomplete_query("base", 7, "pand");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["operation"], "autocomplete-query");
        assert_eq!(value["requestId"], 7);
        assert_eq!(value["query"], "pand");
    }

    #[test]
    fn test_meta_requests_address_meta() {
        let mut data = BTreeMap::new();
        data.insert("dataset".to_string(), None);
        for request in [
            ClientRequest::new_instance("extra", "newton", data),
            ClientRequest::remove_instance("extra"),
            ClientRequest::refresh_loaders(),
            ClientRequest::save_instances(),
            ClientRequest::load_instances(json!({"instances": {}})),
        ] {
            assert_eq!(request.instance(), META_INSTANCE);
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value["operation"], request.operation());
        }
    }

    #[test]
    fn test_new_instance_wire_format() {
        let mut data = BTreeMap::new();
        data.insert("file".to_string(), Some("a.csv".to_string()));
        data.insert("sheet".to_string(), None);
        let value = serde_json::to_value(ClientRequest::new_instance("extra", "foo", data)).unwrap();
        assert_eq!(
            value,
            json!({
                "operation": "new-instance",
                "instance": "<meta>",
                "name": "extra",
                "mode": "foo",
                "data": {"file": "a.csv", "sheet": null}
            })
        );
    }

    #[test]
    fn test_sync_message_round_trip() {
        let request = ClientRequest::sync_message("base", MessagePatch::new("m1").loading(false));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "operation": "sync-message",
                "instance": "base",
                "message": {"id": "m1", "loading": false}
            })
        );
        let decoded: ClientRequest = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, request);
    }
}
