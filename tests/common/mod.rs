//! Shared integration test helpers for newton-chat.
//!
//! Provides a scripted [`FakeSession`] standing in for the notebook host and
//! builders for kernel payloads.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{FakeSession, connected_model, reply};
//! ```
//!
//! Note: Rust integration tests use `mod common;` (not `use`) to bring in
//! helpers from `tests/common/mod.rs`. The `#[allow(dead_code)]` attribute
//! suppresses warnings when only a subset of helpers are used per file.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use newton_chat::chat::ChatInstance;
use newton_chat::config::Settings;
use newton_chat::config::defaults::config_variables;
use newton_chat::context::SessionContext;
use newton_chat::events::ChatEvent;
use newton_chat::transport::{
    CommLink, ExecutionError, ExecutionOutcome, InstancePort, KernelInfo, KernelSession,
    MemoryChannel,
};
use newton_chat::{ChatError, NotebookCommModel};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Scripted kernel session. Registering the comm target attaches
/// [`FakeSession::channel`] right away, as a kernel opening the comm would.
pub struct FakeSession {
    pub channel: Arc<MemoryChannel>,
    pub kernel_name: String,
    pub language: String,
    pub has_kernel: Mutex<bool>,
    pub bootstrap_error: Mutex<Option<ExecutionError>>,
    pub executed: Mutex<Vec<String>>,
    pub registered: Mutex<Vec<String>>,
}

impl FakeSession {
    pub fn python() -> Self {
        Self::with_kernel("python3", "python")
    }

    pub fn with_kernel(kernel_name: &str, language: &str) -> Self {
        Self {
            channel: Arc::new(MemoryChannel::new("comm-1")),
            kernel_name: kernel_name.to_string(),
            language: language.to_string(),
            has_kernel: Mutex::new(true),
            bootstrap_error: Mutex::new(None),
            executed: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_bootstrap(&self, ename: &str, evalue: &str) {
        *self.bootstrap_error.lock() = Some(ExecutionError {
            ename: ename.to_string(),
            evalue: evalue.to_string(),
            traceback: vec![format!("{ename}: {evalue}")],
        });
    }

    /// Operations sent since the last call, as `(operation, instance)`.
    pub fn take_sent(&self) -> Vec<(String, String)> {
        self.channel
            .take_sent()
            .into_iter()
            .map(|payload| {
                (
                    payload["operation"].as_str().unwrap_or_default().to_string(),
                    payload["instance"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

impl KernelSession for FakeSession {
    fn name(&self) -> String {
        "notebook.ipynb".to_string()
    }

    async fn ready(&self) -> Result<(), ChatError> {
        Ok(())
    }

    fn has_kernel(&self) -> bool {
        *self.has_kernel.lock()
    }

    async fn kernel_info(&self) -> Option<KernelInfo> {
        Some(KernelInfo {
            name: self.kernel_name.clone(),
            language: self.language.clone(),
        })
    }

    fn register_comm_target(&self, target: &str, link: CommLink) -> Result<(), ChatError> {
        self.registered.lock().push(target.to_string());
        link.attach(self.channel.clone());
        Ok(())
    }

    async fn execute_silent(&self, code: &str) -> Result<ExecutionOutcome, ChatError> {
        self.executed.lock().push(code.to_string());
        Ok(ExecutionOutcome {
            error: self.bootstrap_error.lock().clone(),
        })
    }
}

/// Model over `session` with default settings, not yet connected.
pub fn model(
    session: Arc<FakeSession>,
) -> (
    NotebookCommModel<FakeSession>,
    mpsc::UnboundedReceiver<ChatEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotebookCommModel::new(session, Settings::default(), tx), rx)
}

/// Model connected to a python kernel, with the bootstrap traffic drained.
pub async fn connected_model() -> (
    NotebookCommModel<FakeSession>,
    Arc<FakeSession>,
    mpsc::UnboundedReceiver<ChatEvent>,
) {
    let session = Arc::new(FakeSession::python());
    let (mut model, rx) = model(session.clone());
    model
        .connect_notebook()
        .await
        .expect("connect_notebook failed");
    session.take_sent();
    (model, session, rx)
}

/// Standalone instance over an attached in-memory channel.
pub fn instance(wizard_mode: bool) -> (ChatInstance, Arc<MemoryChannel>, SessionContext) {
    let (tx, _rx) = mpsc::unbounded_channel();
    let link = CommLink::new();
    let channel = Arc::new(MemoryChannel::new("comm-1"));
    link.attach(channel.clone());
    let context = SessionContext::new(wizard_mode);
    let instance = ChatInstance::new(
        "base",
        "newton",
        config_variables(),
        InstancePort::new("base", link),
        context.clone(),
        tx,
    );
    (instance, channel, context)
}

/// Wire form of a message.
pub fn message_json(id: &str, message_type: &str, display: u8, kernel_process: u8) -> Value {
    json!({
        "id": id,
        "text": format!("text of {id}"),
        "type": message_type,
        "timestamp": 1_700_000_000_000_i64,
        "reply": null,
        "feedback": {"rate": 0, "reason": "", "otherreason": ""},
        "loading": false,
        "display": display,
        "kernelProcess": kernel_process,
        "kernelDisplay": 0
    })
}

/// A visible bot message.
pub fn bot_json(id: &str) -> Value {
    message_json(id, "bot", 0, 1)
}

/// A visible user message.
pub fn user_json(id: &str) -> Value {
    message_json(id, "user", 0, 0)
}

pub fn reply(instance: &str, message: Value) -> Value {
    json!({"operation": "reply", "instance": instance, "message": message})
}

pub fn refresh(instance: &str, history: Vec<Value>, config: Value) -> Value {
    json!({"operation": "refresh", "instance": instance, "history": history, "config": config})
}

pub fn sync_meta(instances: &[(&str, &str)]) -> Value {
    let instances: BTreeMap<&str, &str> = instances.iter().copied().collect();
    json!({
        "operation": "sync-meta",
        "instance": "<meta>",
        "loaders": {"csv": {"file": ["File name", null]}},
        "instances": instances
    })
}
