//! Host-facing seams: the kernel session and the comm channel.
//!
//! The notebook host implements [`KernelSession`] and [`CommChannel`] and
//! feeds [`KernelEvent`]s into [`crate::handler::run`]. Everything the model
//! sends goes through a [`CommLink`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::ChatError;
use crate::protocol::{ChatMessage, ClientRequest, ConfigMode, MessagePatch};

/// An open comm between the client and the kernel counterpart.
pub trait CommChannel: Send + Sync {
    fn comm_id(&self) -> &str;

    /// Whether the kernel still holds this comm.
    fn is_open(&self) -> bool;

    fn send(&self, payload: Value) -> Result<(), ChatError>;
}

/// Language information reported by a kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelInfo {
    pub name: String,
    pub language: String,
}

/// Error raised by a silently executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub ename: String,
    pub evalue: String,
    pub traceback: Vec<String>,
}

/// Result of a silent execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub error: Option<ExecutionError>,
}

/// A notebook's kernel session as provided by the host.
pub trait KernelSession: Send + Sync {
    /// Session name used in log lines and errors.
    fn name(&self) -> String;

    /// Resolves once the session is usable.
    fn ready(&self) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// Whether the session currently has a kernel.
    fn has_kernel(&self) -> bool;

    /// Kernel name and language, `None` if the kernel did not answer.
    fn kernel_info(&self) -> impl Future<Output = Option<KernelInfo>> + Send;

    /// Register the comm target. The host attaches the channel to `link`
    /// once the kernel opens the comm.
    fn register_comm_target(&self, target: &str, link: CommLink) -> Result<(), ChatError>;

    /// Execute `code` without history or output.
    fn execute_silent(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<ExecutionOutcome, ChatError>> + Send;
}

/// Input of the comm handler loop.
pub enum KernelEvent {
    /// The kernel opened the comm.
    CommOpened(Arc<dyn CommChannel>),
    /// A payload arrived on the comm.
    CommMessage(Value),
    /// The kernel execution status changed (`idle`, `busy`, `restarting`, ...).
    StatusChanged(String),
    CommClosed,
}

impl fmt::Debug for KernelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommOpened(channel) => f.debug_tuple("CommOpened").field(&channel.comm_id()).finish(),
            Self::CommMessage(value) => f.debug_tuple("CommMessage").field(value).finish(),
            Self::StatusChanged(status) => f.debug_tuple("StatusChanged").field(status).finish(),
            Self::CommClosed => f.write_str("CommClosed"),
        }
    }
}

/// Shared slot holding the current comm channel.
///
/// Sends without an attached, open channel are dropped. There is no queue
/// and no retry.
#[derive(Clone, Default)]
pub struct CommLink {
    channel: Arc<Mutex<Option<Arc<dyn CommChannel>>>>,
}

impl CommLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, channel: Arc<dyn CommChannel>) {
        log::info!("Comm {} attached", channel.comm_id());
        *self.channel.lock() = Some(channel);
    }

    pub fn detach(&self) {
        if let Some(channel) = self.channel.lock().take() {
            log::info!("Comm {} detached", channel.comm_id());
        }
    }

    /// Whether an open channel is attached.
    pub fn is_connected(&self) -> bool {
        self.channel
            .lock()
            .as_ref()
            .is_some_and(|channel| channel.is_open())
    }

    /// Send a request. Returns whether it reached an open channel.
    pub fn send(&self, request: &ClientRequest) -> bool {
        let Some(channel) = self.channel.lock().clone() else {
            log::debug!(
                "Dropping {} for {}: no comm attached",
                request.operation(),
                request.instance()
            );
            return false;
        };
        if !channel.is_open() {
            log::debug!(
                "Dropping {} for {}: comm {} is closed",
                request.operation(),
                request.instance(),
                channel.comm_id()
            );
            return false;
        }

        let payload = match serde_json::to_value(request) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to serialize {}: {}", request.operation(), e);
                return false;
            }
        };
        match channel.send(payload) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to send {}: {}", request.operation(), e);
                false
            }
        }
    }
}

impl fmt::Debug for CommLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comm_id = self
            .channel
            .lock()
            .as_ref()
            .map(|channel| channel.comm_id().to_string());
        f.debug_struct("CommLink").field("comm_id", &comm_id).finish()
    }
}

/// A [`CommLink`] bound to one instance name.
#[derive(Debug, Clone)]
pub struct InstancePort {
    instance: String,
    link: CommLink,
}

impl InstancePort {
    pub fn new(instance: impl Into<String>, link: CommLink) -> Self {
        Self {
            instance: instance.into(),
            link,
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn send_message(&self, message: ChatMessage) -> bool {
        self.link
            .send(&ClientRequest::message(&self.instance, message))
    }

    pub fn send_refresh(&self) -> bool {
        self.link.send(&ClientRequest::refresh(&self.instance))
    }

    pub fn send_config(&self, key: &str, value: Value, mode: ConfigMode) -> bool {
        self.link
            .send(&ClientRequest::config(&self.instance, key, value, mode))
    }

    pub fn send_sync_message(&self, patch: MessagePatch) -> bool {
        self.link
            .send(&ClientRequest::sync_message(&self.instance, patch))
    }

    pub fn send_autocomplete_query(&self, request_id: i64, query: &str) -> bool {
        self.link.send(&ClientRequest::autocomplete_query(
            &self.instance,
            request_id,
            query,
        ))
    }
}

/// In-process channel that records every payload.
///
/// Used by the `replay` command and by tests in place of a kernel comm.
#[derive(Debug)]
pub struct MemoryChannel {
    comm_id: String,
    open: Mutex<bool>,
    sent: Mutex<Vec<Value>>,
}

impl MemoryChannel {
    pub fn new(comm_id: impl Into<String>) -> Self {
        Self {
            comm_id: comm_id.into(),
            open: Mutex::new(true),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn close(&self) {
        *self.open.lock() = false;
    }

    /// Payloads sent so far, oldest first.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// Drain the recorded payloads.
    pub fn take_sent(&self) -> Vec<Value> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl CommChannel for MemoryChannel {
    fn comm_id(&self) -> &str {
        &self.comm_id
    }

    fn is_open(&self) -> bool {
        *self.open.lock()
    }

    fn send(&self, payload: Value) -> Result<(), ChatError> {
        if !self.is_open() {
            return Err(ChatError::Transport(format!("comm {} is closed", self.comm_id)));
        }
        self.sent.lock().push(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_without_channel_is_dropped() {
        let link = CommLink::new();
        assert!(!link.is_connected());
        assert!(!link.send(&ClientRequest::init_all()));
    }

    #[test]
    fn test_send_reaches_attached_channel() {
        let link = CommLink::new();
        let channel = Arc::new(MemoryChannel::new("c1"));
        link.attach(channel.clone());
        assert!(link.send(&ClientRequest::init_all()));
        assert_eq!(channel.sent(), vec![json!({"operation": "init", "instance": "<all>"})]);
    }

    #[test]
    fn test_closed_channel_drops_sends() {
        let link = CommLink::new();
        let channel = Arc::new(MemoryChannel::new("c1"));
        link.attach(channel.clone());
        channel.close();
        assert!(!link.is_connected());
        assert!(!link.send(&ClientRequest::refresh("base")));
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn test_port_addresses_its_instance() {
        let link = CommLink::new();
        let channel = Arc::new(MemoryChannel::new("c1"));
        link.attach(channel.clone());
        let port = InstancePort::new("extra", link.clone());
        port.send_refresh();
        port.send_autocomplete_query(4, "q");
        let sent = channel.take_sent();
        assert_eq!(sent[0], json!({"operation": "refresh", "instance": "extra"}));
        assert_eq!(sent[1]["requestId"], 4);
        assert!(channel.sent().is_empty());

        link.detach();
        assert!(!port.send_refresh());
    }
}
