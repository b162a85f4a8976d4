//! One named conversation.
//!
//! A [`ChatInstance`] holds the ordered history of one chat plus an id ->
//! position index, its config variables and its auto-complete state. Local
//! user actions are sent to the kernel; the history itself only changes when
//! the kernel answers (`push`, `load`, `update_message`).

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::config_store::ConfigStore;
use crate::context::SessionContext;
use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::protocol::{
    AutoCompleteItem, ChatMessage, MessageDisplay, MessagePatch, MessageTarget, MessageType,
};
use crate::transport::InstancePort;

/// Response id meaning "no suggestions received yet".
pub const NO_AUTO_COMPLETE_RESPONSE: i64 = -1;

/// Latest auto-complete suggestions of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoCompleteState {
    pub response_id: i64,
    pub items: Vec<AutoCompleteItem>,
    /// Id of the last query sent. Only its response is accepted.
    pub last_request_id: Option<i64>,
}

impl Default for AutoCompleteState {
    fn default() -> Self {
        Self {
            response_id: NO_AUTO_COMPLETE_RESPONSE,
            items: Vec::new(),
            last_request_id: None,
        }
    }
}

#[derive(Debug)]
pub struct ChatInstance {
    name: String,
    mode: String,
    messages: Vec<ChatMessage>,
    index: HashMap<String, usize>,
    config: ConfigStore,
    auto_complete: AutoCompleteState,
    port: InstancePort,
    context: SessionContext,
    events: mpsc::UnboundedSender<ChatEvent>,
}

impl ChatInstance {
    pub fn new(
        name: impl Into<String>,
        mode: impl Into<String>,
        config_defaults: BTreeMap<String, Value>,
        port: InstancePort,
        context: SessionContext,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            mode: mode.into(),
            messages: Vec::new(),
            index: HashMap::new(),
            config: ConfigStore::new(config_defaults),
            auto_complete: AutoCompleteState::default(),
            port,
            context,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ChatMessage> {
        self.position_of(id).map(|position| &self.messages[position])
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn auto_complete(&self) -> &AutoCompleteState {
        &self.auto_complete
    }

    // -----------------------------------------------------------------------
    // Kernel-driven updates
    // -----------------------------------------------------------------------

    /// Append a message that arrived from the kernel.
    pub fn push(&mut self, mut message: ChatMessage) {
        message.new = Some(true);
        self.index.insert(message.id.clone(), self.messages.len());
        self.update_replying(&message);
        if message.display == MessageDisplay::WizardModeInput {
            self.context
                .push_wizard_preview(message.clone_as(MessageTarget::User));
            self.emit(ChatEvent::WizardPreviewChanged);
        }
        self.messages.push(message);
        self.emit_messages_changed();
    }

    /// Replace the whole history.
    pub fn load(&mut self, history: Vec<ChatMessage>) {
        self.index = history
            .iter()
            .enumerate()
            .map(|(position, message)| (message.id.clone(), position))
            .collect();
        if let Some(last) = history.last() {
            self.update_replying(last);
        }
        self.messages = history;
        self.emit_messages_changed();
    }

    /// Replace a message by id.
    pub fn update_message(&mut self, message: ChatMessage) -> Result<(), ChatError> {
        let position = self
            .position_of(&message.id)
            .ok_or_else(|| ChatError::UnknownMessage {
                instance: self.name.clone(),
                id: message.id.clone(),
            })?;
        self.messages[position] = message;
        self.emit_messages_changed();
        Ok(())
    }

    /// Apply kernel-provided config values.
    pub fn load_config(&mut self, config: &Map<String, Value>) {
        self.config.load_all(config);
    }

    /// Store suggestions if they answer the last query.
    ///
    /// Returns `false` when the response is stale and was dropped.
    pub fn apply_auto_complete(&mut self, response_id: i64, items: Vec<AutoCompleteItem>) -> bool {
        if self.auto_complete.last_request_id != Some(response_id) {
            log::debug!(
                "Dropping auto-complete response {} for {} (expected {:?})",
                response_id,
                self.name,
                self.auto_complete.last_request_id
            );
            return false;
        }
        self.auto_complete.response_id = response_id;
        self.auto_complete.items = items;
        self.emit(ChatEvent::AutoCompleteChanged {
            instance: self.name.clone(),
        });
        true
    }

    /// Clear history and auto-complete state.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.index.clear();
        self.auto_complete = AutoCompleteState::default();
        self.emit_messages_changed();
        self.emit(ChatEvent::AutoCompleteChanged {
            instance: self.name.clone(),
        });
    }

    /// Restore config defaults, as after a kernel restart.
    pub fn reset_config(&mut self) {
        self.config.reset();
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Send a new message. It shows up when the kernel replies with it.
    pub fn add_new(&self, message: ChatMessage) -> bool {
        self.port.send_message(message)
    }

    pub fn submit_sync_message(&self, patch: MessagePatch) -> bool {
        self.port.send_sync_message(patch)
    }

    pub fn remove_loading(&self, id: &str) -> bool {
        self.submit_sync_message(MessagePatch::new(id).loading(false))
    }

    pub fn send_auto_complete(&mut self, request_id: i64, query: &str) -> bool {
        self.auto_complete.last_request_id = Some(request_id);
        self.port.send_autocomplete_query(request_id, query)
    }

    pub fn refresh(&self) -> bool {
        log::debug!("refresh {}", self.name);
        self.port.send_refresh()
    }

    /// Write a config variable locally and on the kernel.
    pub fn set_config(&mut self, key: &str, value: Value) -> Result<(), ChatError> {
        self.config.set(key, value, &self.port)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    // In wizard mode the pointer follows user messages, otherwise bot ones.
    fn update_replying(&self, message: &ChatMessage) {
        let is_user = message.message_type == MessageType::User;
        if self.context.wizard_mode() == is_user && !message.target().is_kernel_bound() {
            self.context.set_replying(Some(message.id.clone()));
            self.emit(ChatEvent::ReplyingChanged);
        }
    }

    fn emit_messages_changed(&self) {
        self.emit(ChatEvent::MessagesChanged {
            instance: self.name.clone(),
        });
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::CommLink;

    fn instance(wizard_mode: bool) -> (ChatInstance, SessionContext) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = SessionContext::new(wizard_mode);
        let instance = ChatInstance::new(
            "base",
            "newton",
            newton_chat_config::defaults::config_variables(),
            InstancePort::new("base", CommLink::new()),
            context.clone(),
            tx,
        );
        (instance, context)
    }

    fn message(message_type: MessageType, target: MessageTarget) -> ChatMessage {
        ChatMessage::new("text", message_type, target)
    }

    #[test]
    fn test_push_indexes_and_marks_new() {
        let (mut instance, _) = instance(true);
        let first = message(MessageType::Bot, MessageTarget::Bot);
        let second = message(MessageType::Bot, MessageTarget::Bot);
        instance.push(first.clone());
        instance.push(second.clone());
        assert_eq!(instance.position_of(&second.id), Some(1));
        assert_eq!(instance.find_by_id(&first.id).unwrap().new, Some(true));
    }

    #[test]
    fn test_replying_follows_user_in_wizard_mode() {
        let (mut instance, context) = instance(true);
        let bot = message(MessageType::Bot, MessageTarget::Bot);
        instance.push(bot);
        assert!(context.replying().is_none());

        let user = message(MessageType::User, MessageTarget::User);
        instance.push(user.clone());
        assert_eq!(context.replying(), Some(user.id));
    }

    #[test]
    fn test_replying_follows_bot_outside_wizard_mode() {
        let (mut instance, context) = instance(false);
        let bot = message(MessageType::Bot, MessageTarget::Bot);
        instance.push(bot.clone());
        assert_eq!(context.replying(), Some(bot.id.clone()));

        let build = message(MessageType::Bot, MessageTarget::Build);
        instance.push(build);
        assert_eq!(context.replying(), Some(bot.id));
    }

    #[test]
    fn test_wizard_input_is_mirrored_as_user() {
        let (mut instance, context) = instance(true);
        let mut staged = message(MessageType::Bot, MessageTarget::Bot);
        staged.display = MessageDisplay::WizardModeInput;
        instance.push(staged.clone());

        let preview = context.wizard_preview();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].target(), MessageTarget::User);
        assert_eq!(preview[0].text, staged.text);
        assert_ne!(preview[0].id, staged.id);
    }

    #[test]
    fn test_empty_load_keeps_replying() {
        let (mut instance, context) = instance(true);
        context.set_replying(Some("kept".to_string()));
        instance.load(Vec::new());
        assert_eq!(context.replying().as_deref(), Some("kept"));
        assert!(instance.is_empty());
    }

    #[test]
    fn test_reset_clears_auto_complete() {
        let (mut instance, _) = instance(true);
        instance.send_auto_complete(1, "q");
        assert!(instance.apply_auto_complete(1, Vec::new()));
        instance.reset();
        assert_eq!(instance.auto_complete(), &AutoCompleteState::default());
        assert!(!instance.apply_auto_complete(1, Vec::new()));
    }
}
