//! State shared by every chat instance of a notebook.
//!
//! One [`SessionContext`] is created per model and cloned into each
//! [`crate::chat::ChatInstance`]. Clones share the same state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol::ChatMessage;

#[derive(Debug, Default)]
struct ContextState {
    wizard_mode: bool,
    replying: Option<String>,
    wizard_preview: Vec<ChatMessage>,
}

/// Wizard mode, the reply pointer and the wizard preview.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    state: Arc<RwLock<ContextState>>,
}

impl SessionContext {
    pub fn new(wizard_mode: bool) -> Self {
        Self {
            state: Arc::new(RwLock::new(ContextState {
                wizard_mode,
                ..ContextState::default()
            })),
        }
    }

    pub fn wizard_mode(&self) -> bool {
        self.state.read().wizard_mode
    }

    pub fn set_wizard_mode(&self, enabled: bool) {
        self.state.write().wizard_mode = enabled;
    }

    /// Id of the message the next user input answers.
    pub fn replying(&self) -> Option<String> {
        self.state.read().replying.clone()
    }

    pub fn set_replying(&self, id: Option<String>) {
        self.state.write().replying = id;
    }

    /// Messages staged for the wizard, oldest first.
    pub fn wizard_preview(&self) -> Vec<ChatMessage> {
        self.state.read().wizard_preview.clone()
    }

    pub fn push_wizard_preview(&self, message: ChatMessage) {
        self.state.write().wizard_preview.push(message);
    }

    pub fn clear_wizard_preview(&self) {
        self.state.write().wizard_preview.clear();
    }
}
