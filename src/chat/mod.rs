//! Chat instances and their config variables.

pub mod config_store;
pub mod instance;

pub use config_store::{ConfigStore, ConfigVar};
pub use instance::{AutoCompleteState, ChatInstance, NO_AUTO_COMPLETE_RESPONSE};
