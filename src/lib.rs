// Library exports for testing and potential library use
//
// # Lock Usage Policy
//
// State shared between the model, its instances and the host uses
// `parking_lot` locks (`CommLink`, `SessionContext`, `ErrorReporter`).
// Locks are never held across an `.await`. Config variables use
// `tokio::sync::watch` so renderers can await changes.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod chat;
pub mod cli;
pub mod comm_model;
pub mod context;
pub mod error;
pub mod events;
pub mod handler;
pub mod reporter;
pub mod status;
pub mod transport;

pub use newton_chat_config as config;
pub use newton_chat_protocol as protocol;

pub use chat::{ChatInstance, ConfigStore, ConfigVar};
pub use comm_model::NotebookCommModel;
pub use context::SessionContext;
pub use error::ChatError;
pub use events::ChatEvent;
pub use reporter::{ErrorReport, ErrorReporter};
pub use status::KernelStatus;
pub use transport::{CommChannel, CommLink, KernelEvent, KernelSession};
