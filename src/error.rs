//! Typed error types for newton-chat.
//!
//! Callers at the crate boundary match on [`ChatError`] variants. The binary
//! wraps them in `anyhow` for display.

use thiserror::Error;

use crate::protocol::DecodeError;

/// Top-level error type for the chat synchronisation core.
///
/// Covers the failure categories the model distinguishes:
/// - Lookups of unknown instances, messages or config variables
/// - Malformed kernel payloads
/// - Kernel session and bootstrap failures
/// - Errors the kernel reports for a command
#[derive(Debug, Error)]
pub enum ChatError {
    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------
    /// A kernel message addressed an instance this client does not hold.
    #[error("Invalid instance {0}")]
    UnknownInstance(String),

    /// An update named a message id that is not in the instance history.
    #[error("Message {id} not found in instance {instance}")]
    UnknownMessage {
        /// Instance that was searched.
        instance: String,
        /// Missing message id.
        id: String,
    },

    /// A config write named a variable the store does not know.
    #[error("Unknown config variable '{key}' for instance {instance}")]
    UnknownConfig {
        /// Instance owning the store.
        instance: String,
        /// Unknown variable name.
        key: String,
    },

    // -----------------------------------------------------------------------
    // Wire
    // -----------------------------------------------------------------------
    /// A kernel payload failed validation.
    #[error("Invalid kernel message: {0}")]
    Decode(#[from] DecodeError),

    /// The comm channel refused a payload.
    #[error("Comm transport error: {0}")]
    Transport(String),

    // -----------------------------------------------------------------------
    // Kernel session
    // -----------------------------------------------------------------------
    /// The session has no kernel to bootstrap.
    #[error("No kernel available in session {0}")]
    NoKernel(String),

    /// The host failed to provide a usable session.
    #[error("Kernel session error: {0}")]
    Session(String),

    /// The bootstrap statement raised in the kernel.
    #[error("Bootstrap failed: {ename}: {evalue}")]
    Bootstrap {
        /// Exception class name.
        ename: String,
        /// Exception message.
        evalue: String,
        /// Formatted traceback lines.
        traceback: Vec<String>,
    },

    /// The kernel counterpart reported an error for a command.
    #[error("Kernel error in '{command}': {message}")]
    Kernel {
        /// Client command that failed.
        command: String,
        /// Kernel-provided message.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------
    /// An error already recorded by the [`crate::reporter::ErrorReporter`].
    #[error("[report {report_id}] {source}")]
    Reported {
        /// Id of the recorded report.
        report_id: u64,
        /// The error that was recorded.
        #[source]
        source: Box<ChatError>,
    },
}

impl ChatError {
    /// The report id when this error was already recorded.
    pub fn report_id(&self) -> Option<u64> {
        match self {
            Self::Reported { report_id, .. } => Some(*report_id),
            _ => None,
        }
    }

    /// The innermost error, skipping report wrappers.
    pub fn root(&self) -> &ChatError {
        match self {
            Self::Reported { source, .. } => source.root(),
            other => other,
        }
    }
}
