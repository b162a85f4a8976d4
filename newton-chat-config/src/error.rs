//! Typed error variants for the newton-chat-config crate.

use thiserror::Error;

/// Errors that can occur when loading, validating or saving settings.
///
/// # Example
///
/// ```rust,no_run
/// use newton_chat_config::{ConfigError, Settings};
///
/// match Settings::load() {
///     Ok(settings) => println!("comm target: {}", settings.comm_target),
///     Err(ConfigError::Parse(e)) => eprintln!("YAML parse error: {e}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing the settings file.
    #[error("I/O error reading settings: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file contained invalid YAML.
    #[error("YAML parse error in settings: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string names the field and why it is invalid.
    #[error("Settings validation error: {0}")]
    Validation(String),
}
