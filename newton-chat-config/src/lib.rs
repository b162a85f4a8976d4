//! Settings for newton-chat.
//!
//! Settings are stored as YAML at `~/.config/newton-chat/config.yaml`
//! (see [`Settings::config_path`]). A missing file is created with defaults
//! on first [`Settings::load`].
//!
//! Kernel language [`KernelMatcher`]s live here as well: they are part of the
//! settings so new languages can be added without a rebuild.

pub mod defaults;
pub mod error;
pub mod matcher;
pub mod settings;

pub use error::ConfigError;
pub use matcher::KernelMatcher;
pub use settings::Settings;
