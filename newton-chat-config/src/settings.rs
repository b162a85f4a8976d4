//! The `Settings` struct and its persistence.
//!
//! Covers:
//! - `load` / `load_from` / `save_to` (YAML file I/O with atomic write)
//! - XDG-style path helpers (`config_dir`, `config_path`)
//! - Validation and matcher selection

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::matcher::KernelMatcher;

/// Reserved instance names that may not be used for real conversations.
const RESERVED_INSTANCES: [&str; 2] = ["<meta>", "<all>"];

/// Client settings for one newton-chat installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Comm target name the kernel counterpart registers.
    #[serde(default = "crate::defaults::comm_target")]
    pub comm_target: String,

    /// Name of the instance every notebook starts with.
    #[serde(default = "crate::defaults::base_instance")]
    pub base_instance: String,

    /// Mode of the base instance.
    #[serde(default = "crate::defaults::base_mode")]
    pub base_mode: String,

    /// Initial wizard (build) mode.
    #[serde(default = "crate::defaults::bool_true")]
    pub wizard_mode: bool,

    /// Kernel language matchers, first match wins.
    #[serde(default = "crate::defaults::matchers")]
    pub matchers: Vec<KernelMatcher>,

    /// Overrides of the per-instance config variable defaults.
    ///
    /// Only keys that name a known variable are used.
    #[serde(default)]
    pub config_defaults: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            comm_target: crate::defaults::comm_target(),
            base_instance: crate::defaults::base_instance(),
            base_mode: crate::defaults::base_mode(),
            wizard_mode: true,
            matchers: crate::defaults::matchers(),
            config_defaults: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default path, creating the file with defaults if missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        log::info!("Settings path: {:?}", path);

        if path.exists() {
            Self::load_from(&path)
        } else {
            log::info!("Settings file not found, creating default at {:?}", path);
            let settings = Self::default();
            if let Err(e) = settings.save_to(&path) {
                log::error!("Failed to save default settings: {}", e);
                return Err(e);
            }
            Ok(settings)
        }
    }

    /// Load and validate settings from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml_ng::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.comm_target.trim().is_empty() {
            return Err(ConfigError::Validation(
                "comm_target must not be empty".to_string(),
            ));
        }
        if self.base_instance.trim().is_empty() {
            return Err(ConfigError::Validation(
                "base_instance must not be empty".to_string(),
            ));
        }
        if RESERVED_INSTANCES.contains(&self.base_instance.as_str()) {
            return Err(ConfigError::Validation(format!(
                "base_instance '{}' is a reserved instance name",
                self.base_instance
            )));
        }
        if let Some(matcher) = self
            .matchers
            .iter()
            .find(|m| m.language.as_deref().is_none_or(str::is_empty))
        {
            return Err(ConfigError::Validation(format!(
                "matcher with init script {:?} has no language",
                matcher.init_script
            )));
        }
        Ok(())
    }

    /// Pick the matcher for a kernel, or the generic no-op matcher.
    pub fn matcher_for(&self, kernel_name: &str, language_name: &str) -> KernelMatcher {
        self.matchers
            .iter()
            .find(|m| m.matches(kernel_name, language_name))
            .cloned()
            .unwrap_or_else(KernelMatcher::generic)
    }

    /// Per-instance config variable defaults with overrides applied.
    pub fn config_variable_defaults(&self) -> BTreeMap<String, Value> {
        let mut defaults = crate::defaults::config_variables();
        for (key, value) in &self.config_defaults {
            match defaults.get_mut(key) {
                Some(slot) => *slot = value.clone(),
                None => log::warn!("Ignoring default for unknown config variable '{key}'"),
            }
        }
        defaults
    }

    /// Directory holding the settings file (`~/.config/newton-chat`).
    pub fn config_dir() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("newton-chat")
        } else {
            PathBuf::from(".")
        }
    }

    /// Path of the settings file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }
}
