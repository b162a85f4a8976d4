//! Per-instance config variables.
//!
//! Each variable is observable through a `tokio::sync::watch` channel. A
//! local write is applied immediately and sent to the kernel with
//! `_mode = init` the first time and `_mode = update` afterwards. Values
//! pushed by the kernel are applied without echoing them back.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::watch;

use crate::error::ChatError;
use crate::protocol::ConfigMode;
use crate::transport::InstancePort;

/// One observable config variable.
#[derive(Debug)]
pub struct ConfigVar {
    name: String,
    default: Value,
    value: watch::Sender<Value>,
    initialized: bool,
}

impl ConfigVar {
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        let (value, _) = watch::channel(default.clone());
        Self {
            name: name.into(),
            default,
            value,
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    /// The value as a boolean. Non-boolean values read as `false`.
    pub fn as_bool(&self) -> bool {
        self.value.borrow().as_bool().unwrap_or(false)
    }

    /// Whether the kernel already knows this variable.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn subscribe(&self) -> watch::Receiver<Value> {
        self.value.subscribe()
    }

    /// Apply locally and send to the kernel.
    pub fn set(&mut self, value: Value, port: &InstancePort) {
        let mode = if self.initialized {
            ConfigMode::Update
        } else {
            ConfigMode::Init
        };
        port.send_config(&self.name, value.clone(), mode);
        self.initialized = true;
        self.value.send_replace(value);
    }

    /// Apply a value that came from the kernel.
    pub fn load(&mut self, value: Value) {
        self.initialized = true;
        self.value.send_replace(value);
    }

    /// Back to the client default, unknown to the kernel.
    pub fn reset(&mut self) {
        self.initialized = false;
        self.value.send_replace(self.default.clone());
    }
}

/// The named config variables of one instance.
#[derive(Debug)]
pub struct ConfigStore {
    vars: BTreeMap<String, ConfigVar>,
}

impl ConfigStore {
    /// Create a store with one variable per default.
    pub fn new(defaults: BTreeMap<String, Value>) -> Self {
        let vars = defaults
            .into_iter()
            .map(|(name, default)| (name.clone(), ConfigVar::new(name, default)))
            .collect();
        Self { vars }
    }

    pub fn var(&self, key: &str) -> Option<&ConfigVar> {
        self.vars.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.vars.get(key).map(ConfigVar::get)
    }

    /// Boolean value of `key`; unknown keys read as `false`.
    pub fn as_bool(&self, key: &str) -> bool {
        self.vars.get(key).is_some_and(ConfigVar::as_bool)
    }

    pub fn subscribe(&self, key: &str) -> Option<watch::Receiver<Value>> {
        self.vars.get(key).map(ConfigVar::subscribe)
    }

    /// Write `key` locally and on the kernel.
    pub fn set(&mut self, key: &str, value: Value, port: &InstancePort) -> Result<(), ChatError> {
        let var = self
            .vars
            .get_mut(key)
            .ok_or_else(|| ChatError::UnknownConfig {
                instance: port.instance().to_string(),
                key: key.to_string(),
            })?;
        var.set(value, port);
        Ok(())
    }

    /// Apply kernel-provided values. Unknown keys are ignored.
    pub fn load_all<'a>(&mut self, config: impl IntoIterator<Item = (&'a String, &'a Value)>) {
        for (key, value) in config {
            match self.vars.get_mut(key) {
                Some(var) => var.load(value.clone()),
                None => log::debug!("Ignoring unknown config variable '{key}'"),
            }
        }
    }

    pub fn reset(&mut self) {
        for var in self.vars.values_mut() {
            var.reset();
        }
    }
}
