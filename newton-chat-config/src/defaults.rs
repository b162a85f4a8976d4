//! Default value functions used as `#[serde(default = "...")]` attributes.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::matcher::KernelMatcher;

pub fn comm_target() -> String {
    "newton.comm".to_string()
}

pub fn base_instance() -> String {
    "base".to_string()
}

pub fn base_mode() -> String {
    "newton".to_string()
}

pub fn bool_true() -> bool {
    true
}

pub fn matchers() -> Vec<KernelMatcher> {
    vec![KernelMatcher::python()]
}

/// Client-side defaults of the per-instance config variables.
pub fn config_variables() -> BTreeMap<String, Value> {
    [
        ("process_in_kernel", true),
        ("enable_autocomplete", true),
        ("enable_auto_loading", false),
        ("loading", false),
        ("show_replied", false),
        ("show_index", false),
        ("show_time", true),
        ("show_build_messages", true),
        ("show_kernel_messages", true),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), Value::Bool(value)))
    .collect()
}
