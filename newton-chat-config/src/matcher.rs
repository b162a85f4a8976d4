//! Kernel language matchers.
//!
//! A matcher selects the bootstrap statement that starts the kernel-side
//! counterpart and the error text that identifies its known failure.

use serde::{Deserialize, Serialize};

/// Bootstrap description for one kernel language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelMatcher {
    /// Substring searched in the kernel name and the reported language name.
    /// `None` for the generic matcher.
    #[serde(default)]
    pub language: Option<String>,
    /// Statement executed once per (re)connection.
    #[serde(default)]
    pub init_script: Option<String>,
    /// Exact `evalue` of the bootstrap error that means the counterpart is missing.
    #[serde(default)]
    pub evalue: Option<String>,
}

impl KernelMatcher {
    /// No-op matcher used for unsupported languages.
    pub fn generic() -> Self {
        Self {
            language: None,
            init_script: None,
            evalue: None,
        }
    }

    pub fn python() -> Self {
        Self {
            language: Some("python".to_string()),
            init_script: Some("import newtonchat.comm; newtonchat.comm.init()".to_string()),
            evalue: Some("No module named 'newtonchat.comm'".to_string()),
        }
    }

    /// Whether this matcher applies to a kernel.
    pub fn matches(&self, kernel_name: &str, language_name: &str) -> bool {
        match self.language.as_deref() {
            Some(language) if !language.is_empty() => {
                kernel_name.contains(language) || language_name.contains(language)
            }
            _ => false,
        }
    }

    /// Whether an error reported by the bootstrap is this matcher's known failure.
    pub fn is_known_failure(&self, evalue: &str) -> bool {
        self.evalue.as_deref() == Some(evalue)
    }
}

impl Default for KernelMatcher {
    fn default() -> Self {
        Self::generic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_matches_kernel_or_language() {
        let matcher = KernelMatcher::python();
        assert!(matcher.matches("python3", ""));
        assert!(matcher.matches("conda-env-ml-py", "python"));
        assert!(!matcher.matches("ir", "R"));
    }

    #[test]
    fn test_generic_never_matches() {
        let matcher = KernelMatcher::generic();
        assert!(!matcher.matches("python3", "python"));
        assert_eq!(matcher, KernelMatcher::generic());
        assert!(!matcher.is_known_failure(""));
    }

    #[test]
    fn test_known_failure_is_exact() {
        let matcher = KernelMatcher::python();
        assert!(matcher.is_known_failure("No module named 'newtonchat.comm'"));
        assert!(!matcher.is_known_failure("No module named 'newtonchat'"));
    }
}
