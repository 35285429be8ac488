//! Completion limits and host-facing settings
//!
//! Every traversal and scan in the engine is bounded by one of these limits. A
//! limit being reached is never an error: the affected walk stops early and the
//! request returns whatever it collected so far.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Dummy identifier injected by editor hosts at the cursor.
pub const DEFAULT_PLACEHOLDER: &str = "IntellijIdeaRulezzz";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Marker text stripped from the cursor node before prefix decisions
    pub placeholder: String,
    /// Maximum ancestors visited when walking up from the cursor
    pub max_traversal_depth: usize,
    /// Maximum visible bindings collected per request
    pub max_bindings: usize,
    /// Maximum top-level forms scanned for same-file definitions
    pub max_sibling_definitions: usize,
    /// Maximum project files scanned for cross-file definitions
    pub max_project_files: usize,
    /// Maximum public definitions taken from a single project file
    pub max_definitions_per_file: usize,
    /// Files longer than this (in bytes) are not scanned
    pub max_file_text: usize,
    /// Binding vectors longer than this are treated as unparsed
    pub max_vector_text: usize,
    /// Size of the text window used to analyse `ns` clauses
    pub namespace_window: usize,
    /// Optional cap on the number of returned candidates
    pub max_results: Option<usize>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            max_traversal_depth: 20,
            max_bindings: 100,
            max_sibling_definitions: 50,
            max_project_files: 20,
            max_definitions_per_file: 10,
            max_file_text: 100_000,
            max_vector_text: 1000,
            namespace_window: 200,
            max_results: None,
        }
    }
}

impl CompletionConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load overrides from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.placeholder.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "placeholder",
                reason: "must contain at least one non-whitespace character",
            });
        }
        if self.max_traversal_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_traversal_depth",
                reason: "must be greater than zero",
            });
        }
        if self.max_results == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_results",
                reason: "must be greater than zero when set",
            });
        }
        Ok(())
    }

    /// Remove the host placeholder from `text` and trim the remainder.
    ///
    /// The placeholder followed by a space is removed first, then any bare
    /// occurrence, so `"foo IntellijIdeaRulezzz bar"` and `"fooIntellijIdeaRulezzz"`
    /// both normalise cleanly.
    pub fn strip_placeholder(&self, text: &str) -> String {
        let with_space = format!("{} ", self.placeholder);
        text.replace(&with_space, "")
            .replace(&self.placeholder, "")
            .trim()
            .to_string()
    }

    pub fn contains_placeholder(&self, text: &str) -> bool {
        text.contains(&self.placeholder)
    }
}
