//! Validation options, loadable from YAML or JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default cap on raw model output, in bytes.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 256 * 1024;

/// Default cap on object/array nesting.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Shallowest nesting cap that still admits a chart series entry
/// (root, chartConfiguration, chartRenderConfig, series, entry).
pub const MIN_NESTING_DEPTH: usize = 5;

/// Explicit limits below this many rows need no pagination companions.
pub const DEFAULT_PAGINATION_ROW_THRESHOLD: u64 = 50;

/// Soft cap on action buttons per response.
pub const DEFAULT_MAX_ACTION_BUTTONS: usize = 2;

/// Errors that can occur when loading options.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid option {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Read-only thresholds shared by every validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidationOptions {
    /// Raw text longer than this is rejected before scanning
    pub max_document_bytes: usize,

    /// Deepest object/array nesting accepted by the decoder
    pub max_nesting_depth: usize,

    /// `LIMIT n` with `n` below this exempts a SELECT from pagination
    pub pagination_row_threshold: u64,

    /// More buttons than this produce a warning
    pub max_action_buttons: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            pagination_row_threshold: DEFAULT_PAGINATION_ROW_THRESHOLD,
            max_action_buttons: DEFAULT_MAX_ACTION_BUTTONS,
        }
    }
}

impl ValidationOptions {
    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let options: ValidationOptions = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    /// Parse options from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: ValidationOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn with_pagination_row_threshold(mut self, threshold: u64) -> Self {
        self.pagination_row_threshold = threshold;
        self
    }

    pub fn with_max_action_buttons(mut self, max: usize) -> Self {
        self.max_action_buttons = max;
        self
    }

    pub fn with_max_document_bytes(mut self, max: usize) -> Self {
        self.max_document_bytes = max;
        self
    }

    pub fn with_max_nesting_depth(mut self, max: usize) -> Self {
        self.max_nesting_depth = max;
        self
    }

    /// Reject thresholds that would make every response fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_document_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "maxDocumentBytes",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.max_nesting_depth < MIN_NESTING_DEPTH {
            return Err(ConfigError::Invalid {
                field: "maxNestingDepth",
                reason: format!(
                    "must be at least {}, got {}",
                    MIN_NESTING_DEPTH, self.max_nesting_depth
                ),
            });
        }

        if self.pagination_row_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "paginationRowThreshold",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
