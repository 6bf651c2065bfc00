//! # queryward-core
//!
//! Fail-closed validation of LLM-proposed SQL and chart responses.
//!
//! This crate sits between a language model and anything that would run or
//! render its output, answering:
//! - Is this one well-formed JSON document of the expected shape?
//! - Are destructive queries declared critical, with a coherent rollback?
//! - Are the pagination companions right for the query's shape?
//! - Does every chart binding name a real result column?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same raw text always produces the same verdict and
//!    the same ordered findings
//! 2. **Fail-closed**: Anything ambiguous is rejected, nothing is repaired
//! 3. **Complete reports**: Every violation is collected in one pass
//! 4. **Never executes SQL**: Query text is only inspected
//!
//! ## Example
//!
//! ```rust,ignore
//! use queryward_core::{validate_query_response, GateError, ValidationOptions};
//!
//! let options = ValidationOptions::default();
//! match validate_query_response(raw_model_output, &options) {
//!     Ok(accepted) => show(accepted.response, accepted.warnings),
//!     Err(GateError::Rejected(rejection)) => retry_with(rejection.summary()),
//!     Err(GateError::Decode(e)) => retry_with(e.to_string()),
//!     Err(GateError::Options(reason)) => panic!("bad options: {}", reason),
//! }
//! ```

pub mod binding;
pub mod config;
pub mod decoder;
pub mod findings;
pub mod gateway;
pub mod metrics;
pub mod pagination;
pub mod rules;
pub mod safety;
pub mod sql_patterns;
pub mod structure;
pub mod types;

// Re-export main types at crate root
pub use binding::BindingValidator;
pub use config::{ConfigError, ValidationOptions, MIN_NESTING_DEPTH};
pub use decoder::{decode, DecodeError, DecodedDocument};
pub use findings::{Findings, Violation, ViolationKind, Warning, WarningKind};
pub use gateway::{Accepted, GateError, GateState, Gateway, Rejection};
pub use metrics::{GateMetrics, MetricsSnapshot};
pub use pagination::PaginationPolicy;
pub use safety::{Classification, SafetyClassifier};
pub use structure::{validate_structure, ResponseContract, SchemaError, StructuralReport};
pub use types::{
    ActionButton, AssistantResponse, AxisBinding, AxisType, ChartConfiguration, ChartKind,
    ChartRender, DataFetchStrategy, FetchKind, PaginationSpec, Profile, QueryKind,
    QuerySuggestion, SeriesBinding, VisualizationResponse,
};

/// Validate a query-profile response.
///
/// This is the main entry point for SQL suggestions.
///
/// # Arguments
///
/// * `raw` - The model output, as received
/// * `options` - Size caps and policy thresholds
///
/// # Returns
///
/// The typed response with its warnings, or a `GateError` carrying the
/// decode failure, the complete rejection report, or the reason `options`
/// were refused.
pub fn validate_query_response(
    raw: &str,
    options: &ValidationOptions,
) -> Result<Accepted<AssistantResponse>, GateError> {
    Gateway::new(options.clone())?.validate_query(raw)
}

/// Validate a visualization-profile response.
///
/// # Arguments
///
/// * `raw` - The model output, as received
/// * `columns` - Column names of the executed result set
/// * `options` - Size caps and policy thresholds
pub fn validate_visualization_response(
    raw: &str,
    columns: &[String],
    options: &ValidationOptions,
) -> Result<Accepted<VisualizationResponse>, GateError> {
    Gateway::new(options.clone())?.validate_visualization(raw, columns)
}
