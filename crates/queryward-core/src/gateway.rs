//! Gateway: one fail-closed verdict per model response.
//!
//! The gateway walks every response through the same states:
//!
//! ```text
//! Received -> Decoded -> StructurallyValid -> SafetyChecked -> PolicyChecked -> Accepted
//!     \__________\______________\___________________\________________\______-> Rejected
//! ```
//!
//! Decode failure short-circuits. After that every stage runs and collects,
//! but the state only advances while stages come back clean. A response is
//! accepted only when no stage produced a violation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::binding::BindingValidator;
use crate::config::{ConfigError, ValidationOptions};
use crate::decoder::{decode, DecodeError, DecodedDocument};
use crate::findings::{Findings, Violation, Warning};
use crate::metrics::GateMetrics;
use crate::pagination::PaginationPolicy;
use crate::safety::SafetyClassifier;
use crate::structure::{chart_render_view, query_views, validate_structure};
use crate::types::{AssistantResponse, Profile, VisualizationResponse};

/// Position of a response in the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateState {
    Received,
    Decoded,
    StructurallyValid,
    SafetyChecked,
    PolicyChecked,
    Accepted,
    Rejected,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Received => "Received",
            GateState::Decoded => "Decoded",
            GateState::StructurallyValid => "StructurallyValid",
            GateState::SafetyChecked => "SafetyChecked",
            GateState::PolicyChecked => "PolicyChecked",
            GateState::Accepted => "Accepted",
            GateState::Rejected => "Rejected",
        }
    }

    /// The state reached when the current stage comes back clean.
    pub fn next(&self) -> Option<GateState> {
        match self {
            GateState::Received => Some(GateState::Decoded),
            GateState::Decoded => Some(GateState::StructurallyValid),
            GateState::StructurallyValid => Some(GateState::SafetyChecked),
            GateState::SafetyChecked => Some(GateState::PolicyChecked),
            GateState::PolicyChecked => Some(GateState::Accepted),
            GateState::Accepted | GateState::Rejected => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Accepted | GateState::Rejected)
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response that passed every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accepted<T> {
    /// The typed response, unchanged from what the model produced
    pub response: T,

    /// Soft findings to surface with the response
    pub warnings: Vec<Warning>,
}

/// Complete report for a rejected response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Last state the response reached cleanly
    pub last_state: GateState,

    /// Every violation from every stage, in stage order
    pub violations: Vec<Violation>,

    pub warnings: Vec<Warning>,
}

impl Rejection {
    /// One-line summary suitable for logs or a retry prompt.
    pub fn summary(&self) -> String {
        match self.violations.first() {
            Some(first) if self.violations.len() > 1 => format!(
                "rejected after {}: {} violations, first: {}",
                self.last_state,
                self.violations.len(),
                first
            ),
            Some(first) => format!("rejected after {}: {}", self.last_state, first),
            None => format!("rejected after {}", self.last_state),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Why a response was not accepted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Response {0}")]
    Rejected(Rejection),

    #[error("Invalid options: {0}")]
    Options(String),
}

impl From<ConfigError> for GateError {
    fn from(e: ConfigError) -> Self {
        GateError::Options(e.to_string())
    }
}

impl GateError {
    /// The rejection report, when decoding succeeded.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            GateError::Rejected(rejection) => Some(rejection),
            GateError::Decode(_) | GateError::Options(_) => None,
        }
    }
}

/// Tracks the state of one response through the stages.
struct Verdict {
    profile: Profile,
    state: GateState,
    halted: bool,
    findings: Findings,
}

impl Verdict {
    fn new(profile: Profile) -> Self {
        Self {
            profile,
            state: GateState::Received,
            halted: false,
            findings: Findings::new(),
        }
    }

    /// Fold in the findings of one stage and advance if it came back clean.
    fn stage(&mut self, findings: Findings) {
        let fatal = findings.is_fatal();
        let stage_violations = findings.violations.len();
        self.findings.extend(findings);

        if self.halted {
            return;
        }

        if fatal {
            self.halted = true;
            tracing::debug!(
                profile = %self.profile,
                state = %self.state,
                violations = stage_violations,
                "Gate halted"
            );
            return;
        }

        if let Some(next) = self.state.next() {
            tracing::debug!(profile = %self.profile, from = %self.state, to = %next, "Gate advanced");
            self.state = next;
        }
    }

    fn finish<T>(
        self,
        document: Option<T>,
        metrics: Option<&GateMetrics>,
    ) -> Result<Accepted<T>, GateError> {
        let Findings {
            violations,
            warnings,
        } = self.findings;

        match document {
            Some(response) if !self.halted && violations.is_empty() => {
                if !warnings.is_empty() {
                    tracing::info!(
                        profile = %self.profile,
                        warnings = warnings.len(),
                        "Response accepted with warnings"
                    );
                } else {
                    tracing::debug!(profile = %self.profile, "Response accepted");
                }
                if let Some(metrics) = metrics {
                    metrics.record_accepted(warnings.len());
                }
                Ok(Accepted { response, warnings })
            }
            _ => {
                let rejection = Rejection {
                    last_state: self.state,
                    violations,
                    warnings,
                };
                tracing::warn!(
                    profile = %self.profile,
                    last_state = %rejection.last_state,
                    violations = rejection.violations.len(),
                    summary = %rejection.summary(),
                    "Response rejected"
                );
                if let Some(metrics) = metrics {
                    metrics.record_rejected(rejection.violations.len(), rejection.warnings.len());
                }
                Err(GateError::Rejected(rejection))
            }
        }
    }
}

/// Validates model responses with a fixed set of options.
///
/// Holds no per-response state; one gateway can serve many threads.
#[derive(Debug, Clone)]
pub struct Gateway {
    options: ValidationOptions,
    metrics: Option<Arc<GateMetrics>>,
}

impl Gateway {
    /// Build a gateway, refusing options that would reject every response.
    pub fn new(options: ValidationOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            metrics: None,
        })
    }

    /// Record every verdict into shared counters.
    pub fn with_metrics(mut self, metrics: Arc<GateMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn metrics(&self) -> Option<&Arc<GateMetrics>> {
        self.metrics.as_ref()
    }

    /// Validate a query-profile response.
    pub fn validate_query(&self, raw: &str) -> Result<Accepted<AssistantResponse>, GateError> {
        let mut verdict = Verdict::new(Profile::Query);
        let decoded = self.decode(raw, Profile::Query)?;
        verdict.stage(Findings::new());

        let structural = validate_structure::<AssistantResponse>(&decoded, &self.options);
        verdict.stage(Findings {
            violations: structural.violations,
            warnings: structural.warnings,
        });

        // Later stages read per-query views so a broken sibling field does
        // not hide safety or pagination problems.
        let queries = query_views(&decoded.value);

        let classifier = SafetyClassifier::new();
        let mut safety = Findings::new();
        for (index, query) in &queries {
            safety.extend(classifier.check(*index, query));
        }
        verdict.stage(safety);

        let policy = PaginationPolicy::from_options(&self.options);
        let mut pagination = Findings::new();
        for (index, query) in &queries {
            pagination.extend(policy.check(*index, query));
        }
        verdict.stage(pagination);

        verdict.finish(structural.document, self.metrics.as_deref())
    }

    /// Validate a visualization-profile response against the columns of the
    /// result set it will be drawn from.
    pub fn validate_visualization(
        &self,
        raw: &str,
        columns: &[String],
    ) -> Result<Accepted<VisualizationResponse>, GateError> {
        let mut verdict = Verdict::new(Profile::Visualization);
        let decoded = self.decode(raw, Profile::Visualization)?;
        verdict.stage(Findings::new());

        let structural = validate_structure::<VisualizationResponse>(&decoded, &self.options);
        verdict.stage(Findings {
            violations: structural.violations,
            warnings: structural.warnings,
        });

        // No queries to classify.
        verdict.stage(Findings::new());

        let bindings = match chart_render_view(&decoded.value) {
            Some(render) => {
                BindingValidator::new(columns.iter().map(String::as_str)).validate(&render)
            }
            None => Findings::new(),
        };
        verdict.stage(bindings);

        verdict.finish(structural.document, self.metrics.as_deref())
    }

    fn decode(
        &self,
        raw: &str,
        profile: Profile,
    ) -> Result<DecodedDocument, GateError> {
        if let Some(metrics) = &self.metrics {
            metrics.record_received();
        }

        decode(raw, profile, &self.options).map_err(|e| {
            tracing::warn!(profile = %profile, error = %e, "Model output could not be decoded");
            if let Some(metrics) = &self.metrics {
                metrics.record_decode_failure();
            }
            GateError::from(e)
        })
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self {
            options: ValidationOptions::default(),
            metrics: None,
        }
    }
}
