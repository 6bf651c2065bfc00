//! Violations and warnings produced while vetting a response.
//!
//! Every finding points at a location in the decoded document using JSON
//! pointer syntax (e.g. `/queries/0/isCritical`), so a caller can surface one
//! actionable report instead of one error at a time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a fatal finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Field missing, wrong type, or cross-field shape mismatch
    Schema,

    /// Critical/rollback declaration contradicts the query
    SafetyInvariant { rule_id: String },

    /// Pagination companions do not follow the policy
    PaginationPolicy { rule_id: String },

    /// A chart binding references a column the result does not have
    VisualizationBinding { data_key: String, binding: String },
}

impl ViolationKind {
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::Schema => "SchemaViolation",
            ViolationKind::SafetyInvariant { .. } => "SafetyInvariantViolation",
            ViolationKind::PaginationPolicy { .. } => "PaginationPolicyViolation",
            ViolationKind::VisualizationBinding { .. } => "VisualizationBindingError",
        }
    }
}

/// A fatal finding. Any violation rejects the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// What kind of contract was broken
    pub kind: ViolationKind,

    /// Pointer into the decoded document
    pub path: String,

    /// Human-readable explanation
    pub message: String,
}

impl Violation {
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ViolationKind::Schema,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn safety(
        rule_id: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ViolationKind::SafetyInvariant {
                rule_id: rule_id.into(),
            },
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn pagination(
        rule_id: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ViolationKind::PaginationPolicy {
                rule_id: rule_id.into(),
            },
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn binding(
        data_key: impl Into<String>,
        binding: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let data_key = data_key.into();
        let binding = binding.into();
        let message = format!(
            "dataKey '{}' in {} does not match any result column",
            data_key, binding
        );
        Self {
            kind: ViolationKind::VisualizationBinding { data_key, binding },
            path: path.into(),
            message,
        }
    }

    /// Rule identifier for safety and pagination findings.
    pub fn rule_id(&self) -> Option<&str> {
        match &self.kind {
            ViolationKind::SafetyInvariant { rule_id }
            | ViolationKind::PaginationPolicy { rule_id } => Some(rule_id),
            _ => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind.label(), display_path(&self.path), self.message)
    }
}

/// Category of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// More action buttons than the configured soft limit
    TooManyActionButtons,

    /// Destructive query with no way back; must be shown to the user
    CriticalWithoutRollback,

    /// DDL-only hints set on a query that is not DDL
    IgnoredEngineHints,
}

/// A soft finding, surfaced alongside an accepted response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub path: String,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}: {}", self.kind, display_path(&self.path), self.message)
    }
}

/// Violations and warnings collected by one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any violation present.
    pub fn is_fatal(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn extend(&mut self, other: Findings) {
        self.violations.extend(other.violations);
        self.warnings.extend(other.warnings);
    }
}

/// Build a JSON pointer from segments, escaping `~` and `/`.
pub fn pointer<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.as_ref().replace('~', "~0").replace('/', "~1"));
    }
    out
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
