//! Safety classification of proposed queries.
//!
//! The declared `isCritical` flag is recomputed from the query kind and the
//! rollback declaration is checked for consistency. Violations are reported,
//! never corrected: rewriting the model's flags would hide unsafe output.

use crate::findings::{pointer, Findings, Violation, Warning, WarningKind};
use crate::rules::{self, Breach, Evaluation, Expect, Rule, RuleSubject, Severity};
use crate::types::{is_blank, QuerySuggestion};

/// Fields of a query the safety rules constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyField {
    IsCritical,
    CanRollback,
    RollbackQuery,
    RollbackDependentQuery,
}

impl SafetyField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SafetyField::IsCritical => "isCritical",
            SafetyField::CanRollback => "canRollback",
            SafetyField::RollbackQuery => "rollbackQuery",
            SafetyField::RollbackDependentQuery => "rollbackDependentQuery",
        }
    }
}

impl RuleSubject for QuerySuggestion {
    type Field = SafetyField;

    fn is_empty(&self, field: SafetyField) -> bool {
        match field {
            SafetyField::RollbackQuery => is_blank(&self.rollback_query),
            SafetyField::RollbackDependentQuery => is_blank(&self.rollback_dependent_query),
            SafetyField::IsCritical | SafetyField::CanRollback => false,
        }
    }

    fn flag(&self, field: SafetyField) -> bool {
        match field {
            SafetyField::IsCritical => self.is_critical,
            SafetyField::CanRollback => self.can_rollback,
            SafetyField::RollbackQuery | SafetyField::RollbackDependentQuery => false,
        }
    }
}

pub const CRITICAL_DECLARED: &str = "SAFE-CRITICAL-DECLARED";
pub const NONCRITICAL_DECLARED: &str = "SAFE-NONCRITICAL-DECLARED";
pub const ROLLBACK_EXCLUSIVE: &str = "SAFE-ROLLBACK-EXCLUSIVE";
pub const IRREVERSIBLE: &str = "SAFE-IRREVERSIBLE";

/// Safety rules, all evaluated for every query.
pub const SAFETY_RULES: &[Rule<QuerySuggestion>] = &[
    Rule {
        id: CRITICAL_DECLARED,
        summary: "INSERT, UPDATE, DELETE and DDL queries must be declared critical",
        when: |q| q.query_type.is_critical(),
        expect: &[Expect::IsTrue(SafetyField::IsCritical)],
        severity: Severity::Fatal,
    },
    Rule {
        id: NONCRITICAL_DECLARED,
        summary: "SELECT and OTHER queries must not be declared critical",
        when: |q| !q.query_type.is_critical(),
        expect: &[Expect::IsFalse(SafetyField::IsCritical)],
        severity: Severity::Fatal,
    },
    Rule {
        id: ROLLBACK_EXCLUSIVE,
        summary: "canRollback requires exactly one of rollbackQuery and rollbackDependentQuery",
        when: |q| q.can_rollback,
        expect: &[Expect::ExactlyOneNonEmpty(
            SafetyField::RollbackQuery,
            SafetyField::RollbackDependentQuery,
        )],
        severity: Severity::Fatal,
    },
    Rule {
        id: IRREVERSIBLE,
        summary: "critical query cannot be rolled back; surface the risk before running it",
        when: |q| Classification::of(q).effective(),
        expect: &[Expect::IsTrue(SafetyField::CanRollback)],
        severity: Severity::Warning,
    },
];

/// Declared and derived criticality of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// What the model claimed
    pub declared: bool,

    /// What the query kind implies
    pub derived: bool,
}

impl Classification {
    pub fn of(query: &QuerySuggestion) -> Self {
        Self {
            declared: query.is_critical,
            derived: query.query_type.is_critical(),
        }
    }

    /// Critical if either side says so; doubt fails closed.
    pub fn effective(&self) -> bool {
        self.declared || self.derived
    }

    pub fn is_consistent(&self) -> bool {
        self.declared == self.derived
    }
}

/// Checks the critical and rollback invariants of each query.
pub struct SafetyClassifier;

impl SafetyClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Check one query located at `/queries/{index}`.
    pub fn check(&self, index: usize, query: &QuerySuggestion) -> Findings {
        let outcome = rules::run(SAFETY_RULES, Evaluation::Every, query);
        let mut findings = Findings::new();

        for breach in outcome.breaches {
            let path = breach_path(index, &breach);
            let message = self.describe(query, &breach);

            match breach.severity {
                Severity::Fatal => {
                    findings
                        .violations
                        .push(Violation::safety(breach.rule_id, path, message));
                }
                Severity::Warning => {
                    findings.warnings.push(Warning::new(
                        WarningKind::CriticalWithoutRollback,
                        path,
                        message,
                    ));
                }
            }
        }

        findings
    }

    fn describe(&self, query: &QuerySuggestion, breach: &Breach<SafetyField>) -> String {
        let classification = Classification::of(query);
        match breach.rule_id {
            CRITICAL_DECLARED | NONCRITICAL_DECLARED => format!(
                "{} query declared isCritical={}, expected {}",
                query.query_type, classification.declared, classification.derived
            ),
            ROLLBACK_EXCLUSIVE => {
                let both_empty = is_blank(&query.rollback_query)
                    && is_blank(&query.rollback_dependent_query);
                if both_empty {
                    "canRollback is true but rollbackQuery and rollbackDependentQuery are both empty"
                        .to_string()
                } else {
                    "canRollback is true but both rollbackQuery and rollbackDependentQuery are set"
                        .to_string()
                }
            }
            _ => format!("{} query: {}", query.query_type, breach.summary),
        }
    }
}

impl Default for SafetyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn breach_path(index: usize, breach: &Breach<SafetyField>) -> String {
    let index = index.to_string();
    pointer([
        "queries",
        index.as_str(),
        breach.expectation.primary_field().wire_name(),
    ])
}
