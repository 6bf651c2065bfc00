//! Declarative rule tables and the runner that evaluates them.
//!
//! A rule pairs a predicate over a subject with the field states required once
//! the predicate holds. Safety and pagination policies are tables of such
//! rules; each rule is testable on its own and new rules do not touch
//! existing ones.

use std::fmt;

/// Anything a rule table can be evaluated against.
pub trait RuleSubject {
    /// Fields the rules may constrain.
    type Field: Copy + fmt::Debug + PartialEq + 'static;

    /// Whether a text field is absent, null or whitespace-only.
    fn is_empty(&self, field: Self::Field) -> bool;

    /// Value of a boolean field.
    fn flag(&self, field: Self::Field) -> bool;
}

/// Required state of one or more fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expect<F> {
    Empty(F),
    NonEmpty(F),
    IsTrue(F),
    IsFalse(F),
    ExactlyOneNonEmpty(F, F),
}

impl<F: Copy> Expect<F> {
    /// The field a breach of this expectation is reported against.
    pub fn primary_field(&self) -> F {
        match *self {
            Expect::Empty(f)
            | Expect::NonEmpty(f)
            | Expect::IsTrue(f)
            | Expect::IsFalse(f)
            | Expect::ExactlyOneNonEmpty(f, _) => f,
        }
    }

    fn holds<S: RuleSubject<Field = F>>(&self, subject: &S) -> bool {
        match *self {
            Expect::Empty(f) => subject.is_empty(f),
            Expect::NonEmpty(f) => !subject.is_empty(f),
            Expect::IsTrue(f) => subject.flag(f),
            Expect::IsFalse(f) => !subject.flag(f),
            Expect::ExactlyOneNonEmpty(a, b) => subject.is_empty(a) != subject.is_empty(b),
        }
    }
}

/// Whether a breach rejects the response or only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Warning,
}

/// How a table is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Only the first rule whose predicate holds applies
    FirstMatch,
    /// Every rule whose predicate holds applies
    Every,
}

/// One row of a rule table.
pub struct Rule<S: RuleSubject> {
    /// Stable identifier reported with every breach
    pub id: &'static str,

    /// One-line statement of the rule
    pub summary: &'static str,

    /// When the rule applies
    pub when: fn(&S) -> bool,

    /// Field states required once it applies
    pub expect: &'static [Expect<S::Field>],

    pub severity: Severity,
}

/// A failed expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct Breach<F> {
    pub rule_id: &'static str,
    pub summary: &'static str,
    pub expectation: Expect<F>,
    pub severity: Severity,
}

/// Result of running a table against one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome<F> {
    /// Ids of the rules whose predicate held, in table order
    pub matched: Vec<&'static str>,

    pub breaches: Vec<Breach<F>>,
}

impl<F> RuleOutcome<F> {
    pub fn applied(&self, rule_id: &str) -> bool {
        self.matched.iter().any(|id| *id == rule_id)
    }
}

/// Evaluate a rule table against a subject.
pub fn run<S: RuleSubject>(
    rules: &[Rule<S>],
    evaluation: Evaluation,
    subject: &S,
) -> RuleOutcome<S::Field> {
    let mut outcome = RuleOutcome {
        matched: Vec::new(),
        breaches: Vec::new(),
    };

    for rule in rules {
        if !(rule.when)(subject) {
            continue;
        }

        outcome.matched.push(rule.id);
        for expectation in rule.expect {
            if !expectation.holds(subject) {
                outcome.breaches.push(Breach {
                    rule_id: rule.id,
                    summary: rule.summary,
                    expectation: *expectation,
                    severity: rule.severity,
                });
            }
        }

        if evaluation == Evaluation::FirstMatch {
            break;
        }
    }

    outcome
}
