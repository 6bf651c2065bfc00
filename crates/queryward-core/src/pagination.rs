//! Pagination policy for proposed queries.
//!
//! Whether a SELECT must carry a paginated variant and a count variant is
//! decided by the shape of the query text, not by the model:
//!
//! 1. An explicit row limit below the threshold: both companions empty.
//! 2. A bare COUNT projection: no paginated variant.
//! 3. Anything else: both companions present, and the count query keeps the
//!    original WHERE predicate.
//!
//! Non-SELECT queries must not carry companions at all.

use crate::config::ValidationOptions;
use crate::findings::{pointer, Findings, Violation};
use crate::rules::{self, Breach, Evaluation, Expect, Rule, RuleSubject, Severity};
use crate::sql_patterns::{explicit_row_limit, filters_preserved, is_pure_count};
use crate::types::{is_blank, QueryKind, QuerySuggestion};

/// Companion fields of a `PaginationSpec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationField {
    PaginatedQuery,
    CountQuery,
}

impl PaginationField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            PaginationField::PaginatedQuery => "paginatedQuery",
            PaginationField::CountQuery => "countQuery",
        }
    }
}

/// Shape of one query as seen by the pagination rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSubject {
    pub is_select: bool,
    pub row_limit: Option<u64>,
    pub threshold: u64,
    pub pure_count: bool,
    pub paginated_empty: bool,
    pub count_empty: bool,
}

impl PaginationSubject {
    pub fn of(query: &QuerySuggestion, threshold: u64) -> Self {
        let (paginated_empty, count_empty) = match &query.pagination {
            Some(spec) => (is_blank(&spec.paginated_query), is_blank(&spec.count_query)),
            None => (true, true),
        };

        Self {
            is_select: query.query_type == QueryKind::Select,
            row_limit: explicit_row_limit(&query.query),
            threshold,
            pure_count: is_pure_count(&query.query),
            paginated_empty,
            count_empty,
        }
    }

    fn has_small_limit(&self) -> bool {
        self.row_limit.is_some_and(|n| n < self.threshold)
    }
}

impl RuleSubject for PaginationSubject {
    type Field = PaginationField;

    fn is_empty(&self, field: PaginationField) -> bool {
        match field {
            PaginationField::PaginatedQuery => self.paginated_empty,
            PaginationField::CountQuery => self.count_empty,
        }
    }

    fn flag(&self, _field: PaginationField) -> bool {
        false
    }
}

pub const SELECT_ONLY: &str = "PAG-SELECT-ONLY";
pub const SMALL_LIMIT: &str = "PAG-SMALL-LIMIT";
pub const PURE_COUNT: &str = "PAG-PURE-COUNT";
pub const PAGINATE: &str = "PAG-PAGINATE";
pub const COUNT_FILTERS: &str = "PAG-COUNT-FILTERS";

/// Pagination rules; the first rule whose predicate holds decides.
pub const PAGINATION_RULES: &[Rule<PaginationSubject>] = &[
    Rule {
        id: SELECT_ONLY,
        summary: "pagination companions are only allowed on SELECT queries",
        when: |s| !s.is_select,
        expect: &[
            Expect::Empty(PaginationField::PaginatedQuery),
            Expect::Empty(PaginationField::CountQuery),
        ],
        severity: Severity::Fatal,
    },
    Rule {
        id: SMALL_LIMIT,
        summary: "a SELECT with a small explicit limit needs no pagination",
        when: |s| s.has_small_limit(),
        expect: &[
            Expect::Empty(PaginationField::PaginatedQuery),
            Expect::Empty(PaginationField::CountQuery),
        ],
        severity: Severity::Fatal,
    },
    Rule {
        id: PURE_COUNT,
        summary: "a bare COUNT returns one row and must not be paginated",
        when: |s| s.pure_count,
        expect: &[Expect::Empty(PaginationField::PaginatedQuery)],
        severity: Severity::Fatal,
    },
    Rule {
        id: PAGINATE,
        summary: "an unbounded SELECT needs a paginated query and a count query",
        when: |_| true,
        expect: &[
            Expect::NonEmpty(PaginationField::PaginatedQuery),
            Expect::NonEmpty(PaginationField::CountQuery),
        ],
        severity: Severity::Fatal,
    },
];

/// Enforces the pagination rules on each query.
pub struct PaginationPolicy {
    row_threshold: u64,
}

impl PaginationPolicy {
    pub fn new(row_threshold: u64) -> Self {
        Self { row_threshold }
    }

    pub fn from_options(options: &ValidationOptions) -> Self {
        Self::new(options.pagination_row_threshold)
    }

    pub fn row_threshold(&self) -> u64 {
        self.row_threshold
    }

    /// Check one query located at `/queries/{index}`.
    pub fn check(&self, index: usize, query: &QuerySuggestion) -> Findings {
        let subject = PaginationSubject::of(query, self.row_threshold);
        let outcome = rules::run(PAGINATION_RULES, Evaluation::FirstMatch, &subject);
        let mut findings = Findings::new();

        for breach in &outcome.breaches {
            let field = breach.expectation.primary_field();
            findings.violations.push(Violation::pagination(
                breach.rule_id,
                field_path(index, field),
                self.describe(&subject, breach),
            ));
        }

        if outcome.applied(PAGINATE) && !subject.count_empty {
            let count_query = query
                .pagination
                .as_ref()
                .and_then(|spec| spec.count_query.as_deref())
                .unwrap_or_default();

            if !filters_preserved(&query.query, count_query) {
                findings.violations.push(Violation::pagination(
                    COUNT_FILTERS,
                    field_path(index, PaginationField::CountQuery),
                    "countQuery does not contain the WHERE predicate of the original query",
                ));
            }
        }

        findings
    }

    fn describe(&self, subject: &PaginationSubject, breach: &Breach<PaginationField>) -> String {
        let field = breach.expectation.primary_field().wire_name();
        match breach.rule_id {
            SELECT_ONLY => format!("{} must be empty on a non-SELECT query", field),
            SMALL_LIMIT => format!(
                "query is limited to {} rows (below {}); {} must be empty",
                subject.row_limit.unwrap_or_default(),
                subject.threshold,
                field
            ),
            PURE_COUNT => format!("{} must be empty for a single COUNT projection", field),
            PAGINATE => format!("{} is required for a SELECT without a small limit", field),
            _ => format!("{}: {}", field, breach.summary),
        }
    }
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::from_options(&ValidationOptions::default())
    }
}

fn field_path(index: usize, field: PaginationField) -> String {
    let index = index.to_string();
    pointer(["queries", index.as_str(), "pagination", field.wire_name()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaginationSpec;

    fn select(query: &str, paginated: Option<&str>, count: Option<&str>) -> QuerySuggestion {
        let pagination = if paginated.is_none() && count.is_none() {
            None
        } else {
            Some(PaginationSpec {
                paginated_query: paginated.map(str::to_string),
                count_query: count.map(str::to_string),
            })
        };

        QuerySuggestion {
            query: query.to_string(),
            query_type: QueryKind::Select,
            engine: None,
            partition_by: None,
            order_by: None,
            tables: vec![],
            explanation: String::new(),
            is_critical: false,
            can_rollback: false,
            rollback_query: None,
            rollback_dependent_query: None,
            pagination,
            estimated_response_time: None,
            example_result: None,
        }
    }

    fn rule_ids(findings: &Findings) -> Vec<&str> {
        findings
            .violations
            .iter()
            .filter_map(|v| v.rule_id())
            .collect()
    }

    #[test]
    fn test_small_limit_forbids_companions() {
        let query = select(
            "SELECT * FROM users LIMIT 5",
            Some("SELECT ... LIMIT 50 OFFSET :offset"),
            Some(""),
        );
        let findings = PaginationPolicy::default().check(0, &query);

        assert_eq!(rule_ids(&findings), vec![SMALL_LIMIT]);
        assert_eq!(findings.violations[0].path, "/queries/0/pagination/paginatedQuery");
        assert!(findings.violations[0].message.contains("limited to 5 rows"));
    }

    #[test]
    fn test_small_limit_without_companions_passes() {
        let query = select("SELECT * FROM users LIMIT 5", None, None);
        assert!(!PaginationPolicy::default().check(0, &query).is_fatal());

        let empty = select("SELECT * FROM users LIMIT 5", Some(""), Some(""));
        assert!(!PaginationPolicy::default().check(0, &empty).is_fatal());
    }

    #[test]
    fn test_limit_at_threshold_requires_pagination() {
        let query = select("SELECT * FROM users LIMIT 50", None, None);
        let findings = PaginationPolicy::default().check(0, &query);
        assert_eq!(rule_ids(&findings), vec![PAGINATE, PAGINATE]);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let query = select("SELECT * FROM users LIMIT 50", None, None);
        let policy = PaginationPolicy::new(100);
        assert_eq!(policy.row_threshold(), 100);
        assert!(!policy.check(0, &query).is_fatal());
    }

    #[test]
    fn test_pure_count_forbids_paginated_query() {
        let query = select(
            "SELECT COUNT(*) FROM orders WHERE status = 'open'",
            Some("SELECT COUNT(*) FROM orders LIMIT 50 OFFSET 0"),
            None,
        );
        let findings = PaginationPolicy::default().check(1, &query);

        assert_eq!(rule_ids(&findings), vec![PURE_COUNT]);
        assert_eq!(findings.violations[0].path, "/queries/1/pagination/paginatedQuery");
    }

    #[test]
    fn test_pure_count_without_companions_passes() {
        let query = select("SELECT COUNT(*) FROM orders", None, None);
        assert!(!PaginationPolicy::default().check(0, &query).is_fatal());
    }

    #[test]
    fn test_unbounded_select_needs_both() {
        let query = select(
            "SELECT * FROM orders",
            Some("SELECT * FROM orders LIMIT 50 OFFSET :offset"),
            None,
        );
        let findings = PaginationPolicy::default().check(0, &query);

        assert_eq!(rule_ids(&findings), vec![PAGINATE]);
        assert_eq!(findings.violations[0].path, "/queries/0/pagination/countQuery");
    }

    #[test]
    fn test_count_query_must_keep_filters() {
        let query = select(
            "SELECT * FROM orders WHERE status = 'open' ORDER BY created_at DESC",
            Some("SELECT * FROM orders WHERE status = 'open' ORDER BY created_at DESC LIMIT 50 OFFSET :offset"),
            Some("SELECT COUNT(*) FROM orders"),
        );
        let findings = PaginationPolicy::default().check(0, &query);
        assert_eq!(rule_ids(&findings), vec![COUNT_FILTERS]);
    }

    #[test]
    fn test_well_formed_pagination_passes() {
        let query = select(
            "SELECT * FROM orders WHERE status = 'open' ORDER BY created_at DESC",
            Some("SELECT * FROM orders WHERE status = 'open' ORDER BY created_at DESC LIMIT 50 OFFSET :offset"),
            Some("SELECT COUNT(*) FROM orders WHERE status='open'"),
        );
        let findings = PaginationPolicy::default().check(0, &query);
        assert_eq!(findings, Findings::default());
    }

    #[test]
    fn test_non_select_must_not_paginate() {
        let mut query = select(
            "DELETE FROM orders WHERE id = 1",
            Some("SELECT * FROM orders LIMIT 50"),
            None,
        );
        query.query_type = QueryKind::Delete;
        query.is_critical = true;

        let findings = PaginationPolicy::default().check(0, &query);
        assert_eq!(rule_ids(&findings), vec![SELECT_ONLY]);
    }

    #[test]
    fn test_non_select_without_pagination_passes() {
        let mut query = select("INSERT INTO t VALUES (1)", None, None);
        query.query_type = QueryKind::Insert;
        assert!(!PaginationPolicy::default().check(0, &query).is_fatal());
    }
}
