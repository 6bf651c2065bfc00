//! Read-only shape heuristics over SQL text.
//!
//! Nothing here parses SQL. The helpers look for a handful of surface
//! patterns (explicit row limits, bare COUNT projections, the WHERE clause)
//! with case-insensitive regexes. String literals and comments are not
//! understood, so results are best-effort and callers treat them as such.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // ROW LIMITS
    // =========================================================================

    /// `LIMIT n` or MySQL `LIMIT offset, n`
    static ref LIMIT_PATTERN: Regex = Regex::new(
        r"(?i)\bLIMIT\s+(\d+)(?:\s*,\s*(\d+))?"
    ).unwrap();

    /// ANSI `FETCH FIRST n ROWS ONLY`
    static ref FETCH_PATTERN: Regex = Regex::new(
        r"(?i)\bFETCH\s+(?:FIRST|NEXT)\s+(\d+)\s+ROWS?\s+ONLY\b"
    ).unwrap();

    /// SQL Server `SELECT TOP n` / `SELECT TOP (n)`
    static ref TOP_PATTERN: Regex = Regex::new(
        r"(?i)\bSELECT\s+(?:DISTINCT\s+)?TOP\s*\(?\s*(\d+)"
    ).unwrap();

    // =========================================================================
    // PROJECTION
    // =========================================================================

    /// A lone COUNT aggregate, optionally aliased, directly before FROM
    static ref PURE_COUNT_PATTERN: Regex = Regex::new(
        r#"(?is)^\s*SELECT\s+COUNT\s*\(\s*(?:DISTINCT\s+)?[^(),]*\)\s*(?:(?:AS\s+)?[A-Za-z_"`][\w"`]*\s+)?FROM\b"#
    ).unwrap();

    static ref GROUP_BY_PATTERN: Regex = Regex::new(r"(?i)\bGROUP\s+BY\b").unwrap();

    // =========================================================================
    // FILTERS
    // =========================================================================

    static ref WHERE_PATTERN: Regex = Regex::new(r"(?i)\bWHERE\b").unwrap();

    /// Clauses that end a WHERE predicate
    static ref WHERE_END_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:GROUP\s+BY|HAVING|ORDER\s+BY|LIMIT|OFFSET|FETCH|WINDOW|UNION)\b|;"
    ).unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    static ref PUNCTUATION_SPACING: Regex = Regex::new(r"\s*([=<>!(),])\s*").unwrap();
}

/// The explicit row cap of a query, if it declares one.
///
/// When several limits appear (e.g. in a subquery), the one that starts last
/// in the text wins, which is the outer query for the usual trailing form.
pub fn explicit_row_limit(sql: &str) -> Option<u64> {
    let mut last: Option<(usize, u64)> = None;
    let mut consider = |start: usize, digits: &str| {
        if let Ok(n) = digits.parse::<u64>() {
            if last.map_or(true, |(pos, _)| start >= pos) {
                last = Some((start, n));
            }
        }
    };

    for caps in LIMIT_PATTERN.captures_iter(sql) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let count = caps.get(2).or_else(|| caps.get(1));
        if let Some(m) = count {
            consider(start, m.as_str());
        }
    }

    for pattern in [&*FETCH_PATTERN, &*TOP_PATTERN] {
        for caps in pattern.captures_iter(sql) {
            if let (Some(whole), Some(n)) = (caps.get(0), caps.get(1)) {
                consider(whole.start(), n.as_str());
            }
        }
    }

    last.map(|(_, n)| n)
}

/// Whether the only projected expression is a counting aggregate.
///
/// Grouped counts return one row per group and are not pure counts.
pub fn is_pure_count(sql: &str) -> bool {
    PURE_COUNT_PATTERN.is_match(sql) && !GROUP_BY_PATTERN.is_match(sql)
}

/// Text of the first WHERE predicate, without ordering or limit clauses.
pub fn where_clause(sql: &str) -> Option<&str> {
    let start = WHERE_PATTERN.find(sql)?.end();
    let rest = &sql[start..];
    let end = WHERE_END_PATTERN.find(rest).map_or(rest.len(), |m| m.start());
    let predicate = rest[..end].trim();

    if predicate.is_empty() {
        None
    } else {
        Some(predicate)
    }
}

/// Canonical form used for containment checks.
///
/// Lowercases, collapses whitespace, drops spacing around operators and
/// punctuation, and strips trailing semicolons.
pub fn normalize_predicate(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = WHITESPACE.replace_all(lowered.trim(), " ");
    let tightened = PUNCTUATION_SPACING.replace_all(&collapsed, "$1");
    tightened.trim_end_matches(';').trim().to_string()
}

/// Whether `candidate` carries the original query's WHERE predicate.
///
/// Substring containment after normalization: a syntactic heuristic, not a
/// proof of equivalence. A query with no WHERE clause is trivially preserved.
pub fn filters_preserved(original: &str, candidate: &str) -> bool {
    match where_clause(original) {
        None => true,
        Some(predicate) => {
            normalize_predicate(candidate).contains(&normalize_predicate(predicate))
        }
    }
}
