//! Profile-specific structural validation.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ValidationOptions;
use crate::decoder::DecodedDocument;
use crate::findings::{pointer, Violation, Warning, WarningKind};
use crate::types::{AssistantResponse, ChartRender, Profile, QuerySuggestion, VisualizationResponse};

use super::schema::schema_violations;

/// A response contract the structural validator knows how to check.
///
/// Each implementor is bound to exactly one `Profile`; the schema is chosen
/// from that profile and the cross-field rules live here.
pub trait ResponseContract: DeserializeOwned + Sized {
    const PROFILE: Profile;

    /// Cross-field rules run on the raw document after the schema check.
    fn cross_field_checks(
        document: &Value,
        options: &ValidationOptions,
        violations: &mut Vec<Violation>,
        warnings: &mut Vec<Warning>,
    );
}

/// Outcome of structural validation.
#[derive(Debug, Clone)]
pub struct StructuralReport<T> {
    /// Typed document, present only when there are no violations
    pub document: Option<T>,

    /// Every structural violation, ordered by path
    pub violations: Vec<Violation>,

    /// Soft findings at this layer
    pub warnings: Vec<Warning>,
}

impl<T> StructuralReport<T> {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty() && self.document.is_some()
    }
}

/// Validate a decoded document against the contract `T`.
pub fn validate_structure<T: ResponseContract>(
    decoded: &DecodedDocument,
    options: &ValidationOptions,
) -> StructuralReport<T> {
    let document = &decoded.value;

    let mut violations = if decoded.profile == T::PROFILE {
        schema_violations(T::PROFILE, document)
    } else {
        vec![Violation::schema(
            "",
            format!(
                "document was decoded for the {} profile, not {}",
                decoded.profile,
                T::PROFILE
            ),
        )]
    };
    let mut warnings = Vec::new();

    T::cross_field_checks(document, options, &mut violations, &mut warnings);

    violations.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
    violations.dedup();

    let typed = if violations.is_empty() {
        match serde_json::from_value::<T>(document.clone()) {
            Ok(t) => Some(t),
            Err(e) => {
                violations.push(Violation::schema(
                    "",
                    format!("document does not match the {} contract: {}", T::PROFILE, e),
                ));
                None
            }
        }
    } else {
        None
    };

    StructuralReport {
        document: typed,
        violations,
        warnings,
    }
}

impl ResponseContract for AssistantResponse {
    const PROFILE: Profile = Profile::Query;

    fn cross_field_checks(
        document: &Value,
        options: &ValidationOptions,
        violations: &mut Vec<Violation>,
        warnings: &mut Vec<Warning>,
    ) {
        if let Some(buttons) = document.get("actionButtons").and_then(Value::as_array) {
            if buttons.len() > options.max_action_buttons {
                warnings.push(Warning::new(
                    WarningKind::TooManyActionButtons,
                    "/actionButtons",
                    format!(
                        "{} action buttons proposed, at most {} are shown",
                        buttons.len(),
                        options.max_action_buttons
                    ),
                ));
            }
        }

        let Some(queries) = document.get("queries").and_then(Value::as_array) else {
            return;
        };

        for (index, query) in queries.iter().enumerate() {
            let index = index.to_string();

            if let Some(example) = query.get("exampleResult").and_then(Value::as_str) {
                if !example.trim().is_empty() {
                    if let Err(e) = serde_json::from_str::<Value>(example) {
                        violations.push(Violation::schema(
                            pointer(["queries", index.as_str(), "exampleResult"]),
                            format!("exampleResult is not valid JSON text: {}", e),
                        ));
                    }
                }
            }

            let is_ddl = query.get("queryType").and_then(Value::as_str) == Some("DDL");
            let hinted: Vec<&str> = ["engine", "partitionBy", "orderBy"]
                .into_iter()
                .filter(|field| {
                    query
                        .get(*field)
                        .and_then(Value::as_str)
                        .is_some_and(|s| !s.trim().is_empty())
                })
                .collect();
            if !is_ddl && !hinted.is_empty() {
                warnings.push(Warning::new(
                    WarningKind::IgnoredEngineHints,
                    pointer(["queries", index.as_str()]),
                    format!("{} only apply to DDL and will be ignored", hinted.join(", ")),
                ));
            }
        }
    }
}

impl ResponseContract for VisualizationResponse {
    const PROFILE: Profile = Profile::Visualization;

    fn cross_field_checks(
        document: &Value,
        _options: &ValidationOptions,
        violations: &mut Vec<Violation>,
        _warnings: &mut Vec<Warning>,
    ) {
        // Draft-07 accepts `5.0` as an integer; the typed view does not.
        let limit = document
            .get("chartConfiguration")
            .and_then(|chart| chart.get("dataFetchStrategy"))
            .and_then(|strategy| strategy.get("limit"));
        if let Some(n) = limit.filter(|l| l.as_u64().is_none()).and_then(Value::as_f64) {
            if n >= 1.0 && n.fract() == 0.0 {
                violations.push(Violation::schema(
                    "/chartConfiguration/dataFetchStrategy/limit",
                    format!(
                        "limit must be written as a whole number without a decimal point, got {}",
                        n
                    ),
                ));
            }
        }

        let Some(can_visualize) = document.get("canVisualize").and_then(Value::as_bool) else {
            // Missing or mistyped flag is already a schema violation.
            return;
        };

        let has_chart = document
            .get("chartConfiguration")
            .is_some_and(|chart| !chart.is_null());

        match (can_visualize, has_chart) {
            (false, true) => violations.push(Violation::schema(
                "/chartConfiguration",
                "chartConfiguration must be absent when canVisualize is false",
            )),
            (true, false) => violations.push(Violation::schema(
                "/chartConfiguration",
                "chartConfiguration is required when canVisualize is true",
            )),
            _ => {}
        }
    }
}

/// Typed views of the queries that deserialize on their own.
///
/// Lets later stages report on well-formed queries even when a sibling field
/// is broken, so one call yields the complete report.
pub fn query_views(document: &Value) -> Vec<(usize, QuerySuggestion)> {
    document
        .get("queries")
        .and_then(Value::as_array)
        .map(|queries| {
            queries
                .iter()
                .enumerate()
                .filter_map(|(index, query)| {
                    serde_json::from_value::<QuerySuggestion>(query.clone())
                        .ok()
                        .map(|suggestion| (index, suggestion))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Typed view of the chart render block, if it deserializes on its own.
pub fn chart_render_view(document: &Value) -> Option<ChartRender> {
    let render = document
        .get("chartConfiguration")?
        .get("chartRenderConfig")?;
    serde_json::from_value(render.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::ViolationKind;
    use serde_json::json;

    fn decoded(profile: Profile, value: Value) -> DecodedDocument {
        DecodedDocument {
            profile,
            value,
            span: 0..0,
            unwrapped: false,
        }
    }

    #[test]
    fn test_valid_query_response() {
        let doc = decoded(
            Profile::Query,
            json!({
                "assistantMessage": "Here you go",
                "actionButtons": [ { "label": "Run", "action": "run", "isPrimary": true } ],
                "queries": [
                    {
                        "query": "SELECT count(*) FROM users",
                        "queryType": "SELECT",
                        "isCritical": false,
                        "exampleResult": "[{\"count\": 42}]"
                    }
                ]
            }),
        );

        let report = validate_structure::<AssistantResponse>(&doc, &ValidationOptions::default());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
        let response = report.document.unwrap();
        assert_eq!(response.queries.len(), 1);
        assert_eq!(response.action_buttons.len(), 1);
    }

    #[test]
    fn test_violations_are_collected_not_fail_fast() {
        let doc = decoded(
            Profile::Query,
            json!({
                "queries": [
                    { "query": "SELECT 1", "queryType": "SELECT" },
                    { "query": "SELECT 2", "queryType": "SELECT", "isCritical": false, "tables": "users" }
                ]
            }),
        );

        let report = validate_structure::<AssistantResponse>(&doc, &ValidationOptions::default());
        assert!(report.document.is_none());
        assert!(report.violations.len() >= 3);
        assert!(report.violations.iter().all(|v| v.kind == ViolationKind::Schema));
        assert!(report.violations.iter().any(|v| v.path == "/queries/1/tables"));
    }

    #[test]
    fn test_example_result_must_be_json() {
        let doc = decoded(
            Profile::Query,
            json!({
                "assistantMessage": "ok",
                "queries": [
                    {
                        "query": "SELECT 1",
                        "queryType": "SELECT",
                        "isCritical": false,
                        "exampleResult": "one row with value 1"
                    }
                ]
            }),
        );

        let report = validate_structure::<AssistantResponse>(&doc, &ValidationOptions::default());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].path, "/queries/0/exampleResult");
    }

    #[test]
    fn test_button_limit_is_a_warning() {
        let doc = decoded(
            Profile::Query,
            json!({
                "assistantMessage": "ok",
                "actionButtons": [
                    { "label": "A", "action": "a" },
                    { "label": "B", "action": "b" },
                    { "label": "C", "action": "c" }
                ]
            }),
        );

        let report = validate_structure::<AssistantResponse>(&doc, &ValidationOptions::default());
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::TooManyActionButtons);
    }

    #[test]
    fn test_engine_hints_on_select_warn() {
        let doc = decoded(
            Profile::Query,
            json!({
                "assistantMessage": "ok",
                "queries": [
                    {
                        "query": "SELECT * FROM events LIMIT 10",
                        "queryType": "SELECT",
                        "isCritical": false,
                        "engine": "MergeTree"
                    }
                ]
            }),
        );

        let report = validate_structure::<AssistantResponse>(&doc, &ValidationOptions::default());
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].kind, WarningKind::IgnoredEngineHints);
        assert_eq!(report.warnings[0].path, "/queries/0");
    }

    #[test]
    fn test_chart_required_when_visualizable() {
        let doc = decoded(
            Profile::Visualization,
            json!({ "canVisualize": true, "reason": "numeric series" }),
        );

        let report =
            validate_structure::<VisualizationResponse>(&doc, &ValidationOptions::default());
        assert!(!report.is_valid());
        assert_eq!(report.violations[0].path, "/chartConfiguration");
    }

    #[test]
    fn test_chart_forbidden_when_not_visualizable() {
        let doc = decoded(
            Profile::Visualization,
            json!({
                "canVisualize": false,
                "reason": "single scalar",
                "chartConfiguration": {
                    "chartType": "bar",
                    "title": "x",
                    "chartRenderConfig": {
                        "xAxis": { "dataKey": "a", "type": "category" },
                        "series": [ { "dataKey": "b", "type": "number" } ]
                    }
                }
            }),
        );

        let report =
            validate_structure::<VisualizationResponse>(&doc, &ValidationOptions::default());
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].message.contains("must be absent"));
    }

    #[test]
    fn test_null_chart_counts_as_absent() {
        let doc = decoded(
            Profile::Visualization,
            json!({ "canVisualize": false, "reason": "no numeric column", "chartConfiguration": null }),
        );

        let report =
            validate_structure::<VisualizationResponse>(&doc, &ValidationOptions::default());
        assert!(report.is_valid());
    }

    #[test]
    fn test_float_fetch_limit_has_a_path() {
        let doc = decoded(
            Profile::Visualization,
            json!({
                "canVisualize": true,
                "reason": "time series",
                "chartConfiguration": {
                    "chartType": "line",
                    "title": "x",
                    "dataFetchStrategy": { "type": "sampled", "limit": 5.0 },
                    "chartRenderConfig": {
                        "xAxis": { "dataKey": "a", "type": "date" },
                        "series": [ { "dataKey": "b", "type": "number" } ]
                    }
                }
            }),
        );

        let report =
            validate_structure::<VisualizationResponse>(&doc, &ValidationOptions::default());
        assert!(report.document.is_none());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(
            report.violations[0].path,
            "/chartConfiguration/dataFetchStrategy/limit"
        );
    }

    #[test]
    fn test_integer_fetch_limit_passes() {
        let doc = decoded(
            Profile::Visualization,
            json!({
                "canVisualize": true,
                "reason": "time series",
                "chartConfiguration": {
                    "chartType": "bar",
                    "title": "x",
                    "dataFetchStrategy": { "type": "sampled", "limit": 500 },
                    "chartRenderConfig": {
                        "xAxis": { "dataKey": "a", "type": "category" },
                        "series": [ { "dataKey": "b", "type": "number" } ]
                    }
                }
            }),
        );

        let report =
            validate_structure::<VisualizationResponse>(&doc, &ValidationOptions::default());
        assert!(report.is_valid());
        let chart = report.document.unwrap().chart_configuration.unwrap();
        assert_eq!(chart.data_fetch_strategy.unwrap().limit, Some(500));
    }

    #[test]
    fn test_profile_mismatch_is_rejected() {
        let doc = decoded(Profile::Visualization, json!({ "assistantMessage": "ok" }));
        let report = validate_structure::<AssistantResponse>(&doc, &ValidationOptions::default());
        assert!(!report.is_valid());
        assert!(report.violations[0].message.contains("visualization profile"));
    }

    #[test]
    fn test_query_views_skip_broken_entries() {
        let value = json!({
            "queries": [
                { "query": "SELECT 1", "queryType": "SELECT", "isCritical": false },
                { "query": "SELECT 2", "queryType": "SELECT" },
                { "query": "DROP TABLE t", "queryType": "DDL", "isCritical": false }
            ]
        });

        let views = query_views(&value);
        let indexes: Vec<usize> = views.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![0, 2]);
    }
}
