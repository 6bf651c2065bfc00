//! JSON Schema validation for response documents.
//!
//! Each profile has a schema under `contracts/`, embedded at compile time and
//! compiled once on first use.

use std::sync::OnceLock;
use thiserror::Error;

use crate::findings::Violation;
use crate::types::Profile;

const QUERY_SCHEMA_JSON: &str = include_str!("../../../../contracts/query_response.schema.json");

const VISUALIZATION_SCHEMA_JSON: &str =
    include_str!("../../../../contracts/visualization_response.schema.json");

static QUERY_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static VISUALIZATION_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load {profile} schema: {reason}")]
    LoadError { profile: Profile, reason: String },
}

fn compile(source: &str) -> Result<jsonschema::Validator, String> {
    let schema_value: serde_json::Value = match serde_json::from_str(source) {
        Ok(v) => v,
        Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
    };

    match jsonschema::options().build(&schema_value) {
        Ok(v) => Ok(v),
        Err(e) => Err(format!("Failed to compile schema: {}", e)),
    }
}

/// Get or initialize the compiled validator for a profile.
fn get_validator(profile: Profile) -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = match profile {
        Profile::Query => QUERY_SCHEMA.get_or_init(|| compile(QUERY_SCHEMA_JSON)),
        Profile::Visualization => {
            VISUALIZATION_SCHEMA.get_or_init(|| compile(VISUALIZATION_SCHEMA_JSON))
        }
    };

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError {
            profile,
            reason: e.clone(),
        }),
    }
}

/// Validate a document against its profile schema.
///
/// Returns every schema error as a `Schema` violation tagged with the JSON
/// pointer of the offending instance. A schema that fails to load becomes a
/// single root violation so the response fails closed.
pub fn schema_violations(profile: Profile, document: &serde_json::Value) -> Vec<Violation> {
    let validator = match get_validator(profile) {
        Ok(v) => v,
        Err(e) => return vec![Violation::schema("", e.to_string())],
    };

    validator
        .iter_errors(document)
        .map(|e| Violation::schema(e.instance_path.to_string(), e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_both_schemas_compile() {
        assert!(get_validator(Profile::Query).is_ok());
        assert!(get_validator(Profile::Visualization).is_ok());
    }

    #[test]
    fn test_minimal_query_response_passes() {
        let value = json!({ "assistantMessage": "No queries needed." });
        assert!(schema_violations(Profile::Query, &value).is_empty());
    }

    #[test]
    fn test_missing_message_fails() {
        let value = json!({ "queries": [] });
        let violations = schema_violations(Profile::Query, &value);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("assistantMessage"));
    }

    #[test]
    fn test_wrong_type_is_tagged_with_path() {
        let value = json!({
            "assistantMessage": "ok",
            "queries": [
                { "query": "SELECT 1", "queryType": "SELECT", "isCritical": "no" }
            ]
        });
        let violations = schema_violations(Profile::Query, &value);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "/queries/0/isCritical");
    }

    #[test]
    fn test_unknown_query_kind_fails() {
        let value = json!({
            "assistantMessage": "ok",
            "queries": [
                { "query": "MERGE INTO t", "queryType": "MERGE", "isCritical": true }
            ]
        });
        let violations = schema_violations(Profile::Query, &value);
        assert!(violations.iter().any(|v| v.path == "/queries/0/queryType"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let value = json!({
            "assistantMessage": "ok",
            "confidence": 0.9,
            "queries": [
                {
                    "query": "SELECT 1",
                    "queryType": "SELECT",
                    "isCritical": false,
                    "dialect": "clickhouse"
                }
            ]
        });
        assert!(schema_violations(Profile::Query, &value).is_empty());
    }

    #[test]
    fn test_nullable_fields_accept_null() {
        let value = json!({
            "assistantMessage": "ok",
            "queries": [
                {
                    "query": "SELECT 1",
                    "queryType": "SELECT",
                    "isCritical": false,
                    "rollbackQuery": null,
                    "pagination": null,
                    "exampleResult": null
                }
            ]
        });
        assert!(schema_violations(Profile::Query, &value).is_empty());
    }

    #[test]
    fn test_visualization_requires_reason() {
        let value = json!({ "canVisualize": false });
        assert!(!schema_violations(Profile::Visualization, &value).is_empty());
    }

    #[test]
    fn test_visualization_binding_type_enum() {
        let value = json!({
            "canVisualize": true,
            "reason": "time series",
            "chartConfiguration": {
                "chartType": "line",
                "title": "Events",
                "chartRenderConfig": {
                    "xAxis": { "dataKey": "hour", "type": "timestamp" },
                    "series": [ { "dataKey": "events", "type": "number" } ]
                }
            }
        });
        assert!(!schema_violations(Profile::Visualization, &value).is_empty());
    }
}
