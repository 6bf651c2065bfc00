//! Wire types for the two response contracts.
//!
//! Field names and enumeration spellings are the contract with the
//! model-facing prompt. They are camelCase on the wire and must not drift.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which response contract a document is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// SQL suggestions with a user-facing message.
    Query,
    /// Chart configuration for an already executed result set.
    Visualization,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Query => "query",
            Profile::Visualization => "visualization",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// QUERY PROFILE
// ============================================================================

/// Top-level response of the query profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    /// Message shown to the user; present even when no queries are proposed
    pub assistant_message: String,

    /// Suggested follow-up actions
    #[serde(default)]
    pub action_buttons: Vec<ActionButton>,

    /// Proposed queries, in the order the model produced them
    #[serde(default)]
    pub queries: Vec<QuerySuggestion>,
}

/// A follow-up action rendered as a button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionButton {
    pub label: String,
    pub action: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Statement kind declared by the model for a proposed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
}

impl QueryKind {
    /// Kinds that can mutate or destroy data.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            QueryKind::Insert | QueryKind::Update | QueryKind::Delete | QueryKind::Ddl
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
            QueryKind::Ddl => "DDL",
            QueryKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single query proposed by the model.
///
/// The query text is opaque: it is inspected with read-only heuristics and
/// never executed or interpolated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuerySuggestion {
    /// The SQL text
    pub query: String,

    /// Declared statement kind
    pub query_type: QueryKind,

    /// Storage engine hint (DDL only)
    #[serde(default)]
    pub engine: Option<String>,

    /// Partition key hint (DDL only)
    #[serde(default)]
    pub partition_by: Option<String>,

    /// Sort key hint (DDL only)
    #[serde(default)]
    pub order_by: Option<String>,

    /// Tables the query touches
    #[serde(default)]
    pub tables: Vec<String>,

    /// Human explanation of what the query does
    #[serde(default)]
    pub explanation: String,

    /// Whether the model considers this query destructive
    pub is_critical: bool,

    /// Whether the model claims the effect can be undone
    #[serde(default)]
    pub can_rollback: bool,

    /// Ready-to-run statement reversing the effect
    #[serde(default)]
    pub rollback_query: Option<String>,

    /// Read query to run first so a rollback can be authored
    #[serde(default)]
    pub rollback_dependent_query: Option<String>,

    /// Companion pagination queries (SELECT only)
    #[serde(default)]
    pub pagination: Option<PaginationSpec>,

    /// Estimated latency in milliseconds
    #[serde(default)]
    pub estimated_response_time: Option<f64>,

    /// Sample of the expected result, as JSON text
    #[serde(default)]
    pub example_result: Option<String>,
}

/// Companion queries for paginated SELECTs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSpec {
    #[serde(default)]
    pub paginated_query: Option<String>,

    #[serde(default)]
    pub count_query: Option<String>,
}

/// Absent, null and whitespace-only strings all count as empty.
pub fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

// ============================================================================
// VISUALIZATION PROFILE
// ============================================================================

/// Top-level response of the visualization profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationResponse {
    /// Whether the result set can be charted at all
    pub can_visualize: bool,

    /// Why (or why not)
    pub reason: String,

    /// Present iff `can_visualize`
    #[serde(default)]
    pub chart_configuration: Option<ChartConfiguration>,
}

/// Supported chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Pie,
    Scatter,
    Composed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfiguration {
    pub chart_type: ChartKind,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub data_fetch_strategy: Option<DataFetchStrategy>,

    pub chart_render_config: ChartRender,
}

/// How the renderer should obtain the rows it plots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataFetchStrategy {
    #[serde(rename = "type")]
    pub kind: FetchKind,

    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Direct,
    Aggregated,
    Sampled,
}

/// Rendering instructions: which columns feed which visual channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartRender {
    pub x_axis: AxisBinding,

    #[serde(default)]
    pub y_axis: Option<AxisBinding>,

    pub series: Vec<SeriesBinding>,

    #[serde(default)]
    pub colors: Vec<String>,

    #[serde(default)]
    pub features: std::collections::BTreeMap<String, bool>,
}

/// Semantic type of a bound column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Date,
    Category,
    Number,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AxisBinding {
    pub data_key: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub kind: AxisType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBinding {
    pub data_key: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub kind: AxisType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_kinds() {
        assert!(QueryKind::Insert.is_critical());
        assert!(QueryKind::Update.is_critical());
        assert!(QueryKind::Delete.is_critical());
        assert!(QueryKind::Ddl.is_critical());
        assert!(!QueryKind::Select.is_critical());
        assert!(!QueryKind::Other.is_critical());
    }

    #[test]
    fn test_query_kind_wire_spelling() {
        let kind: QueryKind = serde_json::from_str("\"DDL\"").unwrap();
        assert_eq!(kind, QueryKind::Ddl);
        assert!(serde_json::from_str::<QueryKind>("\"select\"").is_err());
    }

    #[test]
    fn test_suggestion_defaults() {
        let suggestion: QuerySuggestion = serde_json::from_value(serde_json::json!({
            "query": "SELECT 1",
            "queryType": "SELECT",
            "isCritical": false,
            "someFutureField": 42
        }))
        .unwrap();

        assert!(!suggestion.can_rollback);
        assert!(suggestion.pagination.is_none());
        assert!(suggestion.tables.is_empty());
        assert!(suggestion.engine.is_none());
    }

    #[test]
    fn test_blank_strings() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some("   ".to_string())));
        assert!(!is_blank(&Some("SELECT 1".to_string())));
    }

    #[test]
    fn test_axis_type_field_name() {
        let axis: AxisBinding = serde_json::from_value(serde_json::json!({
            "dataKey": "hour",
            "label": "Hour",
            "type": "date"
        }))
        .unwrap();
        assert_eq!(axis.kind, AxisType::Date);
    }
}
