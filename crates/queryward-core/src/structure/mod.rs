//! Structural validation of decoded documents.
//!
//! Shape and primitive types are checked against an embedded JSON Schema per
//! profile. Cross-field rules that a schema cannot express cleanly run in
//! code afterwards. All violations are collected before returning.

mod schema;
mod validator;

pub use schema::{schema_violations, SchemaError};
pub use validator::{
    chart_render_view, query_views, validate_structure, ResponseContract, StructuralReport,
};
