//! Chart binding validation.
//!
//! A chart is only as honest as its bindings: every `dataKey` must name a
//! column that exists in the result set the chart will be drawn from. The
//! column set comes from the caller, never from the model.

use std::collections::BTreeSet;

use crate::findings::{pointer, Findings, Violation};
use crate::types::ChartRender;

const RENDER_PATH: [&str; 2] = ["chartConfiguration", "chartRenderConfig"];

/// Checks chart bindings against the actual result columns.
pub struct BindingValidator<'a> {
    columns: BTreeSet<&'a str>,
}

impl<'a> BindingValidator<'a> {
    /// Create a validator for one result set. Matching is case-sensitive.
    pub fn new<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Validate every binding of a render block.
    ///
    /// Bindings are visited in document order: x axis, y axis, then series.
    pub fn validate(&self, render: &ChartRender) -> Findings {
        let mut findings = Findings::new();

        self.check_key(&render.x_axis.data_key, "xAxis", &["xAxis"], &mut findings);

        if let Some(y_axis) = &render.y_axis {
            self.check_key(&y_axis.data_key, "yAxis", &["yAxis"], &mut findings);
        }

        for (index, series) in render.series.iter().enumerate() {
            let index_segment = index.to_string();
            self.check_key(
                &series.data_key,
                &format!("series[{}]", index),
                &["series", index_segment.as_str()],
                &mut findings,
            );
        }

        findings
    }

    fn check_key(&self, data_key: &str, binding: &str, segments: &[&str], findings: &mut Findings) {
        if self.has_column(data_key) {
            return;
        }

        let path = pointer(
            RENDER_PATH
                .iter()
                .chain(segments.iter())
                .chain(std::iter::once(&"dataKey")),
        );
        findings
            .violations
            .push(Violation::binding(data_key, binding, path));
    }
}
