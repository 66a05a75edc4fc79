// Abstract Syntax Tree for the report DSL

use crate::aggregate::GroupQuery;
use serde::Serialize;

/// Which record set a report reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Records as loaded
    Raw,
    /// Records with sentinel rows dropped
    #[default]
    Clean,
}

/// How a report's pairs should be drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartKind {
    Pie(PieLayer),
    Bar(BarLayer),
    /// Printed only
    Table,
}

impl ChartKind {
    pub fn is_drawn(&self) -> bool {
        !matches!(self, ChartKind::Table)
    }
}

/// Pie geometry
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PieLayer {
    /// Slice colors, cycled
    pub colors: Vec<String>,
}

/// Bar geometry
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BarLayer {
    /// Bar colors, cycled; takes precedence over `palette`
    pub colors: Vec<String>,
    /// Named ramp sampled once per bar (e.g. "viridis")
    pub palette: Option<String>,
}

/// Report labels (title, axes, per-entry line)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Labels {
    pub title: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    /// Printed once per entry; `{key}` and `{value}` are substituted
    pub line: Option<String>,
}

/// Complete report definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSpec {
    pub name: Option<String>,
    pub source: DataSource,
    pub query: GroupQuery,
    pub chart: ChartKind,
    pub labels: Labels,
}
