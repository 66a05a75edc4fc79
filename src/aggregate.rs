use crate::clean::SENTINEL;
use crate::data::RecordSet;
use crate::error::{EdaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Summary statistic computed within each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Mean,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateOp::Mean => f.write_str("mean"),
            AggregateOp::Count => f.write_str("count"),
        }
    }
}

/// Order of entries in an aggregation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Order in which keys first appear in the record set
    #[default]
    FirstSeen,
    /// Numeric order when every key is a number, lexicographic otherwise
    Sorted,
}

/// A group-by request: one categorical column, one optional metric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupQuery {
    pub group_by: String,
    pub metric: Option<String>,
    pub op: AggregateOp,
    #[serde(default)]
    pub order: KeyOrder,
}

impl GroupQuery {
    pub fn mean(group_by: &str, metric: &str) -> Self {
        Self {
            group_by: group_by.to_string(),
            metric: Some(metric.to_string()),
            op: AggregateOp::Mean,
            order: KeyOrder::FirstSeen,
        }
    }

    pub fn count(group_by: &str) -> Self {
        Self {
            group_by: group_by.to_string(),
            metric: None,
            op: AggregateOp::Count,
            order: KeyOrder::FirstSeen,
        }
    }

    pub fn sorted(mut self) -> Self {
        self.order = KeyOrder::Sorted;
        self
    }
}

/// Summary for one distinct group-by value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub key: String,
    /// Records in the group
    pub count: usize,
    /// Metric fields skipped as missing (sentinel or empty)
    pub missing: usize,
    /// Unrounded summary; `None` when a mean has no contributing values
    pub value: Option<f64>,
}

impl GroupEntry {
    /// Values that fed the mean
    pub fn contributing(&self) -> usize {
        self.count - self.missing
    }

    /// Summary rounded to 2 decimal places for display
    pub fn rounded(&self) -> Option<f64> {
        self.value.map(round2)
    }
}

/// Non-fatal conditions surfaced alongside a result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// The record set had no rows, so no groups exist
    EmptyInput { group_by: String },
    /// A group had no usable metric values; its mean is undefined
    EmptyGroup { group_by: String, key: String },
}

impl fmt::Display for AggregationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationWarning::EmptyInput { group_by } => {
                write!(f, "no records to group by '{}'", group_by)
            }
            AggregationWarning::EmptyGroup { group_by, key } => write!(
                f,
                "group '{}' of '{}' has no values; its mean is undefined",
                key, group_by
            ),
        }
    }
}

/// Ordered (key, summary) pairs for one group-by query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub group_by: String,
    pub metric: Option<String>,
    pub op: AggregateOp,
    pub order: KeyOrder,
    pub entries: Vec<GroupEntry>,
    pub warnings: Vec<AggregationWarning>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&GroupEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Rounded (category, value) pairs in result order
    pub fn pairs(&self) -> Vec<(String, Option<f64>)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.rounded()))
            .collect()
    }

    /// Records across all groups
    pub fn total_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}

/// Round half away from zero to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_missing(field: &str, sentinel: &str) -> bool {
    field.is_empty() || field == sentinel
}

/// Group `records` by `group_by` and summarize `metric` within each group
///
/// Entries come back in first-seen key order.
pub fn aggregate(
    records: &RecordSet,
    group_by: &str,
    metric: Option<&str>,
    op: AggregateOp,
) -> Result<Aggregation> {
    let query = GroupQuery {
        group_by: group_by.to_string(),
        metric: metric.map(str::to_string),
        op,
        order: KeyOrder::FirstSeen,
    };
    aggregate_query(records, &query)
}

/// Run a full group-by query, including its key ordering
pub fn aggregate_query(records: &RecordSet, query: &GroupQuery) -> Result<Aggregation> {
    aggregate_query_with_sentinel(records, query, SENTINEL)
}

/// Like [`aggregate_query`], treating `sentinel` as a missing metric value
pub fn aggregate_query_with_sentinel(
    records: &RecordSet,
    query: &GroupQuery,
    sentinel: &str,
) -> Result<Aggregation> {
    let schema = records.schema();
    let group_idx = schema.index_of(&query.group_by)?;

    let metric_idx = match (query.op, &query.metric) {
        (AggregateOp::Mean, Some(metric)) => {
            let idx = schema.index_of(metric)?;
            if !schema.columns[idx].kind.is_numeric() {
                return Err(EdaError::NotNumeric(metric.clone()));
            }
            Some(idx)
        }
        (AggregateOp::Mean, None) => {
            return Err(EdaError::data_format(format!(
                "mean over '{}' needs a metric column",
                query.group_by
            )));
        }
        (AggregateOp::Count, _) => None,
    };

    // Explicit key enumeration: index into `groups` by first appearance
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Accumulator> = Vec::new();

    for (row_idx, record) in records.records().iter().enumerate() {
        let key = record.get(group_idx);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Accumulator::new(key));
            groups.len() - 1
        });
        let acc = &mut groups[slot];
        acc.count += 1;

        if let Some(idx) = metric_idx {
            let raw = record.get(idx);
            if is_missing(raw, sentinel) {
                acc.missing += 1;
                continue;
            }
            let value = raw.parse::<f64>().map_err(|_| {
                EdaError::data_format(format!(
                    "failed to parse '{}' as number in column '{}' at row {}",
                    raw,
                    schema.columns[idx].name,
                    row_idx + 1
                ))
            })?;
            acc.sum += value;
        }
    }

    let mut warnings = Vec::new();
    if records.is_empty() {
        warnings.push(AggregationWarning::EmptyInput {
            group_by: query.group_by.clone(),
        });
    }

    let mut entries: Vec<GroupEntry> = groups
        .into_iter()
        .map(|acc| acc.finish(query.op))
        .collect();

    for entry in &entries {
        if entry.value.is_none() {
            warnings.push(AggregationWarning::EmptyGroup {
                group_by: query.group_by.clone(),
                key: entry.key.clone(),
            });
        }
    }

    if query.order == KeyOrder::Sorted {
        sort_entries(&mut entries);
    }

    Ok(Aggregation {
        group_by: query.group_by.clone(),
        metric: query.metric.clone(),
        op: query.op,
        order: query.order,
        entries,
        warnings,
    })
}

struct Accumulator {
    key: String,
    count: usize,
    missing: usize,
    sum: f64,
}

impl Accumulator {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            count: 0,
            missing: 0,
            sum: 0.0,
        }
    }

    fn finish(self, op: AggregateOp) -> GroupEntry {
        let value = match op {
            AggregateOp::Count => Some(self.count as f64),
            AggregateOp::Mean => {
                let n = self.count - self.missing;
                if n == 0 {
                    None
                } else {
                    Some(self.sum / n as f64)
                }
            }
        };
        GroupEntry {
            key: self.key,
            count: self.count,
            missing: self.missing,
            value,
        }
    }
}

fn sort_entries(entries: &mut [GroupEntry]) {
    let numeric: Option<Vec<f64>> = entries
        .iter()
        .map(|e| e.key.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect();
    match numeric {
        Some(_) => entries.sort_by(|a, b| {
            let fa = a.key.parse::<f64>().unwrap_or(f64::NAN);
            let fb = b.key.parse::<f64>().unwrap_or(f64::NAN);
            fa.total_cmp(&fb)
        }),
        None => entries.sort_by(|a, b| a.key.cmp(&b.key)),
    }
}
