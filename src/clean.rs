//! Sentinel-based row filtering
//!
//! A row is dropped when any field inside the configured scope equals the
//! sentinel exactly. The default scope covers every field, numeric columns
//! included; hits on numeric columns are logged so the conflation is visible.

use crate::data::{Record, RecordSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Marker for a missing value in the source data
pub const SENTINEL: &str = "na";

/// Which columns the sentinel mask is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SentinelScope {
    /// Match in any field
    #[default]
    #[value(name = "all")]
    AllFields,
    /// Match only in categorical columns
    Categorical,
}

/// What the cleaning pass did
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CleanSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Sentinel hits per column, counted over the input set
    pub sentinel_hits: BTreeMap<String, usize>,
    /// Columns with a numeric kind that held the sentinel
    pub numeric_hits: Vec<String>,
}

impl CleanSummary {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

#[derive(Debug, Clone)]
pub struct Cleaner {
    sentinel: String,
    scope: SentinelScope,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(SENTINEL, SentinelScope::AllFields)
    }
}

impl Cleaner {
    pub fn new(sentinel: &str, scope: SentinelScope) -> Self {
        Self {
            sentinel: sentinel.to_string(),
            scope,
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Return the records containing the sentinel in no in-scope field
    pub fn clean(&self, records: &RecordSet) -> RecordSet {
        let mask = self.scope_mask(records);
        records.filter(|r| !self.is_missing(r, &mask))
    }

    /// Clean and report per-column sentinel hits
    pub fn clean_with_summary(&self, records: &RecordSet) -> (RecordSet, CleanSummary) {
        let schema = records.schema();
        let mut hits: BTreeMap<String, usize> = BTreeMap::new();
        for record in records.records() {
            for (idx, field) in record.fields().iter().enumerate() {
                if *field == self.sentinel {
                    *hits.entry(schema.columns[idx].name.clone()).or_insert(0) += 1;
                }
            }
        }

        let numeric_hits: Vec<String> = schema
            .columns
            .iter()
            .filter(|c| c.kind.is_numeric() && hits.contains_key(&c.name))
            .map(|c| c.name.clone())
            .collect();

        for name in &numeric_hits {
            match self.scope {
                SentinelScope::AllFields => warn!(
                    "Numeric column '{}' holds the sentinel '{}' in {} rows; those rows are dropped",
                    name, self.sentinel, hits[name]
                ),
                SentinelScope::Categorical => debug!(
                    "Numeric column '{}' holds the sentinel in {} rows; out of cleaning scope",
                    name, hits[name]
                ),
            }
        }

        let cleaned = self.clean(records);
        let summary = CleanSummary {
            rows_in: records.len(),
            rows_out: cleaned.len(),
            sentinel_hits: hits,
            numeric_hits,
        };
        debug!(
            "Cleaning dropped {} of {} rows",
            summary.rows_dropped(),
            summary.rows_in
        );

        (cleaned, summary)
    }

    fn scope_mask(&self, records: &RecordSet) -> Vec<bool> {
        records
            .schema()
            .columns
            .iter()
            .map(|c| match self.scope {
                SentinelScope::AllFields => true,
                SentinelScope::Categorical => !c.kind.is_numeric(),
            })
            .collect()
    }

    fn is_missing(&self, record: &Record, mask: &[bool]) -> bool {
        record
            .fields()
            .iter()
            .zip(mask)
            .any(|(field, &in_scope)| in_scope && *field == self.sentinel)
    }
}

/// Drop every record containing `sentinel` in any field
pub fn clean(records: &RecordSet, sentinel: &str) -> RecordSet {
    Cleaner::new(sentinel, SentinelScope::AllFields).clean(records)
}
