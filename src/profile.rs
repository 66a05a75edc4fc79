//! Dataset overview printed before the reports

use crate::clean::CleanSummary;
use crate::data::{ColumnKind, RecordSet};
use crate::error::Result;
use serde::Serialize;

/// Rows shown from the top of the raw set
pub const HEAD_ROWS: usize = 5;

/// Categorical columns whose distinct values are listed
pub const DISTINCT_COLUMNS: [&str; 4] = ["escolaridade", "estado_civil", "salario_anual", "tipo_cartao"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub present: usize,
    pub missing: usize,
}

/// Per-column counts for one record set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctValues {
    pub column: String,
    pub values: Vec<String>,
}

/// Everything reporters see before the first report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub columns: Vec<String>,
    pub head: Vec<Vec<String>>,
    pub raw: DatasetProfile,
    pub distinct: Vec<DistinctValues>,
    pub clean: DatasetProfile,
    pub clean_summary: CleanSummary,
}

/// Count present and sentinel fields per column
pub fn profile(records: &RecordSet, sentinel: &str) -> DatasetProfile {
    let columns = records
        .schema()
        .columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let missing = records
                .records()
                .iter()
                .filter(|r| {
                    let f = r.get(idx);
                    f.is_empty() || f == sentinel
                })
                .count();
            ColumnInfo {
                name: col.name.clone(),
                kind: col.kind,
                present: records.len() - missing,
                missing,
            }
        })
        .collect();

    DatasetProfile {
        rows: records.len(),
        columns,
    }
}

/// Distinct values of `column` in first-seen order, sentinel included
pub fn distinct_values(records: &RecordSet, column: &str) -> Result<DistinctValues> {
    let idx = records.schema().index_of(column)?;
    let mut values: Vec<String> = Vec::new();
    for record in records.records() {
        let v = record.get(idx);
        if !values.iter().any(|seen| seen == v) {
            values.push(v.to_string());
        }
    }
    Ok(DistinctValues {
        column: records.schema().columns[idx].name.clone(),
        values,
    })
}

/// Build the overview from the raw and cleaned sets
pub fn overview(
    raw: &RecordSet,
    clean: &RecordSet,
    clean_summary: CleanSummary,
    sentinel: &str,
) -> Result<Overview> {
    let distinct = DISTINCT_COLUMNS
        .iter()
        .filter(|c| raw.schema().index_of(c).is_ok())
        .map(|c| distinct_values(raw, c))
        .collect::<Result<Vec<_>>>()?;

    Ok(Overview {
        columns: raw.schema().names().iter().map(|s| s.to_string()).collect(),
        head: raw
            .head(HEAD_ROWS)
            .iter()
            .map(|r| r.fields().to_vec())
            .collect(),
        raw: profile(raw, sentinel),
        distinct,
        clean: profile(clean, sentinel),
        clean_summary,
    })
}
