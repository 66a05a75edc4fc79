use crate::error::{EdaError, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Default input file for the credit analysis
pub const DEFAULT_INPUT: &str = "credito.csv";

/// How a column's text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Categorical,
    Integer,
    Decimal,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        !matches!(self, ColumnKind::Categorical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Categorical => "categorical",
            ColumnKind::Integer => "integer",
            ColumnKind::Decimal => "decimal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Ordered list of column names bound positionally to each CSV row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// The 13 positional columns of `credito.csv`
    pub fn credit() -> Self {
        use ColumnKind::*;
        Self::new(vec![
            ColumnSpec::new("idade", Integer),
            ColumnSpec::new("sexo", Categorical),
            ColumnSpec::new("dependentes", Integer),
            ColumnSpec::new("escolaridade", Categorical),
            ColumnSpec::new("estado_civil", Categorical),
            ColumnSpec::new("salario_anual", Categorical),
            ColumnSpec::new("tipo_cartao", Categorical),
            ColumnSpec::new("qtd_produtos", Integer),
            ColumnSpec::new("iteracoes_12m", Integer),
            ColumnSpec::new("meses_inativo_12m", Integer),
            ColumnSpec::new("limite_credito", Decimal),
            ColumnSpec::new("valor_transacoes_12m", Decimal),
            ColumnSpec::new("qtd_transacoes_12m", Integer),
        ])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Find a column index by name (case-insensitive)
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EdaError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&ColumnSpec> {
        self.index_of(name).map(|idx| &self.columns[idx])
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// One customer row, fields kept as loaded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, value: &str) -> bool {
        self.fields.iter().any(|f| f == value)
    }
}

/// Ordered, immutable set of records bound to a schema
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    schema: Schema,
    records: Vec<Record>,
}

impl RecordSet {
    /// Build a record set, rejecting rows whose width differs from the schema
    pub fn new(schema: Schema, records: Vec<Record>) -> Result<Self> {
        for (idx, record) in records.iter().enumerate() {
            check_width(&schema, record.fields().len(), idx + 1)?;
        }
        Ok(Self { schema, records })
    }

    /// Convenience constructor for string-slice rows
    pub fn from_rows(schema: Schema, rows: Vec<Vec<&str>>) -> Result<Self> {
        let records = rows
            .into_iter()
            .map(|r| Record::new(r.into_iter().map(str::to_string).collect()))
            .collect();
        Self::new(schema, records)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self, n: usize) -> &[Record] {
        &self.records[..n.min(self.records.len())]
    }

    /// Derive a new set holding the records that pass `keep`, in original order
    pub fn filter<F>(&self, mut keep: F) -> RecordSet
    where
        F: FnMut(&Record) -> bool,
    {
        RecordSet {
            schema: self.schema.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

fn check_width(schema: &Schema, found: usize, line: usize) -> Result<()> {
    if found != schema.len() {
        return Err(EdaError::data_format(format!(
            "line {} has {} fields, expected {} ({})",
            line,
            found,
            schema.len(),
            schema.names().join(", ")
        )));
    }
    Ok(())
}

/// Load a headerless CSV file, binding each row positionally to `schema`
pub fn load(path: &Path, schema: &Schema) -> Result<RecordSet> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EdaError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => EdaError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let records = load_from_reader(file, schema)?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Load headerless CSV data from any reader
pub fn load_from_reader<R: Read>(reader: R, schema: &Schema) -> Result<RecordSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = result.map_err(|e| {
            EdaError::data_format(format!("failed to read CSV row {}: {}", idx + 1, e))
        })?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
        check_width(schema, row.len(), line)?;
        records.push(Record::new(row.iter().map(str::to_string).collect()));
    }

    Ok(RecordSet {
        schema: schema.clone(),
        records,
    })
}
