//! Error types for the analysis pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the loader, cleaner, aggregator and report parser
#[derive(Debug, Error)]
pub enum EdaError {
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Column '{0}' is categorical and has no numeric mean")]
    NotNumeric(String),

    #[error("Parse error: {message} (at '{remaining}')")]
    Parse { message: String, remaining: String },

    #[error("Render error: {0}")]
    Render(String),
}

impl EdaError {
    pub fn data_format(msg: impl Into<String>) -> Self {
        EdaError::DataFormat(msg.into())
    }
}

/// Pipeline stage a fatal error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Aggregate,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

/// A fatal error tagged with the stage that raised it
#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause:#}")]
pub struct StageError {
    pub stage: Stage,
    pub cause: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EdaError>;
