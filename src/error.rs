use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::data::model::Measure;

/// The dataset could not be loaded. Loads are all-or-nothing.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("data file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}, column '{column}': {message}")]
    InvalidCell {
        row: usize,
        column: String,
        message: String,
    },

    #[error("reference date {0} appears more than once")]
    DuplicateDate(NaiveDate),

    #[error("malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
}

/// A range constraint with `min > max` reached the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {measure} range: min {min} is greater than max {max}")]
pub struct InvalidConstraintError {
    pub measure: Measure,
    pub min: f64,
    pub max: f64,
}
