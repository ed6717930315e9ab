//! Error taxonomy for the RFM pipeline

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::scoring::Metric;

#[derive(Error, Debug)]
pub enum RfmError {
    /// Required columns are absent from the dataset; nothing is computed.
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("column '{column}' has unsupported type {dtype}, expected {expected}")]
    ColumnType {
        column: String,
        dtype: String,
        expected: &'static str,
    },

    #[error("invalid date '{value}' in row {row}")]
    InvalidDate { row: usize, value: String },

    /// Quantile binning cannot form five distinct buckets.
    #[error("cannot score {metric} into quintiles: {reason}")]
    InsufficientData { metric: Metric, reason: String },

    #[error("unknown segment '{0}'")]
    UnknownSegment(String),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = RfmError> = std::result::Result<T, E>;
