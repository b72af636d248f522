use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad group_by, unmapped dimension, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Date range with start after end.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    /// Missing required column in input data.
    #[error("{side}: missing column '{column}'")]
    MissingColumn { side: Side, column: String },
    /// Date parse error.
    #[error("{side}, record '{record_id}': cannot parse date '{value}'")]
    DateParse {
        side: Side,
        record_id: String,
        value: String,
    },
    /// Amount or weight parse error.
    #[error("{side}, record '{record_id}': cannot parse {field} '{value}'")]
    AmountParse {
        side: Side,
        record_id: String,
        field: &'static str,
        value: String,
    },
    /// Decimal overflow while summing or differencing amounts.
    #[error("amount overflow {context}")]
    AmountOverflow { context: String },
    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
