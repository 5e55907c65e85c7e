use thiserror::Error;

/// Failures from the execution backend, passed through unchanged.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    #[error("Failed to read ClickHouse response: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode ClickHouse row: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object per row, got: {0}")]
    UnexpectedRow(String),

    #[error("ClickHouse connection is not configured: set {0}")]
    MissingConnection(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    #[error("Row has {row_columns} column(s) but the query describes {descriptors}")]
    ColumnCountMismatch {
        row_columns: usize,
        descriptors: usize,
    },

    #[error("Row column '{0}' is not part of the query")]
    UnknownColumn(String),
}

#[derive(Debug, Error)]
pub enum QueryRunError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Format(#[from] FormatError),
}
