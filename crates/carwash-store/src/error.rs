use thiserror::Error;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("no record in '{table}' where {key_column} = {key}")]
    UnknownRecord {
        table: String,
        key_column: String,
        key: String,
    },
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("table '{0}' has no single-column primary key")]
    NoPrimaryKey(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl StorageError {
    /// Stable identifier used in scrub reports.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Database(_) => "storage_database",
            StorageError::UnknownTable(_) => "storage_unknown_table",
            StorageError::UnknownRecord { .. } => "storage_unknown_record",
            StorageError::UnknownColumn { .. } => "storage_unknown_column",
            StorageError::NoPrimaryKey(_) => "storage_no_primary_key",
            StorageError::InvalidCursor(_) => "storage_invalid_cursor",
            StorageError::Decode(_) => "storage_decode",
            StorageError::Timeout { .. } => "storage_timeout",
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(value: sqlx::Error) -> Self {
        StorageError::Database(value.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Decode(value.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
