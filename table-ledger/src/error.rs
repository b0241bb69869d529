/// Error type definitions
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Entity already exists: PartitionKey='{partition_key}', RowKey='{row_key}'")]
    EntityExists {
        partition_key: String,
        row_key: String,
    },

    #[error("Entity not found: PartitionKey='{partition_key}', RowKey='{row_key}'")]
    EntityNotFound {
        partition_key: String,
        row_key: String,
    },

    #[error("Table service unreachable: {0}")]
    Unreachable(String),

    #[error("Table service error: {0}")]
    Service(String),

    #[error("Invalid account key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}
