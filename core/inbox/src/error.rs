use thiserror::Error;

/// Failures surfaced by the storage layer. Not-found is never an error here;
/// lookups return `None` and mutations return `false` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stored timestamp: {0}")]
    Timestamp(String),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {id} missing from {table} after write")]
    MissingRow { table: &'static str, id: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;
