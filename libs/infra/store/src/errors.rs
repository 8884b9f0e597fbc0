// [libs/infra/store/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    ConnectionError(String),

    #[error("configuration invalid: {0}")]
    ConfigurationError(String),

    #[error("query rejected: {0}")]
    QueryError(#[from] libsql::Error),

    #[error("row mapping failed: {0}")]
    MappingError(String),

    #[error("transaction failed to commit")]
    TransactionError,
}
