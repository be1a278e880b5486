use adpulse_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let db_error = match err {
            StorageError::Query(diesel::result::Error::NotFound) => {
                return Error::NotFound("Record not found".to_string())
            }
            StorageError::Query(e) => DatabaseError::QueryFailed(e.to_string()),
            StorageError::Connection(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::Pool(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::Migration(msg) => DatabaseError::MigrationFailed(msg),
            StorageError::InvalidValue(msg) => DatabaseError::Internal(msg),
            StorageError::Io(e) => DatabaseError::Internal(e.to_string()),
        };
        Error::Database(db_error)
    }
}
