use thiserror::Error;
use uuid::Uuid;

/// Failures of the job/metric/incident stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Stored row could not be decoded: {0}")]
    Corrupt(String),

    #[error("Unique constraint violation")]
    Conflict,

    #[error("Invalid job: {0}")]
    Invalid(String),
}

/// Failures that abort a whole job execution
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Engine setup failed: {0}")]
    Setup(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
