use common::JobId;
use thiserror::Error;

/// Errors that can occur when interacting with the job store.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// No job record exists (or it expired) for the given id.
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// A compare-and-swap loop lost too many consecutive races.
    #[error("Compare-and-swap retries exhausted for key '{key}'")]
    CasRetriesExhausted { key: String },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for job store operations.
pub type Result<T> = std::result::Result<T, JobStoreError>;
