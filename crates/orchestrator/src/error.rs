//! Provisioning error types.

use job_store::JobStoreError;
use tenancy::DirectoryError;
use thiserror::Error;

/// Errors that can occur during provisioning.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Request rejected before a job was minted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A provisioning step failed.
    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// A step exceeded its bounded wait.
    #[error("Step '{step}' timed out after {seconds}s")]
    StepTimeout { step: String, seconds: u64 },

    /// Health validation reported an unusable tenant.
    #[error("Health validation failed: {0}")]
    Unhealthy(String),

    /// Storage provisioning backend error.
    #[error("Storage provisioner error: {0}")]
    Storage(String),

    /// Billing collaborator error.
    #[error("Billing service error: {0}")]
    Billing(String),

    /// Audit collaborator error.
    #[error("Audit service error: {0}")]
    Audit(String),

    /// Tenant directory error.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Job store error.
    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisioningError>;
