//! Provisioning job status records.

use chrono::{DateTime, Utc};
use common::JobId;
use serde::{Deserialize, Serialize};

/// The status of a provisioning job in its lifecycle.
///
/// Status transitions:
/// ```text
/// Started ──► Running ──┬──► Completed
///                       └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The job was accepted but no step has run yet.
    #[default]
    Started,

    /// Provisioning steps are being executed.
    Running,

    /// All steps completed and health validation passed (terminal state).
    Completed,

    /// A step failed and compensation ran (terminal state).
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-job status record held in the progress store.
///
/// Mutated exclusively by the provisioning state machine; polled by clients.
/// Progress is monotonically non-decreasing for the lifetime of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// The job this record tracks.
    pub job_id: JobId,
    /// The tenant slug the job is provisioning.
    pub slug: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Completion percentage, 0–100.
    pub progress: u8,
    /// Name of the step currently executing (or last executed).
    pub current_step: String,
    /// Human-readable progress message.
    pub message: String,
    /// When the job was accepted.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates the initial record for a freshly accepted job.
    pub fn new(job_id: JobId, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            slug: slug.into(),
            status: JobStatus::Started,
            progress: 0,
            current_step: "initializing".to_string(),
            message: "Provisioning request accepted".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
