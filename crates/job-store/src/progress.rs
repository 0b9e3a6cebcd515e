//! Progress tracking for in-flight provisioning jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::JobId;

use crate::{
    JobStoreError, Result,
    job::{JobRecord, JobStatus},
    kv::{CasOutcome, KeyValueStore},
};

/// How long a job record survives without updates. Every write refreshes
/// the TTL, so the record expires this long after the job's last activity.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(300);

const MAX_CAS_RETRIES: usize = 16;

fn job_key(job_id: JobId) -> String {
    format!("provision:job:{job_id}")
}

/// Tracks per-job status records in the shared key/value store.
///
/// Updates go through a compare-and-swap loop, and progress is clamped so a
/// polling client never observes it regress. Terminal records are immutable.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ProgressTracker {
    /// Creates a tracker with the default record TTL.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, DEFAULT_JOB_TTL)
    }

    /// Creates a tracker with a custom record TTL.
    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Registers the initial record for a freshly accepted job.
    pub async fn register(&self, job_id: JobId, slug: &str) -> Result<JobRecord> {
        let record = JobRecord::new(job_id, slug);
        self.store
            .put(&job_key(job_id), serde_json::to_value(&record)?, self.ttl)
            .await?;
        Ok(record)
    }

    /// Returns the current record for a job, or None once the TTL elapsed.
    pub async fn get(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        match self.store.get(&job_key(job_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
            None => Ok(None),
        }
    }

    /// Records a step transition. Progress is clamped to never decrease.
    pub async fn advance(
        &self,
        job_id: JobId,
        progress: u8,
        step: &str,
        message: &str,
    ) -> Result<JobRecord> {
        self.update(job_id, |mut record| {
            record.status = JobStatus::Running;
            record.progress = record.progress.max(progress.min(100));
            record.current_step = step.to_string();
            record.message = message.to_string();
            record.updated_at = Utc::now();
            record
        })
        .await
    }

    /// Transitions the job to `completed` with full progress.
    pub async fn complete(&self, job_id: JobId, message: &str) -> Result<JobRecord> {
        self.update(job_id, |mut record| {
            record.status = JobStatus::Completed;
            record.progress = 100;
            record.current_step = "completed".to_string();
            record.message = message.to_string();
            record.updated_at = Utc::now();
            record
        })
        .await
    }

    /// Transitions the job to `failed`. The last progress value is kept so
    /// polling never observes a regression.
    pub async fn fail(&self, job_id: JobId, step: &str, message: &str) -> Result<JobRecord> {
        self.update(job_id, |mut record| {
            record.status = JobStatus::Failed;
            record.current_step = step.to_string();
            record.message = message.to_string();
            record.updated_at = Utc::now();
            record
        })
        .await
    }

    /// Removes the record for a job.
    pub async fn remove(&self, job_id: JobId) -> Result<()> {
        self.store.remove(&job_key(job_id)).await
    }

    /// Applies `apply` to the current record under a compare-and-swap loop.
    /// Terminal records are returned unchanged.
    async fn update<F>(&self, job_id: JobId, apply: F) -> Result<JobRecord>
    where
        F: Fn(JobRecord) -> JobRecord,
    {
        let key = job_key(job_id);
        for _ in 0..MAX_CAS_RETRIES {
            let raw = self
                .store
                .get(&key)
                .await?
                .ok_or(JobStoreError::JobNotFound(job_id))?;
            let record: JobRecord = serde_json::from_value(raw.clone())?;

            if record.status.is_terminal() {
                return Ok(record);
            }

            let updated = apply(record);
            let new_value = serde_json::to_value(&updated)?;
            match self
                .store
                .compare_and_swap(&key, Some(&raw), Some(new_value), self.ttl)
                .await?
            {
                CasOutcome::Swapped => return Ok(updated),
                CasOutcome::Conflict { .. } => continue,
            }
        }
        Err(JobStoreError::CasRetriesExhausted { key })
    }
}
