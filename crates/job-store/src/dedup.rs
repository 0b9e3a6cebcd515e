//! Deduplication of concurrent provisioning attempts per slug.

use std::sync::Arc;
use std::time::Duration;

use common::JobId;
use serde::{Deserialize, Serialize};

use crate::{
    JobStoreError, Result,
    job::JobStatus,
    kv::{CasOutcome, KeyValueStore},
};

/// TTL for an active deduplication entry. Matches the job record TTL so a
/// crashed job cannot block its slug forever.
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(300);

/// How long a completed job's entry lingers before the slug is reusable.
pub const DEFAULT_TERMINAL_GRACE: Duration = Duration::from_secs(30);

const MAX_CAS_RETRIES: usize = 16;

fn slug_key(slug: &str) -> String {
    format!("provision:slug:{slug}")
}

/// The entry held per slug while a job is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupEntry {
    /// The job currently bound to the slug.
    pub job_id: JobId,
    /// Last known status of that job.
    pub status: JobStatus,
}

/// Result of an acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// No job was in flight; a fresh job id was minted and registered.
    New(JobId),
    /// A non-terminal job already owns the slug; poll it instead.
    InFlight(JobId),
}

impl Acquisition {
    /// The job id the caller should poll, fresh or existing.
    pub fn job_id(&self) -> JobId {
        match self {
            Acquisition::New(id) | Acquisition::InFlight(id) => *id,
        }
    }

    /// Returns true if this acquisition minted a new job.
    pub fn is_new(&self) -> bool {
        matches!(self, Acquisition::New(_))
    }
}

/// Guards each slug against concurrent provisioning attempts.
///
/// Acquisition is a compare-and-swap from the observed prior state (absent
/// or terminal) to a fresh entry, so two concurrent requests for the same
/// slug can never both mint jobs: the loser of the race re-reads and finds
/// the winner's entry.
#[derive(Clone)]
pub struct DeduplicationGuard {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    terminal_grace: Duration,
}

impl DeduplicationGuard {
    /// Creates a guard with default TTLs.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttls(store, DEFAULT_DEDUP_TTL, DEFAULT_TERMINAL_GRACE)
    }

    /// Creates a guard with custom entry and terminal-grace TTLs.
    pub fn with_ttls(
        store: Arc<dyn KeyValueStore>,
        ttl: Duration,
        terminal_grace: Duration,
    ) -> Self {
        Self {
            store,
            ttl,
            terminal_grace,
        }
    }

    /// Acquires the slug for a new job, or returns the in-flight job id.
    ///
    /// An existing entry whose job is terminal is cleared and replaced as if
    /// it were absent.
    pub async fn try_acquire(&self, slug: &str) -> Result<Acquisition> {
        let key = slug_key(slug);
        for _ in 0..MAX_CAS_RETRIES {
            let current = self.store.get(&key).await?;

            if let Some(raw) = &current {
                let entry: DedupEntry = serde_json::from_value(raw.clone())?;
                if !entry.status.is_terminal() {
                    metrics::counter!("provisioning_deduplicated_total").increment(1);
                    tracing::debug!(slug, job_id = %entry.job_id, "duplicate request joined in-flight job");
                    return Ok(Acquisition::InFlight(entry.job_id));
                }
            }

            let job_id = JobId::new();
            let entry = DedupEntry {
                job_id,
                status: JobStatus::Started,
            };
            let outcome = self
                .store
                .compare_and_swap(
                    &key,
                    current.as_ref(),
                    Some(serde_json::to_value(&entry)?),
                    self.ttl,
                )
                .await?;
            match outcome {
                CasOutcome::Swapped => return Ok(Acquisition::New(job_id)),
                // Lost the race; re-read and either piggyback on the winner
                // or retry the swap.
                CasOutcome::Conflict { .. } => continue,
            }
        }
        Err(JobStoreError::CasRetriesExhausted { key })
    }

    /// Refreshes the entry's last known status while the job is running.
    pub async fn update_status(&self, slug: &str, job_id: JobId, status: JobStatus) -> Result<()> {
        let entry = DedupEntry { job_id, status };
        self.store
            .put(&slug_key(slug), serde_json::to_value(&entry)?, self.ttl)
            .await
    }

    /// Records a terminal status. The entry is kept for a short grace window
    /// so late duplicate requests still resolve to the finished job, then
    /// expires and frees the slug.
    pub async fn mark_terminal(&self, slug: &str, job_id: JobId, status: JobStatus) -> Result<()> {
        let entry = DedupEntry { job_id, status };
        self.store
            .put(
                &slug_key(slug),
                serde_json::to_value(&entry)?,
                self.terminal_grace,
            )
            .await
    }

    /// Removes the entry immediately, freeing the slug for retry.
    pub async fn clear(&self, slug: &str) -> Result<()> {
        self.store.remove(&slug_key(slug)).await
    }

    /// Returns the current entry for a slug, if any.
    pub async fn get(&self, slug: &str) -> Result<Option<DedupEntry>> {
        match self.store.get(&slug_key(slug)).await? {
            Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
            None => Ok(None),
        }
    }
}
