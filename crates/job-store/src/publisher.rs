//! Terminal outcome storage with delayed self-cleanup.

use std::sync::Arc;
use std::time::Duration;

use common::JobId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Result, kv::KeyValueStore};

/// How long an unread result survives.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(900);

/// Grace window after the first read before the result is purged. Long
/// enough for a slow client to re-read, short enough to bound memory.
pub const DEFAULT_READ_GRACE: Duration = Duration::from_secs(10);

fn result_key(job_id: JobId) -> String {
    format!("provision:result:{job_id}")
}

/// Stores the final outcome of a provisioning job for retrieval by the
/// polling client.
///
/// Results are written once, after the job reaches a terminal state. A read
/// does not delete the entry immediately; instead the TTL is shortened to a
/// grace window so duplicate or slow reads still succeed before cleanup.
#[derive(Clone)]
pub struct ResultPublisher {
    store: Arc<dyn KeyValueStore>,
    result_ttl: Duration,
    read_grace: Duration,
}

impl ResultPublisher {
    /// Creates a publisher with default TTLs.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttls(store, DEFAULT_RESULT_TTL, DEFAULT_READ_GRACE)
    }

    /// Creates a publisher with custom result and read-grace TTLs.
    pub fn with_ttls(
        store: Arc<dyn KeyValueStore>,
        result_ttl: Duration,
        read_grace: Duration,
    ) -> Self {
        Self {
            store,
            result_ttl,
            read_grace,
        }
    }

    /// Publishes the terminal outcome for a job.
    pub async fn publish<T: Serialize>(&self, job_id: JobId, payload: &T) -> Result<()> {
        self.store
            .put(
                &result_key(job_id),
                serde_json::to_value(payload)?,
                self.result_ttl,
            )
            .await
    }

    /// Fetches the stored outcome, scheduling cleanup after a grace delay.
    ///
    /// The first successful read re-arms the entry with the grace TTL;
    /// repeat reads within the window keep succeeding.
    pub async fn fetch<T: DeserializeOwned>(&self, job_id: JobId) -> Result<Option<T>> {
        let key = result_key(job_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        self.store.put(&key, raw.clone(), self.read_grace).await?;
        Ok(Some(serde_json::from_value(raw)?))
    }

    /// Removes a stored result immediately.
    pub async fn discard(&self, job_id: JobId) -> Result<()> {
        self.store.remove(&result_key(job_id)).await
    }
}
