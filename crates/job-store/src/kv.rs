use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Outcome of a compare-and-swap operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The swap was applied.
    Swapped,
    /// The current value did not match the expectation.
    /// Carries the value that was actually present (None = key absent).
    Conflict { actual: Option<Value> },
}

impl CasOutcome {
    /// Returns true if the swap was applied.
    pub fn swapped(&self) -> bool {
        matches!(self, CasOutcome::Swapped)
    }
}

/// Key/value store with TTL-bounded entries and atomic compare-and-swap.
///
/// The deduplication guard depends on `compare_and_swap` being a single
/// indivisible operation: two concurrent callers observing the same prior
/// state must not both succeed. Expired entries count as absent for every
/// operation.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Unconditionally stores `value` under `key` with the given TTL,
    /// replacing any existing entry.
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Atomically replaces the entry under `key` only if the current value
    /// equals `expected` (`None` meaning the key must be absent).
    ///
    /// A `new` of `None` removes the key; otherwise the new value is stored
    /// with the given TTL.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Option<Value>,
        ttl: Duration,
    ) -> Result<CasOutcome>;

    /// Removes the entry under `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
