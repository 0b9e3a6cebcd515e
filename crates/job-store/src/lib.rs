//! TTL-keyed coordination store for provisioning jobs.
//!
//! This crate provides the shared mutable state of the provisioning
//! orchestrator: a key/value store interface with first-class atomic
//! compare-and-swap, and the three components built on top of it:
//!
//! 1. [`ProgressTracker`]: per-job status records polled by clients
//! 2. [`DeduplicationGuard`]: suppresses duplicate concurrent jobs per slug
//! 3. [`ResultPublisher`]: terminal outcomes with delayed self-cleanup
//!
//! All entries carry a TTL so abandoned jobs are bounded in memory even if
//! no client ever polls them.

pub mod dedup;
pub mod error;
pub mod job;
pub mod kv;
pub mod memory;
pub mod progress;
pub mod publisher;

pub use common::JobId;
pub use dedup::{Acquisition, DedupEntry, DeduplicationGuard};
pub use error::{JobStoreError, Result};
pub use job::{JobRecord, JobStatus};
pub use kv::{CasOutcome, KeyValueStore};
pub use memory::InMemoryKvStore;
pub use progress::ProgressTracker;
pub use publisher::ResultPublisher;
