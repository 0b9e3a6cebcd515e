//! Orchestrator tuning knobs.

use std::time::Duration;

/// Configuration for the provisioning coordinator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base domain tenant domains are minted under, e.g. `platform.example`
    /// yields `acme.platform.example`.
    pub base_domain: String,
    /// Bounded wait for ordinary steps.
    pub step_timeout: Duration,
    /// Bounded wait for the storage-provisioning step, which covers
    /// database creation and schema migration and may be slow.
    pub storage_timeout: Duration,
    /// TTL of job status records.
    pub job_ttl: Duration,
    /// TTL of active deduplication entries.
    pub dedup_ttl: Duration,
    /// How long a completed job's deduplication entry lingers.
    pub terminal_grace: Duration,
    /// TTL of unread result payloads.
    pub result_ttl: Duration,
    /// Grace window after the first result read before cleanup.
    pub read_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_domain: "platform.local".to_string(),
            step_timeout: Duration::from_secs(30),
            storage_timeout: Duration::from_secs(120),
            job_ttl: Duration::from_secs(300),
            dedup_ttl: Duration::from_secs(300),
            terminal_grace: Duration::from_secs(30),
            result_ttl: Duration::from_secs(900),
            read_grace: Duration::from_secs(10),
        }
    }
}

impl OrchestratorConfig {
    /// The domain minted for a slug.
    pub fn domain_for(&self, slug: &str) -> String {
        format!("{}.{}", slug, self.base_domain)
    }

    /// The login URL for a tenant domain.
    pub fn login_url(&self, domain: &str) -> String {
        format!("https://{domain}/login")
    }
}
