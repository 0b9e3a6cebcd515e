use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::TenantId;
use tokio::sync::RwLock;

use crate::{
    DirectoryError, Result,
    directory::{MAX_SLUG_ATTEMPTS, TenantDirectory},
    slug,
    tenant::{DomainBinding, Tenant},
};

#[derive(Default)]
struct DirectoryState {
    tenants: HashMap<TenantId, Tenant>,
    domains: Vec<DomainBinding>,
    reserved_slugs: HashSet<String>,
}

impl DirectoryState {
    fn slug_bound(&self, slug: &str) -> bool {
        self.tenants.values().any(|t| t.slug == slug)
    }
}

/// In-memory tenant directory implementation for testing.
///
/// Provides the same contract as the PostgreSQL implementation; slug
/// allocation runs under a single write lock, which makes the uniqueness
/// check and the reservation atomic.
#[derive(Clone, Default)]
pub struct InMemoryTenantDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryTenantDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tenant records.
    pub async fn tenant_count(&self) -> usize {
        self.state.read().await.tenants.len()
    }

    /// Returns the number of domain bindings.
    pub async fn domain_count(&self) -> usize {
        self.state.read().await.domains.len()
    }

    /// Returns true if a reservation is held for the slug.
    pub async fn is_reserved(&self, slug: &str) -> bool {
        self.state.read().await.reserved_slugs.contains(slug)
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn allocate_slug(&self, requested: &str) -> Result<String> {
        if !slug::is_valid(requested) {
            return Err(DirectoryError::InvalidSlug(requested.to_string()));
        }

        let base = slug::strip_numeric_suffix(requested);
        let mut state = self.state.write().await;

        for attempt in 0..=MAX_SLUG_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.to_string()
            } else {
                format!("{base}{attempt}")
            };
            if !state.slug_bound(&candidate) && !state.reserved_slugs.contains(&candidate) {
                state.reserved_slugs.insert(candidate.clone());
                return Ok(candidate);
            }
        }

        let fallback = slug::fallback_slug(base);
        metrics::counter!("slug_fallback_total").increment(1);
        tracing::warn!(base, slug = %fallback, "slug counter space exhausted; using fallback");
        state.reserved_slugs.insert(fallback.clone());
        Ok(fallback)
    }

    async fn release_slug(&self, slug: &str) -> Result<()> {
        self.state.write().await.reserved_slugs.remove(slug);
        Ok(())
    }

    async fn slug_available(&self, slug: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(!state.slug_bound(slug) && !state.reserved_slugs.contains(slug))
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<()> {
        let mut state = self.state.write().await;
        if state.slug_bound(&tenant.slug) {
            return Err(DirectoryError::SlugTaken(tenant.slug.clone()));
        }
        state.reserved_slugs.remove(&tenant.slug);
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
        Ok(self.state.read().await.tenants.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        let state = self.state.read().await;
        Ok(state.tenants.values().find(|t| t.slug == slug).cloned())
    }

    async fn delete_tenant(&self, id: TenantId) -> Result<()> {
        let mut state = self.state.write().await;
        state.tenants.remove(&id);
        state.domains.retain(|d| d.tenant_id != id);
        Ok(())
    }

    async fn bind_domain(&self, binding: &DomainBinding) -> Result<()> {
        self.state.write().await.domains.push(binding.clone());
        Ok(())
    }

    async fn domains_for(&self, tenant_id: TenantId) -> Result<Vec<DomainBinding>> {
        let state = self.state.read().await;
        Ok(state
            .domains
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn unbind_domains(&self, tenant_id: TenantId) -> Result<()> {
        let mut state = self.state.write().await;
        state.domains.retain(|d| d.tenant_id != tenant_id);
        Ok(())
    }
}
