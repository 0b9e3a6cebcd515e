//! The durable store the orchestrator provisions tenants against.

use async_trait::async_trait;
use common::TenantId;

use crate::{
    Result,
    tenant::{DomainBinding, Tenant},
};

/// Bounded number of counter-suffixed candidates tried before the slug
/// allocator falls back to a timestamped suffix.
pub const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Durable storage for tenants, domain bindings and slug reservations.
///
/// All implementations must be thread-safe (Send + Sync). Slug allocation
/// is the concurrency-sensitive operation: the uniqueness check and the
/// reservation must be atomic, so concurrent allocations of the same base
/// name always yield distinct slugs.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Allocates a unique slug for the requested name.
    ///
    /// Trailing digits are stripped from the request to form a base;
    /// the base itself is preferred, then `base1`, `base2`, … up to
    /// [`MAX_SLUG_ATTEMPTS`], after which a timestamped fallback is used.
    /// The returned slug is reserved until consumed by `insert_tenant`
    /// or released by `release_slug`.
    async fn allocate_slug(&self, requested: &str) -> Result<String>;

    /// Releases a slug reservation. Releasing an unreserved slug is a no-op.
    async fn release_slug(&self, slug: &str) -> Result<()>;

    /// Returns true if the slug is neither bound to a tenant nor reserved.
    async fn slug_available(&self, slug: &str) -> Result<bool>;

    /// Persists a tenant record, consuming its slug reservation.
    ///
    /// Fails with `SlugTaken` if another tenant already holds the slug.
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<()>;

    /// Returns a tenant by id.
    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>>;

    /// Returns a tenant by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;

    /// Deletes a tenant record and its domain bindings. Deleting an absent
    /// tenant is a no-op so compensation can run unconditionally.
    async fn delete_tenant(&self, id: TenantId) -> Result<()>;

    /// Creates a domain binding.
    async fn bind_domain(&self, binding: &DomainBinding) -> Result<()>;

    /// Returns all domain bindings for a tenant.
    async fn domains_for(&self, tenant_id: TenantId) -> Result<Vec<DomainBinding>>;

    /// Removes all domain bindings for a tenant.
    async fn unbind_domains(&self, tenant_id: TenantId) -> Result<()>;
}
