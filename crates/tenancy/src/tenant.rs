//! Tenant and domain binding records.

use chrono::{DateTime, Utc};
use common::TenantId;
use serde::{Deserialize, Serialize};

use crate::plan::{Plan, PlanLimits};

/// A provisioned tenant environment.
///
/// The slug is immutable once assigned; it names the tenant in its domain
/// and in retry/deduplication keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant id.
    pub id: TenantId,
    /// Human-readable name.
    pub name: String,
    /// Unique, immutable slug.
    pub slug: String,
    /// Free-form description.
    pub description: String,
    /// Subscription plan.
    pub plan: Plan,
    /// Resource limits, derived from the plan at creation time.
    pub limits: PlanLimits,
    /// Whether the tenant is active.
    pub is_active: bool,
    /// When a trial tenant expires, if time-limited.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// When the tenant record was created.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a new active tenant under the given plan.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        description: impl Into<String>,
        plan: Plan,
    ) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
            slug: slug.into(),
            description: description.into(),
            plan,
            limits: plan.limits(),
            is_active: true,
            trial_ends_at: plan
                .trial_days()
                .map(|days| Utc::now() + chrono::Duration::days(days)),
            created_at: Utc::now(),
        }
    }
}

/// Maps a tenant to its externally routable domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBinding {
    /// The tenant this domain routes to.
    pub tenant_id: TenantId,
    /// Fully qualified domain, e.g. `acme.platform.example`.
    pub domain: String,
    /// When the binding was created.
    pub created_at: DateTime<Utc>,
}

impl DomainBinding {
    /// Creates a binding for a tenant.
    pub fn new(tenant_id: TenantId, domain: impl Into<String>) -> Self {
        Self {
            tenant_id,
            domain: domain.into(),
            created_at: Utc::now(),
        }
    }
}
