//! The terminal result payload of a provisioning job.

use chrono::{DateTime, Utc};
use common::TenantId;
use serde::{Deserialize, Serialize};
use tenancy::{Plan, Tenant};

/// Condensed tenant details returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

impl From<&Tenant> for TenantSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            slug: tenant.slug.clone(),
            plan: tenant.plan,
            created_at: tenant.created_at,
        }
    }
}

/// The generated administrator credentials, returned exactly once through
/// the provisioning result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// Immutable snapshot written once a job terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvisioningResult {
    /// The tenant exists, is healthy and is ready to use.
    Completed {
        tenant: TenantSummary,
        domain: String,
        login_url: String,
        credentials: AdminCredentials,
        plan_price_cents: i64,
        is_trial: bool,
        next_steps: Vec<String>,
    },
    /// The job failed; no partial tenant remains reachable.
    Failed { reason: String },
}

impl ProvisioningResult {
    /// Builds the success payload for a finished job.
    pub fn completed(
        tenant: &Tenant,
        domain: &str,
        login_url: &str,
        credentials: AdminCredentials,
    ) -> Self {
        ProvisioningResult::Completed {
            tenant: TenantSummary::from(tenant),
            domain: domain.to_string(),
            login_url: login_url.to_string(),
            credentials,
            plan_price_cents: tenant.plan.monthly_price_cents(),
            is_trial: tenant.plan == Plan::Trial,
            next_steps: vec![
                "Sign in with the generated administrator credentials".to_string(),
                "Change the administrator password on first access".to_string(),
                "Configure your institution profile".to_string(),
                "Create your first courses".to_string(),
                "Invite instructors and students".to_string(),
            ],
        }
    }

    /// Builds the failure payload.
    pub fn failed(reason: impl Into<String>) -> Self {
        ProvisioningResult::Failed {
            reason: reason.into(),
        }
    }

    /// Returns true for the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, ProvisioningResult::Completed { .. })
    }
}
