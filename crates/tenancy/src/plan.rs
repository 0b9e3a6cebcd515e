//! Subscription plan catalog and per-plan resource limits.

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Resource limits granted to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum number of user accounts.
    pub max_users: u32,
    /// Maximum number of courses.
    pub max_courses: u32,
    /// Maximum storage in megabytes.
    pub max_storage_mb: u64,
}

/// The subscription plans a tenant can be provisioned under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free 7-day trial, minimal limits.
    Trial,
    /// Small institutions.
    Basic,
    /// Growing institutions.
    Premium,
    /// Effectively unlimited.
    Enterprise,
}

impl Plan {
    /// Returns the plan name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Trial => "trial",
            Plan::Basic => "basic",
            Plan::Premium => "premium",
            Plan::Enterprise => "enterprise",
        }
    }

    /// Resource limits for this plan.
    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Trial => PlanLimits {
                max_users: 1,
                max_courses: 1,
                max_storage_mb: 50,
            },
            Plan::Basic => PlanLimits {
                max_users: 50,
                max_courses: 10,
                max_storage_mb: 1024,
            },
            Plan::Premium => PlanLimits {
                max_users: 200,
                max_courses: 50,
                max_storage_mb: 10240,
            },
            Plan::Enterprise => PlanLimits {
                max_users: 999_999,
                max_courses: 999_999,
                max_storage_mb: 102_400,
            },
        }
    }

    /// Monthly price in cents. Billing registration is skipped at zero.
    pub fn monthly_price_cents(&self) -> i64 {
        match self {
            Plan::Trial => 0,
            Plan::Basic => 1_990,
            Plan::Premium => 4_990,
            Plan::Enterprise => 19_900,
        }
    }

    /// Trial duration in days, if the plan is time-limited.
    pub fn trial_days(&self) -> Option<i64> {
        match self {
            Plan::Trial => Some(7),
            _ => None,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Plan::Trial),
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(DirectoryError::UnknownPlan(other.to_string())),
        }
    }
}
