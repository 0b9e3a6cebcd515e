//! The provisioning request accepted at the orchestrator boundary.

use serde::{Deserialize, Serialize};
use tenancy::{Plan, slug};

use crate::error::{ProvisioningError, Result};

/// A request to provision a new tenant environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Human-readable tenant name.
    pub tenant_name: String,
    /// Requested slug; may be adjusted by the allocator on collision.
    pub tenant_slug: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: String,
    /// Subscription plan.
    pub plan: Plan,
    /// Display name of the initial administrator.
    pub admin_name: String,
    /// Login email of the initial administrator.
    pub admin_email: String,
}

impl ProvisionRequest {
    /// Validates required fields and slug syntax.
    ///
    /// Runs synchronously before a job is minted and again as the first
    /// step of the state machine.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_name.trim().is_empty() {
            return Err(ProvisioningError::Validation(
                "tenant_name is required".to_string(),
            ));
        }
        if self.admin_name.trim().is_empty() {
            return Err(ProvisioningError::Validation(
                "admin_name is required".to_string(),
            ));
        }
        if self.admin_email.trim().is_empty() || !self.admin_email.contains('@') {
            return Err(ProvisioningError::Validation(
                "admin_email must be a valid email address".to_string(),
            ));
        }
        if !slug::is_valid(&self.tenant_slug) {
            return Err(ProvisioningError::Validation(format!(
                "tenant_slug '{}' must contain only lowercase letters, digits and hyphens",
                self.tenant_slug
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            tenant_name: "Acme Corp".to_string(),
            tenant_slug: "acme".to_string(),
            description: String::new(),
            plan: Plan::Premium,
            admin_name: "Admin".to_string(),
            admin_email: "admin@acme.example".to_string(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let mut req = request();
        req.tenant_name = "  ".to_string();
        assert!(matches!(
            req.validate(),
            Err(ProvisioningError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_email_is_rejected() {
        let mut req = request();
        req.admin_email = "not-an-email".to_string();
        assert!(matches!(
            req.validate(),
            Err(ProvisioningError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_slug_is_rejected() {
        let mut req = request();
        req.tenant_slug = "Acme Corp".to_string();
        assert!(matches!(
            req.validate(),
            Err(ProvisioningError::Validation(_))
        ));
    }

    #[test]
    fn test_deserializes_without_description() {
        let req: ProvisionRequest = serde_json::from_value(serde_json::json!({
            "tenant_name": "Acme",
            "tenant_slug": "acme",
            "plan": "trial",
            "admin_name": "Admin",
            "admin_email": "admin@acme.example"
        }))
        .unwrap();
        assert_eq!(req.description, "");
        assert_eq!(req.plan, Plan::Trial);
    }
}
