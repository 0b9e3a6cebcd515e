//! Tracking of resources created by a provisioning job.
//!
//! The state machine records each resource as the owning step commits, so
//! the rollback set is computed from explicit state instead of inferred
//! from which variables happen to be set.

use common::TenantId;
use serde::{Deserialize, Serialize};

/// A resource created by a provisioning step, in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CreatedResource {
    /// A slug reservation held in the tenant directory.
    SlugReservation { slug: String },
    /// The tenant record itself.
    TenantRecord { tenant_id: TenantId },
    /// A domain binding for the tenant.
    DomainBinding { tenant_id: TenantId, domain: String },
    /// The tenant's isolated storage environment.
    IsolatedStorage { tenant_id: TenantId },
    /// The administrator account inside the environment.
    AdminAccount { tenant_id: TenantId, email: String },
}

impl CreatedResource {
    /// Short human-readable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CreatedResource::SlugReservation { .. } => "slug_reservation",
            CreatedResource::TenantRecord { .. } => "tenant_record",
            CreatedResource::DomainBinding { .. } => "domain_binding",
            CreatedResource::IsolatedStorage { .. } => "isolated_storage",
            CreatedResource::AdminAccount { .. } => "admin_account",
        }
    }
}

/// The ordered log of resources a job has created so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedResources {
    resources: Vec<CreatedResource>,
}

impl CreatedResources {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resource as created.
    pub fn push(&mut self, resource: CreatedResource) {
        self.resources.push(resource);
    }

    /// Returns the resources in creation order.
    pub fn in_creation_order(&self) -> &[CreatedResource] {
        &self.resources
    }

    /// Returns the resources in reverse creation order, the order
    /// compensation must run in.
    pub fn in_rollback_order(&self) -> impl Iterator<Item = &CreatedResource> {
        self.resources.iter().rev()
    }

    /// Returns true if nothing was created.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Number of recorded resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_order_is_reverse_of_creation() {
        let tenant_id = TenantId::new();
        let mut resources = CreatedResources::new();
        resources.push(CreatedResource::SlugReservation {
            slug: "acme".to_string(),
        });
        resources.push(CreatedResource::TenantRecord { tenant_id });
        resources.push(CreatedResource::DomainBinding {
            tenant_id,
            domain: "acme.platform.example".to_string(),
        });

        let kinds: Vec<_> = resources.in_rollback_order().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec!["domain_binding", "tenant_record", "slug_reservation"]
        );
    }

    #[test]
    fn test_empty_log() {
        let resources = CreatedResources::new();
        assert!(resources.is_empty());
        assert_eq!(resources.len(), 0);
        assert_eq!(resources.in_rollback_order().count(), 0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut resources = CreatedResources::new();
        resources.push(CreatedResource::IsolatedStorage {
            tenant_id: TenantId::new(),
        });

        let json = serde_json::to_string(&resources).unwrap();
        let deserialized: CreatedResources = serde_json::from_str(&json).unwrap();
        assert_eq!(resources, deserialized);
    }
}
