//! Audit service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::TenantId;

use crate::error::ProvisioningError;

/// A recorded activity event.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// The tenant the event concerns.
    pub tenant_id: TenantId,
    /// Event type, e.g. `tenant_provisioned`.
    pub event_type: String,
    /// Structured event payload.
    pub payload: serde_json::Value,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Trait for recording activity events. Best-effort: the orchestrator logs
/// failures and continues.
#[async_trait]
pub trait AuditService: Send + Sync {
    /// Records an event for a tenant.
    async fn record_event(
        &self,
        tenant_id: TenantId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), ProvisioningError>;
}

#[derive(Debug, Default)]
struct InMemoryAuditState {
    events: Vec<AuditEvent>,
    fail_on_record: bool,
}

/// In-memory audit service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditService {
    state: Arc<RwLock<InMemoryAuditState>>,
}

impl InMemoryAuditService {
    /// Creates a new in-memory audit service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail record calls.
    pub fn set_fail_on_record(&self, fail: bool) {
        self.state.write().unwrap().fail_on_record = fail;
    }

    /// Returns the number of recorded events.
    pub fn event_count(&self) -> usize {
        self.state.read().unwrap().events.len()
    }

    /// Returns the recorded events for a tenant.
    pub fn events_for(&self, tenant_id: TenantId) -> Vec<AuditEvent> {
        self.state
            .read()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditService for InMemoryAuditService {
    async fn record_event(
        &self,
        tenant_id: TenantId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), ProvisioningError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_record {
            return Err(ProvisioningError::Audit(
                "audit sink unavailable".to_string(),
            ));
        }

        state.events.push(AuditEvent {
            tenant_id,
            event_type: event_type.to_string(),
            payload,
            occurred_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_event() {
        let audit = InMemoryAuditService::new();
        let tenant_id = TenantId::new();

        audit
            .record_event(
                tenant_id,
                "tenant_provisioned",
                serde_json::json!({"plan": "premium"}),
            )
            .await
            .unwrap();

        assert_eq!(audit.event_count(), 1);
        let events = audit.events_for(tenant_id);
        assert_eq!(events[0].event_type, "tenant_provisioned");
    }

    #[tokio::test]
    async fn test_fail_on_record() {
        let audit = InMemoryAuditService::new();
        audit.set_fail_on_record(true);

        let result = audit
            .record_event(TenantId::new(), "tenant_provisioned", serde_json::json!({}))
            .await;
        assert!(result.is_err());
        assert_eq!(audit.event_count(), 0);
    }
}
