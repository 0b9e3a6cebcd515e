//! Billing service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::TenantId;
use tenancy::Plan;

use crate::error::ProvisioningError;

/// Result of a successful subscription registration.
#[derive(Debug, Clone)]
pub struct SubscriptionResult {
    /// The contract ID assigned by the billing service.
    pub contract_id: String,
}

/// Trait for billing operations.
///
/// Invoked only for plans with a non-zero monthly price; failures are
/// logged by the orchestrator and do not fail the job.
#[async_trait]
pub trait BillingService: Send + Sync {
    /// Registers a subscription for a freshly provisioned tenant.
    async fn register_subscription(
        &self,
        tenant_id: TenantId,
        plan: Plan,
        price_cents: i64,
    ) -> Result<SubscriptionResult, ProvisioningError>;

    /// Cancels a previously registered subscription.
    async fn cancel_subscription(&self, contract_id: &str) -> Result<(), ProvisioningError>;
}

#[derive(Debug, Clone)]
struct Contract {
    contract_id: String,
    #[allow(dead_code)]
    tenant_id: TenantId,
    #[allow(dead_code)]
    plan: Plan,
    #[allow(dead_code)]
    price_cents: i64,
}

#[derive(Debug, Default)]
struct InMemoryBillingState {
    contracts: Vec<Contract>,
    next_id: u32,
    fail_on_register: bool,
}

/// In-memory billing service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingService {
    state: Arc<RwLock<InMemoryBillingState>>,
}

impl InMemoryBillingService {
    /// Creates a new in-memory billing service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail registration calls.
    pub fn set_fail_on_register(&self, fail: bool) {
        self.state.write().unwrap().fail_on_register = fail;
    }

    /// Returns the number of registered contracts.
    pub fn contract_count(&self) -> usize {
        self.state.read().unwrap().contracts.len()
    }
}

#[async_trait]
impl BillingService for InMemoryBillingService {
    async fn register_subscription(
        &self,
        tenant_id: TenantId,
        plan: Plan,
        price_cents: i64,
    ) -> Result<SubscriptionResult, ProvisioningError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_register {
            return Err(ProvisioningError::Billing(
                "billing gateway rejected the subscription".to_string(),
            ));
        }

        state.next_id += 1;
        let contract_id = format!("CTR-{:04}", state.next_id);
        state.contracts.push(Contract {
            contract_id: contract_id.clone(),
            tenant_id,
            plan,
            price_cents,
        });

        Ok(SubscriptionResult { contract_id })
    }

    async fn cancel_subscription(&self, contract_id: &str) -> Result<(), ProvisioningError> {
        let mut state = self.state.write().unwrap();
        state.contracts.retain(|c| c.contract_id != contract_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_cancel() {
        let billing = InMemoryBillingService::new();
        let tenant_id = TenantId::new();

        let result = billing
            .register_subscription(tenant_id, Plan::Premium, 4_990)
            .await
            .unwrap();
        assert!(result.contract_id.starts_with("CTR-"));
        assert_eq!(billing.contract_count(), 1);

        billing.cancel_subscription(&result.contract_id).await.unwrap();
        assert_eq!(billing.contract_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_on_register() {
        let billing = InMemoryBillingService::new();
        billing.set_fail_on_register(true);

        let result = billing
            .register_subscription(TenantId::new(), Plan::Basic, 1_990)
            .await;
        assert!(result.is_err());
        assert_eq!(billing.contract_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_contract_ids() {
        let billing = InMemoryBillingService::new();

        let c1 = billing
            .register_subscription(TenantId::new(), Plan::Basic, 1_990)
            .await
            .unwrap();
        let c2 = billing
            .register_subscription(TenantId::new(), Plan::Premium, 4_990)
            .await
            .unwrap();

        assert_eq!(c1.contract_id, "CTR-0001");
        assert_eq!(c2.contract_id, "CTR-0002");
    }
}
