//! Isolated-storage provisioning trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::TenantId;
use tenancy::{AdministratorAccount, NewAdminAccount, verify_password};
use tokio::sync::Notify;

use crate::error::ProvisioningError;

/// Schema objects every freshly provisioned environment must contain.
pub const BASELINE_SCHEMA: &[&str] = &["users", "courses", "activities", "badges", "progress"];

/// Creates and destroys the per-tenant isolated storage environment.
///
/// `create_environment` is treated as opaque and possibly slow: it stands
/// for database creation plus schema migration and is awaited in full under
/// a generous step timeout.
#[async_trait]
pub trait StorageProvisioner: Send + Sync {
    /// Creates the tenant's dedicated environment and applies migrations.
    async fn create_environment(
        &self,
        tenant_id: TenantId,
        slug: &str,
    ) -> Result<(), ProvisioningError>;

    /// Creates the first administrator account inside the environment.
    async fn create_admin_account(
        &self,
        tenant_id: TenantId,
        account: &NewAdminAccount,
    ) -> Result<(), ProvisioningError>;

    /// Removes an administrator account. Removing an absent account or an
    /// account in an absent environment is a no-op.
    async fn remove_admin_account(
        &self,
        tenant_id: TenantId,
        email: &str,
    ) -> Result<(), ProvisioningError>;

    /// Verifies that the given credentials can authenticate.
    async fn authenticate(
        &self,
        tenant_id: TenantId,
        email: &str,
        password: &str,
    ) -> Result<bool, ProvisioningError>;

    /// Populates non-critical default content.
    async fn seed_baseline_data(&self, tenant_id: TenantId) -> Result<(), ProvisioningError>;

    /// Returns true if the environment exists and is reachable.
    async fn environment_exists(&self, tenant_id: TenantId) -> Result<bool, ProvisioningError>;

    /// Returns true if every expected baseline schema object is present.
    async fn has_baseline_schema(&self, tenant_id: TenantId) -> Result<bool, ProvisioningError>;

    /// Returns true if an administrator account exists in the environment.
    async fn admin_exists(&self, tenant_id: TenantId) -> Result<bool, ProvisioningError>;

    /// Destroys the environment. Destroying an absent environment is a
    /// no-op so compensation can run unconditionally.
    async fn destroy_environment(&self, tenant_id: TenantId) -> Result<(), ProvisioningError>;

    /// Removes any environments left under `slug` by previous aborted
    /// attempts. Safe when nothing exists.
    async fn purge_environments(&self, slug: &str) -> Result<usize, ProvisioningError>;
}

#[derive(Debug, Default)]
struct Environment {
    slug: String,
    tables: Vec<String>,
    admins: HashMap<String, AdministratorAccount>,
    seeded: bool,
}

#[derive(Debug, Default)]
struct InMemoryStorageState {
    environments: HashMap<TenantId, Environment>,
    fail_on_create: bool,
    fail_on_admin: bool,
    fail_on_seed: bool,
    /// When set, the nth authenticate call (1-based) reports invalid
    /// credentials. Lets tests fail the health validator's login check
    /// while the creation-time check passes.
    fail_auth_on_call: Option<u32>,
    auth_calls: u32,
    /// When set, `create_environment` waits for a notification before
    /// proceeding, giving tests a deterministic in-flight window.
    create_gate: Option<Arc<Notify>>,
}

/// In-memory storage provisioner for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorageProvisioner {
    state: Arc<RwLock<InMemoryStorageState>>,
}

impl InMemoryStorageProvisioner {
    /// Creates a new in-memory storage provisioner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provisioner to fail environment creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the provisioner to fail administrator creation.
    pub fn set_fail_on_admin(&self, fail: bool) {
        self.state.write().unwrap().fail_on_admin = fail;
    }

    /// Configures the provisioner to fail baseline seeding.
    pub fn set_fail_on_seed(&self, fail: bool) {
        self.state.write().unwrap().fail_on_seed = fail;
    }

    /// Makes the nth authenticate call (1-based) report invalid credentials.
    pub fn set_fail_auth_on_call(&self, call: Option<u32>) {
        let mut state = self.state.write().unwrap();
        state.fail_auth_on_call = call;
        state.auth_calls = 0;
    }

    /// Pauses `create_environment` until the returned handle is notified.
    pub fn hold_on_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.write().unwrap().create_gate = Some(gate.clone());
        gate
    }

    /// Returns the number of existing environments.
    pub fn environment_count(&self) -> usize {
        self.state.read().unwrap().environments.len()
    }

    /// Returns true if the environment was seeded.
    pub fn is_seeded(&self, tenant_id: TenantId) -> bool {
        self.state
            .read()
            .unwrap()
            .environments
            .get(&tenant_id)
            .is_some_and(|env| env.seeded)
    }
}

#[async_trait]
impl StorageProvisioner for InMemoryStorageProvisioner {
    async fn create_environment(
        &self,
        tenant_id: TenantId,
        slug: &str,
    ) -> Result<(), ProvisioningError> {
        let gate = self.state.read().unwrap().create_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(ProvisioningError::Storage(
                "storage backend unavailable".to_string(),
            ));
        }

        state.environments.insert(
            tenant_id,
            Environment {
                slug: slug.to_string(),
                tables: BASELINE_SCHEMA.iter().map(|t| t.to_string()).collect(),
                admins: HashMap::new(),
                seeded: false,
            },
        );
        Ok(())
    }

    async fn create_admin_account(
        &self,
        tenant_id: TenantId,
        account: &NewAdminAccount,
    ) -> Result<(), ProvisioningError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_admin {
            return Err(ProvisioningError::Storage(
                "administrator creation failed".to_string(),
            ));
        }

        let env = state.environments.get_mut(&tenant_id).ok_or_else(|| {
            ProvisioningError::Storage(format!("no environment for tenant {tenant_id}"))
        })?;
        env.admins.insert(
            account.email.clone(),
            AdministratorAccount::create(tenant_id, account),
        );
        Ok(())
    }

    async fn remove_admin_account(
        &self,
        tenant_id: TenantId,
        email: &str,
    ) -> Result<(), ProvisioningError> {
        let mut state = self.state.write().unwrap();
        if let Some(env) = state.environments.get_mut(&tenant_id) {
            env.admins.remove(email);
        }
        Ok(())
    }

    async fn authenticate(
        &self,
        tenant_id: TenantId,
        email: &str,
        password: &str,
    ) -> Result<bool, ProvisioningError> {
        let mut state = self.state.write().unwrap();

        state.auth_calls += 1;
        if state.fail_auth_on_call == Some(state.auth_calls) {
            return Ok(false);
        }

        let Some(env) = state.environments.get(&tenant_id) else {
            return Ok(false);
        };
        Ok(env
            .admins
            .get(email)
            .is_some_and(|a| verify_password(password, &a.password_hash)))
    }

    async fn seed_baseline_data(&self, tenant_id: TenantId) -> Result<(), ProvisioningError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_seed {
            return Err(ProvisioningError::Storage(
                "seeder execution failed".to_string(),
            ));
        }

        let env = state.environments.get_mut(&tenant_id).ok_or_else(|| {
            ProvisioningError::Storage(format!("no environment for tenant {tenant_id}"))
        })?;
        env.seeded = true;
        Ok(())
    }

    async fn environment_exists(&self, tenant_id: TenantId) -> Result<bool, ProvisioningError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .environments
            .contains_key(&tenant_id))
    }

    async fn has_baseline_schema(&self, tenant_id: TenantId) -> Result<bool, ProvisioningError> {
        let state = self.state.read().unwrap();
        Ok(state.environments.get(&tenant_id).is_some_and(|env| {
            BASELINE_SCHEMA
                .iter()
                .all(|t| env.tables.iter().any(|have| have == t))
        }))
    }

    async fn admin_exists(&self, tenant_id: TenantId) -> Result<bool, ProvisioningError> {
        let state = self.state.read().unwrap();
        Ok(state
            .environments
            .get(&tenant_id)
            .is_some_and(|env| !env.admins.is_empty()))
    }

    async fn destroy_environment(&self, tenant_id: TenantId) -> Result<(), ProvisioningError> {
        self.state.write().unwrap().environments.remove(&tenant_id);
        Ok(())
    }

    async fn purge_environments(&self, slug: &str) -> Result<usize, ProvisioningError> {
        let mut state = self.state.write().unwrap();
        let before = state.environments.len();
        state.environments.retain(|_, env| env.slug != slug);
        Ok(before - state.environments.len())
    }
}
