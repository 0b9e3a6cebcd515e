//! Health validation of freshly provisioned tenants.
//!
//! Critical checks answer "can anyone actually use this tenant"; their
//! failure fails the job and triggers rollback. Advisory checks answer
//! "is this tenant fully decorated" and are recorded without blocking.

use tenancy::{Tenant, TenantDirectory};

use crate::services::StorageProvisioner;

/// Check name: tenant record exists and is active.
pub const CHECK_TENANT_EXISTS: &str = "tenant_exists";
/// Check name: a domain binding exists.
pub const CHECK_DOMAIN_BOUND: &str = "domain_bound";
/// Check name: the isolated storage environment is reachable.
pub const CHECK_STORAGE_REACHABLE: &str = "storage_reachable";
/// Check name: an administrator account exists.
pub const CHECK_ADMIN_EXISTS: &str = "admin_exists";
/// Check name: the administrator credentials authenticate.
pub const CHECK_ADMIN_LOGIN: &str = "admin_login";
/// Check name: expected baseline schema objects are present (advisory).
pub const CHECK_BASELINE_SCHEMA: &str = "baseline_schema";
/// Check name: tenant configuration fields are populated (advisory).
pub const CHECK_TENANT_CONFIG: &str = "tenant_config";

/// The outcome of a single health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Check name.
    pub name: &'static str,
    /// Whether failure of this check must fail the job.
    pub critical: bool,
    /// Whether the check passed.
    pub passed: bool,
}

/// The result of a full validation pass.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    /// Individual check outcomes, in execution order.
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// True only if every critical check passed.
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().filter(|c| c.critical).all(|c| c.passed)
    }

    /// Percentage of critical checks that passed.
    pub fn critical_score(&self) -> u8 {
        let critical: Vec<_> = self.checks.iter().filter(|c| c.critical).collect();
        if critical.is_empty() {
            return 100;
        }
        let passed = critical.iter().filter(|c| c.passed).count();
        ((passed * 100) / critical.len()) as u8
    }

    /// Names of failed critical checks.
    pub fn failed_critical(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| c.critical && !c.passed)
            .map(|c| c.name)
            .collect()
    }

    /// Names of failed advisory checks.
    pub fn failed_advisory(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| !c.critical && !c.passed)
            .map(|c| c.name)
            .collect()
    }
}

/// Runs the fixed battery of checks against a provisioned environment.
pub struct HealthValidator;

impl HealthValidator {
    /// Validates a tenant. Errors from collaborators count as check
    /// failures rather than aborting the pass, so the report always covers
    /// the full battery.
    pub async fn validate<D, S>(
        directory: &D,
        storage: &S,
        tenant: &Tenant,
        admin_email: &str,
        admin_password: &str,
    ) -> HealthReport
    where
        D: TenantDirectory + ?Sized,
        S: StorageProvisioner + ?Sized,
    {
        let mut report = HealthReport::default();

        let tenant_exists = directory
            .get_tenant(tenant.id)
            .await
            .ok()
            .flatten()
            .is_some_and(|t| t.is_active);
        report.checks.push(HealthCheck {
            name: CHECK_TENANT_EXISTS,
            critical: true,
            passed: tenant_exists,
        });

        let domain_bound = directory
            .domains_for(tenant.id)
            .await
            .map(|d| !d.is_empty())
            .unwrap_or(false);
        report.checks.push(HealthCheck {
            name: CHECK_DOMAIN_BOUND,
            critical: true,
            passed: domain_bound,
        });

        let storage_reachable = storage
            .environment_exists(tenant.id)
            .await
            .unwrap_or(false);
        report.checks.push(HealthCheck {
            name: CHECK_STORAGE_REACHABLE,
            critical: true,
            passed: storage_reachable,
        });

        let admin_exists = storage.admin_exists(tenant.id).await.unwrap_or(false);
        report.checks.push(HealthCheck {
            name: CHECK_ADMIN_EXISTS,
            critical: true,
            passed: admin_exists,
        });

        let admin_login = storage
            .authenticate(tenant.id, admin_email, admin_password)
            .await
            .unwrap_or(false);
        report.checks.push(HealthCheck {
            name: CHECK_ADMIN_LOGIN,
            critical: true,
            passed: admin_login,
        });

        let baseline_schema = storage.has_baseline_schema(tenant.id).await.unwrap_or(false);
        report.checks.push(HealthCheck {
            name: CHECK_BASELINE_SCHEMA,
            critical: false,
            passed: baseline_schema,
        });

        let tenant_config = !tenant.name.is_empty()
            && !tenant.slug.is_empty()
            && tenant.limits.max_users > 0;
        report.checks.push(HealthCheck {
            name: CHECK_TENANT_CONFIG,
            critical: false,
            passed: tenant_config,
        });

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStorageProvisioner;
    use tenancy::{DomainBinding, InMemoryTenantDirectory, NewAdminAccount, Plan};

    async fn provisioned_tenant() -> (InMemoryTenantDirectory, InMemoryStorageProvisioner, Tenant)
    {
        let directory = InMemoryTenantDirectory::new();
        let storage = InMemoryStorageProvisioner::new();
        let tenant = Tenant::new("Acme", "acme", "", Plan::Premium);

        directory.insert_tenant(&tenant).await.unwrap();
        directory
            .bind_domain(&DomainBinding::new(tenant.id, "acme.platform.example"))
            .await
            .unwrap();
        storage.create_environment(tenant.id, "acme").await.unwrap();
        storage
            .create_admin_account(
                tenant.id,
                &NewAdminAccount {
                    name: "Admin".to_string(),
                    email: "admin@acme.example".to_string(),
                    password: "s3cret".to_string(),
                },
            )
            .await
            .unwrap();

        (directory, storage, tenant)
    }

    #[tokio::test]
    async fn test_fully_provisioned_tenant_is_healthy() {
        let (directory, storage, tenant) = provisioned_tenant().await;

        let report = HealthValidator::validate(
            &directory,
            &storage,
            &tenant,
            "admin@acme.example",
            "s3cret",
        )
        .await;

        assert!(report.is_healthy());
        assert_eq!(report.critical_score(), 100);
        assert!(report.failed_critical().is_empty());
        assert!(report.failed_advisory().is_empty());
    }

    #[tokio::test]
    async fn test_missing_domain_fails_critically() {
        let (directory, storage, tenant) = provisioned_tenant().await;
        directory.unbind_domains(tenant.id).await.unwrap();

        let report = HealthValidator::validate(
            &directory,
            &storage,
            &tenant,
            "admin@acme.example",
            "s3cret",
        )
        .await;

        assert!(!report.is_healthy());
        assert_eq!(report.failed_critical(), vec![CHECK_DOMAIN_BOUND]);
    }

    #[tokio::test]
    async fn test_bad_credentials_fail_critically() {
        let (directory, storage, tenant) = provisioned_tenant().await;

        let report = HealthValidator::validate(
            &directory,
            &storage,
            &tenant,
            "admin@acme.example",
            "wrong-password",
        )
        .await;

        assert!(!report.is_healthy());
        assert_eq!(report.failed_critical(), vec![CHECK_ADMIN_LOGIN]);
    }

    #[tokio::test]
    async fn test_missing_environment_fails_multiple_checks() {
        let (directory, storage, tenant) = provisioned_tenant().await;
        storage.destroy_environment(tenant.id).await.unwrap();

        let report = HealthValidator::validate(
            &directory,
            &storage,
            &tenant,
            "admin@acme.example",
            "s3cret",
        )
        .await;

        assert!(!report.is_healthy());
        let failed = report.failed_critical();
        assert!(failed.contains(&CHECK_STORAGE_REACHABLE));
        assert!(failed.contains(&CHECK_ADMIN_EXISTS));
        assert!(failed.contains(&CHECK_ADMIN_LOGIN));
        assert!(report.critical_score() < 100);
    }

    #[tokio::test]
    async fn test_advisory_failure_does_not_block_health() {
        let (directory, storage, mut tenant) = provisioned_tenant().await;
        // The config check reads the in-flight record, not the directory,
        // so blanking the name here only trips the advisory check.
        tenant.name = String::new();

        let report = HealthValidator::validate(
            &directory,
            &storage,
            &tenant,
            "admin@acme.example",
            "s3cret",
        )
        .await;

        assert!(report.is_healthy());
        assert_eq!(report.failed_advisory(), vec![CHECK_TENANT_CONFIG]);
    }
}
