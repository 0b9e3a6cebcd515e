//! Compensating transactions for failed provisioning jobs.

use common::JobId;
use tenancy::TenantDirectory;

use crate::resources::{CreatedResource, CreatedResources};
use crate::services::StorageProvisioner;

/// Summary of a compensation pass.
#[derive(Debug, Clone, Default)]
pub struct CompensationReport {
    /// Number of compensating actions attempted.
    pub attempted: usize,
    /// Resources whose compensation failed, with the error text.
    pub failed: Vec<(String, String)>,
}

impl CompensationReport {
    /// True if every attempted compensation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Undoes the resources created by a failed job, in reverse creation order.
///
/// Every compensating action is best-effort: a failure is logged and
/// recorded in the report but never stops the remaining actions, so one
/// stuck resource cannot orphan the others.
pub struct RollbackHandler;

impl RollbackHandler {
    /// Compensates the given resources.
    #[tracing::instrument(skip(directory, storage, resources))]
    pub async fn compensate<D, S>(
        directory: &D,
        storage: &S,
        job_id: JobId,
        resources: &CreatedResources,
    ) -> CompensationReport
    where
        D: TenantDirectory + ?Sized,
        S: StorageProvisioner + ?Sized,
    {
        let mut report = CompensationReport::default();

        for resource in resources.in_rollback_order() {
            report.attempted += 1;
            let outcome: Result<(), String> = match resource {
                CreatedResource::AdminAccount { tenant_id, email } => storage
                    .remove_admin_account(*tenant_id, email)
                    .await
                    .map_err(|e| e.to_string()),
                CreatedResource::IsolatedStorage { tenant_id } => storage
                    .destroy_environment(*tenant_id)
                    .await
                    .map_err(|e| e.to_string()),
                CreatedResource::DomainBinding { tenant_id, .. } => directory
                    .unbind_domains(*tenant_id)
                    .await
                    .map_err(|e| e.to_string()),
                CreatedResource::TenantRecord { tenant_id } => directory
                    .delete_tenant(*tenant_id)
                    .await
                    .map_err(|e| e.to_string()),
                CreatedResource::SlugReservation { slug } => directory
                    .release_slug(slug)
                    .await
                    .map_err(|e| e.to_string()),
            };

            match outcome {
                Ok(()) => {
                    tracing::info!(kind = resource.kind(), "compensated resource");
                }
                Err(reason) => {
                    metrics::counter!("provisioning_rollback_failures").increment(1);
                    tracing::error!(
                        kind = resource.kind(),
                        error = %reason,
                        "compensation failed; resource may be orphaned"
                    );
                    report.failed.push((resource.kind().to_string(), reason));
                }
            }
        }

        if report.is_clean() {
            metrics::counter!("provisioning_rollbacks_total").increment(1);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStorageProvisioner;
    use common::TenantId;
    use tenancy::{DomainBinding, InMemoryTenantDirectory, NewAdminAccount, Plan, Tenant};

    struct Created {
        directory: InMemoryTenantDirectory,
        storage: InMemoryStorageProvisioner,
        tenant: Tenant,
        resources: CreatedResources,
    }

    /// Builds the full resource set a job would have created before step 8.
    async fn fully_created() -> Created {
        let directory = InMemoryTenantDirectory::new();
        let storage = InMemoryStorageProvisioner::new();

        let slug = directory.allocate_slug("acme").await.unwrap();
        let tenant = Tenant::new("Acme", &slug, "", Plan::Premium);
        directory.insert_tenant(&tenant).await.unwrap();
        let domain = "acme.platform.example".to_string();
        directory
            .bind_domain(&DomainBinding::new(tenant.id, &*domain))
            .await
            .unwrap();
        storage.create_environment(tenant.id, &slug).await.unwrap();
        let email = "admin@acme.example".to_string();
        storage
            .create_admin_account(
                tenant.id,
                &NewAdminAccount {
                    name: "Admin".to_string(),
                    email: email.clone(),
                    password: "s3cret".to_string(),
                },
            )
            .await
            .unwrap();

        let mut resources = CreatedResources::new();
        resources.push(CreatedResource::SlugReservation { slug: slug.clone() });
        resources.push(CreatedResource::TenantRecord { tenant_id: tenant.id });
        resources.push(CreatedResource::DomainBinding {
            tenant_id: tenant.id,
            domain,
        });
        resources.push(CreatedResource::IsolatedStorage { tenant_id: tenant.id });
        resources.push(CreatedResource::AdminAccount {
            tenant_id: tenant.id,
            email,
        });

        Created {
            directory,
            storage,
            tenant,
            resources,
        }
    }

    #[tokio::test]
    async fn test_full_compensation_removes_everything() {
        let created = fully_created().await;

        let report = RollbackHandler::compensate(
            &created.directory,
            &created.storage,
            JobId::new(),
            &created.resources,
        )
        .await;

        assert!(report.is_clean());
        assert_eq!(report.attempted, 5);
        assert!(
            created
                .directory
                .find_by_slug("acme")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(created.directory.domain_count().await, 0);
        assert_eq!(created.storage.environment_count(), 0);
        assert!(created.directory.slug_available("acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_resource_set() {
        let directory = InMemoryTenantDirectory::new();
        let storage = InMemoryStorageProvisioner::new();
        let slug = directory.allocate_slug("acme").await.unwrap();
        let tenant = Tenant::new("Acme", &slug, "", Plan::Basic);
        directory.insert_tenant(&tenant).await.unwrap();

        let mut resources = CreatedResources::new();
        resources.push(CreatedResource::SlugReservation { slug: slug.clone() });
        resources.push(CreatedResource::TenantRecord { tenant_id: tenant.id });

        let report =
            RollbackHandler::compensate(&directory, &storage, JobId::new(), &resources).await;

        assert!(report.is_clean());
        assert_eq!(report.attempted, 2);
        assert!(directory.find_by_slug("acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_resource_set_is_a_noop() {
        let directory = InMemoryTenantDirectory::new();
        let storage = InMemoryStorageProvisioner::new();

        let report = RollbackHandler::compensate(
            &directory,
            &storage,
            JobId::new(),
            &CreatedResources::new(),
        )
        .await;

        assert!(report.is_clean());
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test]
    async fn test_compensation_is_idempotent() {
        let created = fully_created().await;

        // Resources already gone (e.g. a concurrent operator cleanup)
        created.storage.destroy_environment(created.tenant.id).await.unwrap();
        created.directory.delete_tenant(created.tenant.id).await.unwrap();

        let report = RollbackHandler::compensate(
            &created.directory,
            &created.storage,
            JobId::new(),
            &created.resources,
        )
        .await;

        assert!(report.is_clean());
    }
}
