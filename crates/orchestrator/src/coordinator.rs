//! The provisioning coordinator: an ordered, compensating state machine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::JobId;
use job_store::{
    DeduplicationGuard, JobRecord, JobStatus, KeyValueStore, ProgressTracker, ResultPublisher,
};
use tenancy::{DomainBinding, NewAdminAccount, Tenant, TenantDirectory};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::{ProvisioningError, Result};
use crate::health::HealthValidator;
use crate::outcome::{AdminCredentials, ProvisioningResult};
use crate::request::ProvisionRequest;
use crate::resources::{CreatedResource, CreatedResources};
use crate::rollback::RollbackHandler;
use crate::services::{AuditService, BillingService, StorageProvisioner};
use crate::steps::{
    self, STEP_ALLOCATE_SLUG, STEP_BIND_DOMAIN, STEP_CREATE_ADMIN, STEP_CREATE_TENANT,
    STEP_FINALIZE, STEP_HEALTH_CHECK, STEP_PREVENTIVE_CLEANUP, STEP_PROVISION_STORAGE,
    STEP_RECORD_ACTIVITY, STEP_REGISTER_BILLING, STEP_SEED_DATA, STEP_VALIDATE,
};

/// Outcome of accepting a provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedJob {
    /// The job to poll. For a duplicate request this is the in-flight job.
    pub job_id: JobId,
    /// True when an in-flight job for the same slug was returned instead of
    /// minting a new one.
    pub deduplicated: bool,
}

struct Inner<D, S, B, A> {
    directory: D,
    storage: S,
    billing: B,
    audit: A,
    progress: ProgressTracker,
    guard: DeduplicationGuard,
    publisher: ResultPublisher,
    config: OrchestratorConfig,
}

/// Orchestrates tenant provisioning jobs.
///
/// `start` validates synchronously, consults the deduplication guard and
/// spawns the state machine on a background task; everything after that is
/// observed through polling. Cloning is cheap and shares all state.
pub struct ProvisioningCoordinator<D, S, B, A> {
    inner: Arc<Inner<D, S, B, A>>,
}

impl<D, S, B, A> Clone for ProvisioningCoordinator<D, S, B, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D, S, B, A> ProvisioningCoordinator<D, S, B, A>
where
    D: TenantDirectory + 'static,
    S: StorageProvisioner + 'static,
    B: BillingService + 'static,
    A: AuditService + 'static,
{
    /// Creates a coordinator with default configuration.
    pub fn new(store: Arc<dyn KeyValueStore>, directory: D, storage: S, billing: B, audit: A) -> Self {
        Self::with_config(
            store,
            directory,
            storage,
            billing,
            audit,
            OrchestratorConfig::default(),
        )
    }

    /// Creates a coordinator with custom configuration.
    pub fn with_config(
        store: Arc<dyn KeyValueStore>,
        directory: D,
        storage: S,
        billing: B,
        audit: A,
        config: OrchestratorConfig,
    ) -> Self {
        let progress = ProgressTracker::with_ttl(store.clone(), config.job_ttl);
        let guard =
            DeduplicationGuard::with_ttls(store.clone(), config.dedup_ttl, config.terminal_grace);
        let publisher = ResultPublisher::with_ttls(store, config.result_ttl, config.read_grace);
        Self {
            inner: Arc::new(Inner {
                directory,
                storage,
                billing,
                audit,
                progress,
                guard,
                publisher,
                config,
            }),
        }
    }

    /// Accepts a provisioning request and returns the job id to poll.
    ///
    /// Validation and conflict faults surface here, before a job is minted.
    /// A request for a slug with an in-flight job returns the existing job
    /// id, making client-side retries idempotent.
    #[tracing::instrument(skip(self, request), fields(slug = %request.tenant_slug))]
    pub async fn start(&self, request: ProvisionRequest) -> Result<StartedJob> {
        metrics::counter!("provisioning_requests_total").increment(1);
        request.validate()?;

        let acquisition = self.inner.guard.try_acquire(&request.tenant_slug).await?;
        let job_id = acquisition.job_id();
        if !acquisition.is_new() {
            tracing::info!(%job_id, "redirecting duplicate request to in-flight job");
            return Ok(StartedJob {
                job_id,
                deduplicated: true,
            });
        }

        if let Err(error) = self
            .inner
            .progress
            .register(job_id, &request.tenant_slug)
            .await
        {
            // Unbind the slug so it is not left pointing at a ghost job
            if let Err(clear_error) = self.inner.guard.clear(&request.tenant_slug).await {
                tracing::warn!(%clear_error, "failed to clear guard after registration failure");
            }
            return Err(error.into());
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run(job_id, request).await;
        });

        Ok(StartedJob {
            job_id,
            deduplicated: false,
        })
    }

    /// Returns the current status record for a job.
    pub async fn status(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        Ok(self.inner.progress.get(job_id).await?)
    }

    /// Returns the terminal result for a job, arming delayed cleanup.
    pub async fn result(&self, job_id: JobId) -> Result<Option<ProvisioningResult>> {
        Ok(self.inner.publisher.fetch(job_id).await?)
    }

    /// Returns true if the slug is free for a new tenant.
    pub async fn slug_available(&self, slug: &str) -> Result<bool> {
        Ok(self.inner.directory.slug_available(slug).await?)
    }

    /// Drives the job to a terminal state. Runs on a background task; all
    /// faults are reported through the progress store, never thrown.
    #[tracing::instrument(skip(self, request), fields(%job_id, slug = %request.tenant_slug))]
    async fn run(&self, job_id: JobId, request: ProvisionRequest) {
        metrics::counter!("provisioning_jobs_total").increment(1);
        let started = std::time::Instant::now();
        let mut resources = CreatedResources::new();

        if let Err(error) = self
            .inner
            .guard
            .update_status(&request.tenant_slug, job_id, JobStatus::Running)
            .await
        {
            tracing::warn!(%error, "failed to refresh deduplication entry");
        }

        match self.execute(job_id, &request, &mut resources).await {
            Ok(()) => {
                metrics::counter!("provisioning_completed").increment(1);
                tracing::info!(
                    duration = started.elapsed().as_secs_f64(),
                    "provisioning completed"
                );
            }
            Err(error) => {
                metrics::counter!("provisioning_failed").increment(1);
                self.fail_job(job_id, &request.tenant_slug, &error, &resources)
                    .await;
            }
        }
        metrics::histogram!("provisioning_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    /// The ordered step sequence. Returns on the first step fault; the
    /// caller compensates using the resource log.
    async fn execute(
        &self,
        job_id: JobId,
        request: &ProvisionRequest,
        resources: &mut CreatedResources,
    ) -> Result<()> {
        let inner = &self.inner;

        // 1. Validate inputs (again, inside the machine: the synchronous
        // check guards the caller, this one guards the state machine).
        self.step(job_id, STEP_VALIDATE, "Validating provided data", async {
            request.validate()
        })
        .await?;

        // 2. Preventive cleanup of leftovers from aborted attempts. Only
        // provably orphaned resources are touched: a tenant record counts
        // as live unless its storage environment is missing. Best-effort.
        self.step(
            job_id,
            STEP_PREVENTIVE_CLEANUP,
            "Removing leftovers from previous attempts",
            async {
                match inner.directory.find_by_slug(&request.tenant_slug).await {
                    Ok(Some(existing)) => {
                        let has_env = inner
                            .storage
                            .environment_exists(existing.id)
                            .await
                            .unwrap_or(true);
                        if !has_env {
                            tracing::warn!(
                                tenant_id = %existing.id,
                                "removing orphaned tenant record without environment"
                            );
                            if let Err(error) = inner.directory.delete_tenant(existing.id).await {
                                tracing::warn!(%error, "orphan record cleanup failed");
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(error) => tracing::warn!(%error, "orphan probe failed"),
                }

                if inner
                    .directory
                    .find_by_slug(&request.tenant_slug)
                    .await
                    .ok()
                    .flatten()
                    .is_none()
                {
                    match inner.storage.purge_environments(&request.tenant_slug).await {
                        Ok(0) | Err(_) => {}
                        Ok(n) => tracing::warn!(count = n, "purged orphaned environments"),
                    }
                    if let Err(error) = inner.directory.release_slug(&request.tenant_slug).await {
                        tracing::warn!(%error, "stale reservation cleanup failed");
                    }
                }
                Ok(())
            },
        )
        .await?;

        // 3. Allocate a unique slug, then re-verify once more as a final
        // guard against races introduced by the cleanup step.
        let slug = self
            .step(
                job_id,
                STEP_ALLOCATE_SLUG,
                "Allocating unique identifier",
                async {
                    let slug = inner.directory.allocate_slug(&request.tenant_slug).await?;
                    if slug != request.tenant_slug {
                        tracing::info!(
                            requested = %request.tenant_slug,
                            allocated = %slug,
                            "requested slug was taken; allocated a variant"
                        );
                    }
                    if inner.directory.find_by_slug(&slug).await?.is_some() {
                        if let Err(error) = inner.directory.release_slug(&slug).await {
                            tracing::warn!(%error, "failed to release reservation after collision");
                        }
                        return Err(ProvisioningError::StepFailed {
                            step: STEP_ALLOCATE_SLUG.to_string(),
                            reason: format!("slug '{slug}' was taken after allocation"),
                        });
                    }
                    Ok(slug)
                },
            )
            .await?;
        resources.push(CreatedResource::SlugReservation { slug: slug.clone() });

        // 4. Create the tenant record: the first undoable side effect.
        let tenant = Tenant::new(
            &request.tenant_name,
            &slug,
            &request.description,
            request.plan,
        );
        self.step(job_id, STEP_CREATE_TENANT, "Creating tenant record", async {
            inner.directory.insert_tenant(&tenant).await?;
            Ok(())
        })
        .await?;
        resources.push(CreatedResource::TenantRecord {
            tenant_id: tenant.id,
        });

        // 5. Bind the tenant domain.
        let domain = inner.config.domain_for(&slug);
        self.step(job_id, STEP_BIND_DOMAIN, "Binding tenant domain", async {
            inner
                .directory
                .bind_domain(&DomainBinding::new(tenant.id, domain.clone()))
                .await?;
            Ok(())
        })
        .await?;
        resources.push(CreatedResource::DomainBinding {
            tenant_id: tenant.id,
            domain: domain.clone(),
        });

        // 6. Provision isolated storage. Opaque and possibly slow; runs
        // under the generous storage timeout.
        self.step(
            job_id,
            STEP_PROVISION_STORAGE,
            "Creating isolated database and running migrations",
            async { inner.storage.create_environment(tenant.id, &slug).await },
        )
        .await?;
        resources.push(CreatedResource::IsolatedStorage {
            tenant_id: tenant.id,
        });

        // 7. Create the administrator and immediately verify the generated
        // credentials: the first functional attestation that step 6 really
        // produced a queryable environment.
        let credentials = AdminCredentials {
            email: request.admin_email.clone(),
            password: generate_password(),
        };
        self.step(
            job_id,
            STEP_CREATE_ADMIN,
            "Creating administrator account",
            async {
                let account = NewAdminAccount {
                    name: request.admin_name.clone(),
                    email: credentials.email.clone(),
                    password: credentials.password.clone(),
                };
                inner.storage.create_admin_account(tenant.id, &account).await?;

                let ok = inner
                    .storage
                    .authenticate(tenant.id, &credentials.email, &credentials.password)
                    .await?;
                if !ok {
                    return Err(ProvisioningError::StepFailed {
                        step: STEP_CREATE_ADMIN.to_string(),
                        reason: "administrator credentials failed verification".to_string(),
                    });
                }
                Ok(())
            },
        )
        .await?;
        resources.push(CreatedResource::AdminAccount {
            tenant_id: tenant.id,
            email: credentials.email.clone(),
        });

        // 8. Seed baseline content. Best-effort: a tenant without seed data
        // is still minimally usable.
        self.step(job_id, STEP_SEED_DATA, "Seeding baseline content", async {
            if let Err(error) = inner.storage.seed_baseline_data(tenant.id).await {
                metrics::counter!("provisioning_seed_failures").increment(1);
                tracing::warn!(%error, "baseline seeding failed; continuing");
            }
            Ok(())
        })
        .await?;

        // 9. Health validation gates success: a tenant that exists but is
        // not functional fails the job even though every prior step passed.
        self.step(
            job_id,
            STEP_HEALTH_CHECK,
            "Validating platform integrity",
            async {
                let report = HealthValidator::validate(
                    &inner.directory,
                    &inner.storage,
                    &tenant,
                    &credentials.email,
                    &credentials.password,
                )
                .await;
                tracing::info!(
                    score = report.critical_score(),
                    healthy = report.is_healthy(),
                    "health validation finished"
                );
                if !report.failed_advisory().is_empty() {
                    tracing::warn!(
                        checks = ?report.failed_advisory(),
                        "advisory health checks failed"
                    );
                }
                if !report.is_healthy() {
                    return Err(ProvisioningError::Unhealthy(format!(
                        "critical checks failed: {}",
                        report.failed_critical().join(", ")
                    )));
                }
                Ok(())
            },
        )
        .await?;

        // 10. Register billing, only for paid plans. Best-effort.
        let price_cents = request.plan.monthly_price_cents();
        self.step(
            job_id,
            STEP_REGISTER_BILLING,
            "Registering subscription",
            async {
                if price_cents > 0 {
                    match inner
                        .billing
                        .register_subscription(tenant.id, request.plan, price_cents)
                        .await
                    {
                        Ok(subscription) => {
                            tracing::info!(
                                contract_id = %subscription.contract_id,
                                "subscription registered"
                            );
                        }
                        Err(error) => {
                            metrics::counter!("provisioning_billing_failures").increment(1);
                            tracing::warn!(%error, "billing registration failed; continuing");
                        }
                    }
                }
                Ok(())
            },
        )
        .await?;

        // 11. Record the activity event. Best-effort.
        self.step(job_id, STEP_RECORD_ACTIVITY, "Recording activity", async {
            let payload = serde_json::json!({
                "job_id": job_id,
                "slug": slug,
                "plan": request.plan,
                "monthly_price_cents": price_cents,
            });
            if let Err(error) = inner
                .audit
                .record_event(tenant.id, "tenant_provisioned", payload)
                .await
            {
                tracing::warn!(%error, "activity recording failed; continuing");
            }
            Ok(())
        })
        .await?;

        // 12. Publish the result, then flip the job to completed so a
        // client that observes `completed` always finds the payload.
        self.step(job_id, STEP_FINALIZE, "Finalizing platform setup", async {
            let login_url = inner.config.login_url(&domain);
            let result =
                ProvisioningResult::completed(&tenant, &domain, &login_url, credentials.clone());
            inner.publisher.publish(job_id, &result).await?;
            Ok(())
        })
        .await?;

        inner
            .progress
            .complete(job_id, "Platform created successfully")
            .await?;
        inner
            .guard
            .mark_terminal(&request.tenant_slug, job_id, JobStatus::Completed)
            .await?;

        Ok(())
    }

    /// Records a step transition and runs its body under the bounded wait.
    /// Faults are tagged with the step name so polling clients see where
    /// the job died.
    async fn step<T, F>(
        &self,
        job_id: JobId,
        step: &'static str,
        message: &str,
        body: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.inner
            .progress
            .advance(job_id, steps::progress_for(step), step, message)
            .await?;
        tracing::info!(step, "provisioning step started");

        let timeout = self.step_timeout(step);
        match tokio::time::timeout(timeout, body).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(
                error @ (ProvisioningError::StepFailed { .. } | ProvisioningError::StepTimeout { .. }),
            )) => Err(error),
            Ok(Err(error)) => Err(ProvisioningError::StepFailed {
                step: step.to_string(),
                reason: error.to_string(),
            }),
            Err(_) => Err(ProvisioningError::StepTimeout {
                step: step.to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }

    fn step_timeout(&self, step: &str) -> Duration {
        if step == STEP_PROVISION_STORAGE {
            self.inner.config.storage_timeout
        } else {
            self.inner.config.step_timeout
        }
    }

    /// Terminal failure path: compensate created resources, publish the
    /// failure, free the slug and only then mark the job failed, so a
    /// client that observes `failed` finds no partial tenant and can retry
    /// immediately. Compensation failures are logged but never re-fail the
    /// job.
    async fn fail_job(
        &self,
        job_id: JobId,
        slug: &str,
        error: &ProvisioningError,
        resources: &CreatedResources,
    ) {
        let step = match error {
            ProvisioningError::StepFailed { step, .. }
            | ProvisioningError::StepTimeout { step, .. } => step.clone(),
            _ => "unknown".to_string(),
        };
        tracing::error!(%error, %step, "provisioning failed; compensating");

        let report = RollbackHandler::compensate(
            &self.inner.directory,
            &self.inner.storage,
            job_id,
            resources,
        )
        .await;
        if !report.is_clean() {
            tracing::error!(
                failed = ?report.failed,
                "compensation incomplete; resources may need operator cleanup"
            );
        }

        if let Err(error) = self
            .inner
            .publisher
            .publish(job_id, &ProvisioningResult::failed(error.to_string()))
            .await
        {
            tracing::warn!(%error, "failed to publish failure result");
        }

        // Free the slug before the failure becomes observable, so a retry
        // issued on seeing `failed` never collides with the guard entry.
        if let Err(error) = self.inner.guard.clear(slug).await {
            tracing::warn!(%error, "failed to clear deduplication entry");
        }

        if let Err(error) = self
            .inner
            .progress
            .fail(job_id, &step, &format!("Provisioning failed: {error}"))
            .await
        {
            tracing::warn!(%error, "failed to record job failure");
        }
    }
}

/// Generates a random administrator password.
fn generate_password() -> String {
    let raw = format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    raw[..20].to_string()
}
