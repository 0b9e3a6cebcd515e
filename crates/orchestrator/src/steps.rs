//! Provisioning step names and progress bands.

/// The job type identifier for tenant provisioning.
pub const JOB_TYPE: &str = "TenantProvisioning";

/// Step name: validate the provisioning request.
pub const STEP_VALIDATE: &str = "validate_inputs";

/// Step name: remove orphaned resources left by previous aborted attempts.
pub const STEP_PREVENTIVE_CLEANUP: &str = "preventive_cleanup";

/// Step name: allocate a unique slug.
pub const STEP_ALLOCATE_SLUG: &str = "allocate_slug";

/// Step name: persist the tenant record.
pub const STEP_CREATE_TENANT: &str = "create_tenant";

/// Step name: bind the tenant's domain.
pub const STEP_BIND_DOMAIN: &str = "bind_domain";

/// Step name: create the tenant's isolated storage and run migrations.
pub const STEP_PROVISION_STORAGE: &str = "provision_storage";

/// Step name: create and verify the administrator account.
pub const STEP_CREATE_ADMIN: &str = "create_admin";

/// Step name: seed baseline content (best-effort).
pub const STEP_SEED_DATA: &str = "seed_data";

/// Step name: run the health validation battery.
pub const STEP_HEALTH_CHECK: &str = "health_check";

/// Step name: register the billing subscription (paid plans only).
pub const STEP_REGISTER_BILLING: &str = "register_billing";

/// Step name: record the provisioning audit event (best-effort).
pub const STEP_RECORD_ACTIVITY: &str = "record_activity";

/// Step name: publish the result and complete the job.
pub const STEP_FINALIZE: &str = "finalize";

/// Ordered step table with the progress percentage reported when each step
/// begins. Bands are step-proportional so polling clients see smooth,
/// monotonic progress.
pub const STEPS: &[(&str, u8)] = &[
    (STEP_VALIDATE, 5),
    (STEP_PREVENTIVE_CLEANUP, 10),
    (STEP_ALLOCATE_SLUG, 20),
    (STEP_CREATE_TENANT, 30),
    (STEP_BIND_DOMAIN, 45),
    (STEP_PROVISION_STORAGE, 60),
    (STEP_CREATE_ADMIN, 80),
    (STEP_SEED_DATA, 88),
    (STEP_HEALTH_CHECK, 92),
    (STEP_REGISTER_BILLING, 95),
    (STEP_RECORD_ACTIVITY, 97),
    (STEP_FINALIZE, 99),
];

/// Progress percentage reported when `step` begins.
pub fn progress_for(step: &str) -> u8 {
    STEPS
        .iter()
        .find(|(name, _)| *name == step)
        .map(|(_, progress)| *progress)
        .unwrap_or(0)
}
