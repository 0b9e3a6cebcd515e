use async_trait::async_trait;
use common::TenantId;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    DirectoryError, Result,
    directory::{MAX_SLUG_ATTEMPTS, TenantDirectory},
    plan::{Plan, PlanLimits},
    slug,
    tenant::{DomainBinding, Tenant},
};

/// PostgreSQL-backed tenant directory implementation.
#[derive(Clone)]
pub struct PostgresTenantDirectory {
    pool: PgPool,
}

impl PostgresTenantDirectory {
    /// Creates a new PostgreSQL tenant directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_tenant(row: PgRow) -> Result<Tenant> {
        let plan: Plan = row.try_get::<String, _>("plan")?.parse()?;
        Ok(Tenant {
            id: TenantId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            plan,
            limits: PlanLimits {
                max_users: row.try_get::<i64, _>("max_users")? as u32,
                max_courses: row.try_get::<i64, _>("max_courses")? as u32,
                max_storage_mb: row.try_get::<i64, _>("max_storage_mb")? as u64,
            },
            is_active: row.try_get("is_active")?,
            trial_ends_at: row.try_get("trial_ends_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_binding(row: PgRow) -> Result<DomainBinding> {
        Ok(DomainBinding {
            tenant_id: TenantId::from_uuid(row.try_get::<Uuid, _>("tenant_id")?),
            domain: row.try_get("domain")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl TenantDirectory for PostgresTenantDirectory {
    async fn allocate_slug(&self, requested: &str) -> Result<String> {
        if !slug::is_valid(requested) {
            return Err(DirectoryError::InvalidSlug(requested.to_string()));
        }

        let base = slug::strip_numeric_suffix(requested);
        let mut tx = self.pool.begin().await?;

        for attempt in 0..=MAX_SLUG_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.to_string()
            } else {
                format!("{base}{attempt}")
            };

            let taken: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS(SELECT 1 FROM tenants WHERE slug = $1)
                    OR EXISTS(SELECT 1 FROM slug_reservations WHERE slug = $1)
                "#,
            )
            .bind(&candidate)
            .fetch_one(&mut *tx)
            .await?;

            if taken {
                continue;
            }

            // ON CONFLICT covers the race with a concurrent allocator that
            // reserved the candidate after our existence check.
            let inserted =
                sqlx::query("INSERT INTO slug_reservations (slug) VALUES ($1) ON CONFLICT DO NOTHING")
                    .bind(&candidate)
                    .execute(&mut *tx)
                    .await?;

            if inserted.rows_affected() == 1 {
                tx.commit().await?;
                return Ok(candidate);
            }
        }

        // Timestamped fallback, treated as collision-free.
        let fallback = slug::fallback_slug(base);
        metrics::counter!("slug_fallback_total").increment(1);
        tracing::warn!(base, slug = %fallback, "slug counter space exhausted; using fallback");
        sqlx::query("INSERT INTO slug_reservations (slug) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(&fallback)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(fallback)
    }

    async fn release_slug(&self, slug: &str) -> Result<()> {
        sqlx::query("DELETE FROM slug_reservations WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn slug_available(&self, slug: &str) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM tenants WHERE slug = $1)
                OR EXISTS(SELECT 1 FROM slug_reservations WHERE slug = $1)
            "#,
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(!taken)
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tenants
                (id, name, slug, description, plan, max_users, max_courses,
                 max_storage_mb, is_active, trial_ends_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(&tenant.description)
        .bind(tenant.plan.as_str())
        .bind(tenant.limits.max_users as i64)
        .bind(tenant.limits.max_courses as i64)
        .bind(tenant.limits.max_storage_mb as i64)
        .bind(tenant.is_active)
        .bind(tenant.trial_ends_at)
        .bind(tenant.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_tenant_slug")
            {
                return DirectoryError::SlugTaken(tenant.slug.clone());
            }
            DirectoryError::Database(e)
        })?;

        sqlx::query("DELETE FROM slug_reservations WHERE slug = $1")
            .bind(&tenant.slug)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_tenant).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_tenant).transpose()
    }

    async fn delete_tenant(&self, id: TenantId) -> Result<()> {
        // Domain bindings cascade via the foreign key.
        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn bind_domain(&self, binding: &DomainBinding) -> Result<()> {
        sqlx::query(
            "INSERT INTO domain_bindings (domain, tenant_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(&binding.domain)
        .bind(binding.tenant_id.as_uuid())
        .bind(binding.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn domains_for(&self, tenant_id: TenantId) -> Result<Vec<DomainBinding>> {
        let rows = sqlx::query(
            "SELECT domain, tenant_id, created_at FROM domain_bindings WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_binding).collect()
    }

    async fn unbind_domains(&self, tenant_id: TenantId) -> Result<()> {
        sqlx::query("DELETE FROM domain_bindings WHERE tenant_id = $1")
            .bind(tenant_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
