//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p tenancy --test postgres_integration -- --test-threads=1
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serial_test::serial;
use sqlx::PgPool;
use tenancy::{
    DirectoryError, DomainBinding, Plan, PostgresTenantDirectory, Tenant, TenantDirectory,
    TenantId,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_tenancy_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh directory with its own pool and cleared tables
async fn get_test_directory() -> PostgresTenantDirectory {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE tenants, domain_bindings, slug_reservations CASCADE")
        .execute(&pool)
        .await
        .unwrap();

    PostgresTenantDirectory::new(pool)
}

fn tenant(slug: &str) -> Tenant {
    Tenant::new("Acme", slug, "integration test", Plan::Basic)
}

#[tokio::test]
#[serial]
async fn insert_and_find_tenant() {
    let dir = get_test_directory().await;
    let t = tenant("acme");

    dir.insert_tenant(&t).await.unwrap();

    let by_id = dir.get_tenant(t.id).await.unwrap().unwrap();
    assert_eq!(by_id.slug, "acme");
    assert_eq!(by_id.plan, Plan::Basic);
    assert_eq!(by_id.limits, Plan::Basic.limits());
    assert!(by_id.is_active);

    let by_slug = dir.find_by_slug("acme").await.unwrap().unwrap();
    assert_eq!(by_slug.id, t.id);
}

#[tokio::test]
#[serial]
async fn get_missing_tenant_returns_none() {
    let dir = get_test_directory().await;
    assert!(dir.get_tenant(TenantId::new()).await.unwrap().is_none());
    assert!(dir.find_by_slug("nope").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_slug_is_rejected() {
    let dir = get_test_directory().await;
    dir.insert_tenant(&tenant("acme")).await.unwrap();

    let result = dir.insert_tenant(&tenant("acme")).await;
    assert!(matches!(result, Err(DirectoryError::SlugTaken(_))));
}

#[tokio::test]
#[serial]
async fn allocate_slug_prefers_base_then_counters() {
    let dir = get_test_directory().await;

    let first = dir.allocate_slug("acme7").await.unwrap();
    assert_eq!(first, "acme");

    // Reservation blocks the base for the next caller
    let second = dir.allocate_slug("acme").await.unwrap();
    assert_eq!(second, "acme1");
}

#[tokio::test]
#[serial]
async fn insert_consumes_reservation() {
    let dir = get_test_directory().await;
    let slug = dir.allocate_slug("acme").await.unwrap();
    assert!(!dir.slug_available(&slug).await.unwrap());

    dir.insert_tenant(&tenant(&slug)).await.unwrap();

    let reserved: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM slug_reservations WHERE slug = $1)")
            .bind(&slug)
            .fetch_one(dir.pool())
            .await
            .unwrap();
    assert!(!reserved);
}

#[tokio::test]
#[serial]
async fn release_slug_frees_reservation() {
    let dir = get_test_directory().await;
    let slug = dir.allocate_slug("acme").await.unwrap();

    dir.release_slug(&slug).await.unwrap();

    assert!(dir.slug_available(&slug).await.unwrap());
}

#[tokio::test]
#[serial]
async fn concurrent_allocations_yield_distinct_slugs() {
    let dir = get_test_directory().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let dir = dir.clone();
        handles.push(tokio::spawn(
            async move { dir.allocate_slug("acme").await.unwrap() },
        ));
    }

    let mut slugs = HashSet::new();
    for handle in handles {
        slugs.insert(handle.await.unwrap());
    }
    assert_eq!(slugs.len(), 8);
}

#[tokio::test]
#[serial]
async fn delete_tenant_cascades_domains() {
    let dir = get_test_directory().await;
    let t = tenant("acme");
    dir.insert_tenant(&t).await.unwrap();
    dir.bind_domain(&DomainBinding::new(t.id, "acme.platform.example"))
        .await
        .unwrap();
    assert_eq!(dir.domains_for(t.id).await.unwrap().len(), 1);

    dir.delete_tenant(t.id).await.unwrap();

    assert!(dir.get_tenant(t.id).await.unwrap().is_none());
    assert!(dir.domains_for(t.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn unbind_domains_removes_bindings() {
    let dir = get_test_directory().await;
    let t = tenant("acme");
    dir.insert_tenant(&t).await.unwrap();
    dir.bind_domain(&DomainBinding::new(t.id, "acme.platform.example"))
        .await
        .unwrap();

    dir.unbind_domains(t.id).await.unwrap();

    assert!(dir.domains_for(t.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn allocation_skips_existing_tenants_and_reservations() {
    let dir = get_test_directory().await;
    dir.insert_tenant(&tenant("acme")).await.unwrap();
    dir.insert_tenant(&tenant("acme1")).await.unwrap();

    let reserved = dir.allocate_slug("acme").await.unwrap();
    assert_eq!(reserved, "acme2");
}
