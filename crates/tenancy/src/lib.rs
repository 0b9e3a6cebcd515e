//! Tenant records, plan catalog and the durable tenant directory.
//!
//! The [`TenantDirectory`] trait is the durable store the orchestrator
//! provisions against: tenant records, domain bindings and slug
//! reservations. Two implementations are provided, an in-memory one for
//! tests and a PostgreSQL one backed by sqlx.

pub mod admin;
pub mod directory;
pub mod error;
pub mod memory;
pub mod plan;
pub mod postgres;
pub mod slug;
pub mod tenant;

pub use admin::{AdministratorAccount, NewAdminAccount, hash_password, verify_password};
pub use common::TenantId;
pub use directory::{MAX_SLUG_ATTEMPTS, TenantDirectory};
pub use error::{DirectoryError, Result};
pub use memory::InMemoryTenantDirectory;
pub use plan::{Plan, PlanLimits};
pub use postgres::PostgresTenantDirectory;
pub use tenant::{DomainBinding, Tenant};
