//! Shared identifier types for the tenant provisioning platform.

mod types;

pub use types::{JobId, TenantId};
