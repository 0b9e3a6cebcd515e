//! Administrator account records and credential hashing.

use chrono::{DateTime, Utc};
use common::TenantId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The first user of a tenant environment, created with elevated role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdministratorAccount {
    /// Account id within the tenant environment.
    pub id: Uuid,
    /// The tenant this account belongs to.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role, always `admin` for the initial account.
    pub role: String,
    /// SHA-256 credential digest. Never the plaintext password.
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating an administrator account. Carries the plaintext
/// password transiently; it is hashed before storage.
#[derive(Debug, Clone)]
pub struct NewAdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl AdministratorAccount {
    /// Creates an admin account from the given input, hashing the password.
    pub fn create(tenant_id: TenantId, input: &NewAdminAccount) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: input.name.clone(),
            email: input.email.clone(),
            role: "admin".to_string(),
            password_hash: hash_password(&input.password),
            created_at: Utc::now(),
        }
    }
}

/// Hashes a password with SHA-256, returning a lowercase hex digest.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Verifies a plaintext password against a stored digest.
pub fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}
