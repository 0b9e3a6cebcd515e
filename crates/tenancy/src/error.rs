use thiserror::Error;

/// Errors that can occur when interacting with the tenant directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The slug is already bound to an existing tenant.
    #[error("Slug '{0}' is already in use")]
    SlugTaken(String),

    /// The slug does not satisfy the syntax rules.
    #[error("Invalid slug '{0}': lowercase letters, digits and hyphens only")]
    InvalidSlug(String),

    /// A stored plan identifier could not be parsed.
    #[error("Unknown plan '{0}'")]
    UnknownPlan(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
