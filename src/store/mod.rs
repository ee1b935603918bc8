//! Credential storage: PostgreSQL repositories for API keys and devices.

pub mod apikeys;
pub mod devices;
pub mod models;

/// True when a database error is a unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505")
    )
}
