//! API key repository.

use anyhow::{Context, Result};
use sqlx::PgPool;

use super::models::{ApiKey, NewApiKey};

pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Insert a new API key and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on a duplicate label.
    pub async fn create(pool: &PgPool, new: &NewApiKey) -> Result<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (label, secret) VALUES ($1, $2) RETURNING *",
        )
        .bind(&new.label)
        .bind(&new.secret)
        .fetch_one(pool)
        .await
        .context("Failed to insert API key")
    }

    /// Look up an API key by its numeric id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to fetch API key")
    }

    /// All API keys in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(pool: &PgPool) -> Result<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys ORDER BY id")
            .fetch_all(pool)
            .await
            .context("Failed to list API keys")
    }

    /// Delete an API key, returning the removed row if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("DELETE FROM api_keys WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to delete API key")
    }
}
