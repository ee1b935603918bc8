//! API key provisioning actions.

use anyhow::{bail, Result};

use super::connect;
use crate::store::{apikeys::ApiKeyRepo, is_unique_violation, models::NewApiKey};

/// Create an API key with a random secret and print it once.
///
/// # Errors
///
/// Returns an error if the label is invalid, already taken, or the insert
/// fails.
pub async fn add(dsn: &str, label: &str) -> Result<()> {
    let pool = connect(dsn).await?;
    let new = NewApiKey::generate(label.to_owned())?;

    match ApiKeyRepo::create(&pool, &new).await {
        Ok(key) => {
            println!("Created: id={}, key={}", key.id, new.secret);
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            bail!("an API key labelled {label:?} already exists")
        }
        Err(err) => Err(err),
    }
}

/// List API keys, id column aligned.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(dsn: &str) -> Result<()> {
    let pool = connect(dsn).await?;
    let keys = ApiKeyRepo::list(&pool).await?;

    let width = keys
        .iter()
        .map(|key| key.id.to_string().len())
        .max()
        .unwrap_or(1);

    for key in keys {
        println!("{:<width$} {}", key.id, key.label);
    }

    Ok(())
}

/// Delete an API key by id.
///
/// # Errors
///
/// Returns an error if the key does not exist or the delete fails.
pub async fn delete(dsn: &str, id: i64) -> Result<()> {
    let pool = connect(dsn).await?;

    match ApiKeyRepo::delete(&pool, id).await? {
        Some(key) => {
            println!("Deleted: {} ({})", key.label, key.id);
            Ok(())
        }
        None => bail!("API key id={id} does not exist"),
    }
}
