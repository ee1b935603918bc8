pub mod apikey;
pub mod device;
pub mod server;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Parsed CLI action ready for execution.
#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
    },
    ApiKeyAdd {
        dsn: String,
        label: String,
    },
    ApiKeyList {
        dsn: String,
    },
    ApiKeyDelete {
        dsn: String,
        id: i64,
    },
    DeviceAdd {
        dsn: String,
        label: String,
    },
    DeviceAddExisting {
        dsn: String,
        label: String,
        public_id: String,
        private_id: String,
        key: String,
    },
    DeviceList {
        dsn: String,
    },
    DeviceDelete {
        dsn: String,
        public_id: String,
    },
}

/// Single-connection pool for one provisioning command.
pub(crate) async fn connect(dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
