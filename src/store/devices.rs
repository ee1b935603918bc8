//! Device repository and the per-device validation lock.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{Device, NewDevice};

pub struct DeviceRepo;

impl DeviceRepo {
    /// Insert a new device and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on a duplicate label
    /// or identifier.
    pub async fn create(pool: &PgPool, new: &NewDevice) -> Result<Device> {
        sqlx::query_as::<_, Device>(
            "INSERT INTO devices (label, public_id, private_id, aes_key) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new.label)
        .bind(&new.public_id)
        .bind(&new.private_id)
        .bind(&new.aes_key)
        .fetch_one(pool)
        .await
        .context("Failed to insert device")
    }

    /// All devices in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(pool: &PgPool) -> Result<Vec<Device>> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices ORDER BY id")
            .fetch_all(pool)
            .await
            .context("Failed to list devices")
    }

    /// Delete a device, returning the removed row if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete(pool: &PgPool, public_id: &str) -> Result<Option<Device>> {
        sqlx::query_as::<_, Device>("DELETE FROM devices WHERE public_id = $1 RETURNING *")
            .bind(public_id)
            .fetch_optional(pool)
            .await
            .context("Failed to delete device")
    }

    /// Open the single-writer validation transaction for one device.
    ///
    /// The row is read under `FOR UPDATE`, so concurrent validations of the
    /// same device serialize here while other devices proceed in parallel.
    /// The lock is held until [`DeviceLock::commit_counters`] or
    /// [`DeviceLock::release`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be opened or the query
    /// fails.
    pub async fn lock(pool: &PgPool, public_id: &str) -> Result<Option<DeviceLock>> {
        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin device transaction")?;

        let device =
            sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE public_id = $1 FOR UPDATE")
                .bind(public_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock device")?;

        match device {
            Some(device) => Ok(Some(DeviceLock { tx, device })),
            None => {
                tx.rollback()
                    .await
                    .context("Failed to close device transaction")?;
                Ok(None)
            }
        }
    }
}

/// Exclusive hold on one device row for the duration of a validation.
///
/// Exactly one of [`commit_counters`](Self::commit_counters) or
/// [`release`](Self::release) ends the hold; dropping the lock rolls the
/// transaction back as a safety net.
pub struct DeviceLock {
    tx: Transaction<'static, Postgres>,
    device: Device,
}

impl DeviceLock {
    /// The locked row as read inside the transaction.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Persist accepted counters and commit, releasing the row lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the update or the commit fails; in either case no
    /// counter change becomes visible.
    pub async fn commit_counters(mut self, session: u16, usage: u8) -> Result<()> {
        sqlx::query("UPDATE devices SET session_counter = $1, usage_counter = $2 WHERE id = $3")
            .bind(i32::from(session))
            .bind(i32::from(usage))
            .bind(self.device.id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to update device counters")?;

        self.tx
            .commit()
            .await
            .context("Failed to commit device counters")
    }

    /// Release the lock without touching state. Used on every rejection
    /// path.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn release(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .context("Failed to release device lock")
    }
}
