//! Device provisioning actions.

use anyhow::{bail, Result};

use super::connect;
use crate::store::{
    devices::DeviceRepo,
    is_unique_violation,
    models::{NewDevice, PUBLIC_ID_BYTE_LEN},
};

/// Register a device with freshly generated IDs and AES key, printing the
/// credentials once so they can be written to the hardware token.
///
/// # Errors
///
/// Returns an error if the label is invalid, already taken, or the insert
/// fails.
pub async fn add(dsn: &str, label: &str) -> Result<()> {
    let pool = connect(dsn).await?;
    let new = NewDevice::generate(label.to_owned())?;

    match DeviceRepo::create(&pool, &new).await {
        Ok(device) => {
            println!("Created: {} ({}):", device.label, device.public_id);
            println!("\tPublic ID: {}", device.public_id);
            println!("\tPrivate ID: {}", device.private_id);
            println!("\tAES key: {}", device.aes_key);
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            bail!("a device labelled {label:?} already exists")
        }
        Err(err) => Err(err),
    }
}

/// Register an already configured device.
///
/// # Errors
///
/// Returns an error if any credential is invalid or already registered, or
/// the insert fails.
pub async fn add_existing(
    dsn: &str,
    label: &str,
    public_id: &str,
    private_id: &str,
    key: &str,
) -> Result<()> {
    let pool = connect(dsn).await?;
    let new = NewDevice::new(
        label.to_owned(),
        public_id.to_owned(),
        private_id.to_owned(),
        key.to_owned(),
    )?;

    match DeviceRepo::create(&pool, &new).await {
        Ok(device) => {
            println!("Created: {} ({})", device.label, device.public_id);
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            bail!("a device with that label or ID already exists")
        }
        Err(err) => Err(err),
    }
}

/// List devices, public ID first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(dsn: &str) -> Result<()> {
    let pool = connect(dsn).await?;

    let width = 2 * PUBLIC_ID_BYTE_LEN;
    for device in DeviceRepo::list(&pool).await? {
        println!("{:<width$} {}", device.public_id, device.label);
    }

    Ok(())
}

/// Delete a device by public ID.
///
/// # Errors
///
/// Returns an error if the device does not exist or the delete fails.
pub async fn delete(dsn: &str, public_id: &str) -> Result<()> {
    let pool = connect(dsn).await?;

    match DeviceRepo::delete(&pool, public_id).await? {
        Some(device) => {
            println!("Deleted: {} ({})", device.label, device.public_id);
            Ok(())
        }
        None => bail!("device public_id={public_id} does not exist"),
    }
}
