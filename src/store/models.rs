//! Credential records and their validation rules.
//!
//! Every credential is validated at construction time, before it reaches the
//! database: lengths and character sets here, uniqueness by the schema. The
//! validation engine only ever reads these records; counters are written
//! through [`super::devices::DeviceLock`].

use std::fmt;

use anyhow::{bail, Result};
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::otp::modhex;

/// Raw secret length of an API key before base64 encoding.
pub const API_SECRET_BYTE_LEN: usize = 20;

/// Byte length of a device public ID (modhex-encoded when stored).
pub const PUBLIC_ID_BYTE_LEN: usize = 6;

/// Byte length of a device private ID (hex-encoded when stored).
pub const PRIVATE_ID_BYTE_LEN: usize = 6;

/// Byte length of a device AES key (hex-encoded when stored).
pub const AES_KEY_BYTE_LEN: usize = 16;

const LABEL_MAX_LEN: usize = 64;

/// True when `value` is exactly `len` modhex symbols.
#[must_use]
pub fn valid_modhex(value: &str, len: usize) -> bool {
    value.len() == len
        && Regex::new("^[cbdefghijklnrtuv]+$").map_or(false, |re| re.is_match(value))
}

/// True when `value` is exactly `len` hexadecimal symbols.
#[must_use]
pub fn valid_hex(value: &str, len: usize) -> bool {
    value.len() == len && Regex::new("^[0-9a-fA-F]+$").map_or(false, |re| re.is_match(value))
}

fn valid_label(value: &str) -> bool {
    !value.is_empty() && value.len() <= LABEL_MAX_LEN
}

/// An API consumer holding a shared HMAC secret. Read-only to the engine.
#[derive(Clone)]
pub struct ApiKey {
    pub id: i64,
    pub label: String,
    /// Base64 of [`API_SECRET_BYTE_LEN`] random bytes.
    pub secret: SecretString,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// The raw HMAC secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored secret is not valid base64.
    pub fn secret_bytes(&self) -> Result<Vec<u8>> {
        match Base64::decode_vec(self.secret.expose_secret()) {
            Ok(bytes) => Ok(bytes),
            Err(err) => bail!("stored API key secret is not base64: {err}"),
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("secret", &"***")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl<'r> FromRow<'r, PgRow> for ApiKey {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            label: row.try_get("label")?,
            secret: SecretString::from(row.try_get::<String, _>("secret")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One provisioned hardware token with its replay-prevention counters.
#[derive(Debug, Clone, FromRow)]
pub struct Device {
    pub id: i64,
    pub label: String,
    /// 12 modhex symbols, prefixed to every token this device emits.
    pub public_id: String,
    /// 12 hex symbols, embedded in the encrypted payload as identity proof.
    pub private_id: String,
    /// 32 hex symbols.
    pub aes_key: String,
    /// Last accepted session counter, 0..=32767.
    pub session_counter: i32,
    /// Last accepted usage counter, 0..=255.
    pub usage_counter: i32,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// The raw AES key.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored key is not hex.
    pub fn cipher_key(&self) -> Result<Vec<u8>> {
        Ok(hex::decode(&self.aes_key)?)
    }
}

/// A validated API key ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub label: String,
    pub secret: String,
}

impl NewApiKey {
    /// Generate a key with a fresh random secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is empty or too long.
    pub fn generate(label: String) -> Result<Self> {
        if !valid_label(&label) {
            bail!("label must be 1 to {LABEL_MAX_LEN} characters");
        }

        let mut raw = [0u8; API_SECRET_BYTE_LEN];
        OsRng.fill_bytes(&mut raw);

        Ok(Self {
            label,
            secret: Base64::encode_string(&raw),
        })
    }
}

/// A validated device ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub label: String,
    pub public_id: String,
    pub private_id: String,
    pub aes_key: String,
}

impl NewDevice {
    /// Validate caller-supplied device credentials.
    ///
    /// Hex identifiers are normalized to lowercase so that the engine's
    /// identity comparison works regardless of how they were typed.
    ///
    /// # Errors
    ///
    /// Returns an error on any length or character-set violation.
    pub fn new(
        label: String,
        public_id: String,
        private_id: String,
        aes_key: String,
    ) -> Result<Self> {
        if !valid_label(&label) {
            bail!("label must be 1 to {LABEL_MAX_LEN} characters");
        }
        if !valid_modhex(&public_id, 2 * PUBLIC_ID_BYTE_LEN) {
            bail!(
                "public id must be {} modhex characters",
                2 * PUBLIC_ID_BYTE_LEN
            );
        }
        if !valid_hex(&private_id, 2 * PRIVATE_ID_BYTE_LEN) {
            bail!(
                "private id must be {} hexadecimal characters",
                2 * PRIVATE_ID_BYTE_LEN
            );
        }
        if !valid_hex(&aes_key, 2 * AES_KEY_BYTE_LEN) {
            bail!(
                "AES key must be {} hexadecimal characters",
                2 * AES_KEY_BYTE_LEN
            );
        }

        Ok(Self {
            label,
            public_id,
            private_id: private_id.to_lowercase(),
            aes_key: aes_key.to_lowercase(),
        })
    }

    /// Generate a device with fresh random identifiers and key.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is empty or too long.
    pub fn generate(label: String) -> Result<Self> {
        let mut public_id = [0u8; PUBLIC_ID_BYTE_LEN];
        OsRng.fill_bytes(&mut public_id);
        let mut private_id = [0u8; PRIVATE_ID_BYTE_LEN];
        OsRng.fill_bytes(&mut private_id);
        let mut aes_key = [0u8; AES_KEY_BYTE_LEN];
        OsRng.fill_bytes(&mut aes_key);

        Self::new(
            label,
            modhex::encode(&public_id),
            hex::encode(private_id),
            hex::encode(aes_key),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_modhex() {
        assert!(valid_modhex("cdcdcdcdcdcd", 12));
        assert!(!valid_modhex("cdcdcdcdcdc", 12));
        assert!(!valid_modhex("cdcdcdcdcdca", 12));
        assert!(!valid_modhex("CDCDCDCDCDCD", 12));
    }

    #[test]
    fn test_valid_hex() {
        assert!(valid_hex("0123456789ab", 12));
        assert!(valid_hex("0123456789AB", 12));
        assert!(!valid_hex("0123456789ag", 12));
        assert!(!valid_hex("0123456789ab", 10));
    }

    #[test]
    fn test_new_device_validates_fields() {
        assert!(NewDevice::new(
            "desk key".into(),
            "cdcdcdcdcdcd".into(),
            "010203040506".into(),
            "000102030405060708090a0b0c0d0e0f".into(),
        )
        .is_ok());

        assert!(NewDevice::new(
            String::new(),
            "cdcdcdcdcdcd".into(),
            "010203040506".into(),
            "000102030405060708090a0b0c0d0e0f".into(),
        )
        .is_err());

        assert!(NewDevice::new(
            "desk key".into(),
            "abcdefabcdef".into(), // not modhex
            "010203040506".into(),
            "000102030405060708090a0b0c0d0e0f".into(),
        )
        .is_err());

        assert!(NewDevice::new(
            "desk key".into(),
            "cdcdcdcdcdcd".into(),
            "01020304050g".into(), // not hex
            "000102030405060708090a0b0c0d0e0f".into(),
        )
        .is_err());

        assert!(NewDevice::new(
            "desk key".into(),
            "cdcdcdcdcdcd".into(),
            "010203040506".into(),
            "000102030405".into(), // too short
        )
        .is_err());
    }

    #[test]
    fn test_new_device_normalizes_hex_to_lowercase() {
        let device = NewDevice::new(
            "desk key".into(),
            "cdcdcdcdcdcd".into(),
            "0102030405AB".into(),
            "000102030405060708090A0B0C0D0E0F".into(),
        )
        .unwrap();
        assert_eq!(device.private_id, "0102030405ab");
        assert_eq!(device.aes_key, "000102030405060708090a0b0c0d0e0f");
    }

    #[test]
    fn test_generated_device_is_well_formed() {
        let device = NewDevice::generate("desk key".into()).unwrap();
        assert!(valid_modhex(&device.public_id, 2 * PUBLIC_ID_BYTE_LEN));
        assert!(valid_hex(&device.private_id, 2 * PRIVATE_ID_BYTE_LEN));
        assert!(valid_hex(&device.aes_key, 2 * AES_KEY_BYTE_LEN));
    }

    #[test]
    fn test_generated_api_key_is_well_formed() {
        let key = NewApiKey::generate("monitoring".into()).unwrap();
        assert_eq!(key.secret.len(), 28);
        assert!(Base64::decode_vec(&key.secret).unwrap().len() == API_SECRET_BYTE_LEN);
    }

    #[test]
    fn test_api_key_debug_redacts_secret() {
        let key = ApiKey {
            id: 1,
            label: "monitoring".into(),
            secret: SecretString::from("mG5be6ZJU1qBGz24yPh/ESM3UdU=".to_owned()),
            created_at: Utc::now(),
        };
        let debug = format!("{key:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("mG5be6ZJU1qBGz24yPh"));
    }

    #[test]
    fn test_api_key_secret_bytes() {
        let key = ApiKey {
            id: 1,
            label: "monitoring".into(),
            secret: SecretString::from("mG5be6ZJU1qBGz24yPh/ESM3UdU=".to_owned()),
            created_at: Utc::now(),
        };
        assert_eq!(key.secret_bytes().unwrap().len(), API_SECRET_BYTE_LEN);

        let broken = ApiKey {
            secret: SecretString::from("!!!".to_owned()),
            ..key
        };
        assert!(broken.secret_bytes().is_err());
    }
}
