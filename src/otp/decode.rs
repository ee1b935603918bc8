//! Block-cipher OTP decoder.
//!
//! The 32 modhex symbols that follow a token's public ID are one AES-128
//! block encrypted with the device's key. The plaintext is a fixed layout:
//!
//! ```text
//! offset  0..6   uid        private ID, proves the key was correct
//! offset  6..8   session    u16 LE, increments per power cycle
//! offset  8..11  timestamp  24-bit LE device-internal clock
//! offset 11      usage      u8, increments per button press
//! offset 12..14  random     u16 LE
//! offset 14..16  checksum   u16 LE, CRC-16 over offsets 0..14
//! ```

use aes::Aes128;
use cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use thiserror::Error;

use crate::otp::modhex;

/// Number of modhex symbols in a full OTP token.
pub const TOKEN_LEN: usize = 44;

/// Number of modhex symbols in the public ID prefix of a token.
pub const PUBLIC_ID_LEN: usize = 12;

/// CRC-16 residual of an intact plaintext block, checksum included.
const CRC_RESIDUAL: u16 = 0xf0b8;

/// Why an OTP could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    /// The ciphertext is not a 16-byte modhex block.
    #[error("malformed token")]
    MalformedToken,
    /// The plaintext CRC does not match the embedded checksum, so the
    /// ciphertext is corrupt, forged, or encrypted under a different key.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// The device key cannot key the block cipher.
    #[error("decryption failure")]
    DecryptionFailure,
}

/// One decrypted OTP payload. Ephemeral; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Otp {
    pub uid: [u8; 6],
    pub session: u16,
    pub timestamp: u32,
    pub usage: u8,
    pub random: u16,
    pub checksum: u16,
}

/// CRC-16 as used by the OTP format: bit-reflected CCITT, polynomial
/// `0x8408`, initial value `0xffff`.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xffff;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ 0x8408
            } else {
                crc >> 1
            };
        }
    }
    crc
}

impl Otp {
    /// Decrypt and parse the 32-symbol modhex ciphertext of a token.
    ///
    /// Pure function of `(block, key)`; no side effects.
    ///
    /// # Errors
    ///
    /// [`OtpError::MalformedToken`] if `block` is not 32 modhex symbols,
    /// [`OtpError::DecryptionFailure`] if `key` is not 16 bytes, and
    /// [`OtpError::ChecksumMismatch`] if the decrypted plaintext fails its
    /// CRC.
    pub fn decrypt(block: &str, key: &[u8]) -> Result<Self, OtpError> {
        let cipher = Aes128::new_from_slice(key).map_err(|_| OtpError::DecryptionFailure)?;

        let ciphertext = modhex::decode(block).map_err(|_| OtpError::MalformedToken)?;
        let ciphertext: [u8; 16] = ciphertext
            .try_into()
            .map_err(|_| OtpError::MalformedToken)?;

        let mut plaintext = GenericArray::from(ciphertext);
        cipher.decrypt_block(&mut plaintext);

        Self::parse(&plaintext.into())
    }

    fn parse(plain: &[u8; 16]) -> Result<Self, OtpError> {
        if crc16(plain) != CRC_RESIDUAL {
            return Err(OtpError::ChecksumMismatch);
        }

        let mut uid = [0u8; 6];
        uid.copy_from_slice(&plain[..6]);

        Ok(Self {
            uid,
            session: u16::from_le_bytes([plain[6], plain[7]]),
            timestamp: u32::from(plain[8]) | u32::from(plain[9]) << 8 | u32::from(plain[10]) << 16,
            usage: plain[11],
            random: u16::from_le_bytes([plain[12], plain[13]]),
            checksum: u16::from_le_bytes([plain[14], plain[15]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::BlockEncrypt;

    const KEY: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];
    const UID: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

    // Published reference token for the key above; the 12-symbol public ID
    // prefix is already stripped.
    const REFERENCE_BLOCK: &str = "dvgtiblfkbgturecfllberrvkinnctnn";

    /// Build a valid ciphertext block for tests.
    fn forge(key: &[u8; 16], uid: [u8; 6], session: u16, timestamp: u32, usage: u8, random: u16) -> String {
        let mut plain = [0u8; 16];
        plain[..6].copy_from_slice(&uid);
        plain[6..8].copy_from_slice(&session.to_le_bytes());
        plain[8..11].copy_from_slice(&timestamp.to_le_bytes()[..3]);
        plain[11] = usage;
        plain[12..14].copy_from_slice(&random.to_le_bytes());
        let checksum = crc16(&plain[..14]) ^ 0xffff;
        plain[14..16].copy_from_slice(&checksum.to_le_bytes());

        let cipher = Aes128::new_from_slice(key).unwrap();
        let mut block = GenericArray::from(plain);
        cipher.encrypt_block(&mut block);
        modhex::encode(&block)
    }

    #[test]
    fn test_reference_vector() {
        let otp = Otp::decrypt(REFERENCE_BLOCK, &KEY).unwrap();
        assert_eq!(otp.uid, UID);
        assert_eq!(otp.session, 1);
        assert_eq!(otp.timestamp, 65537);
        assert_eq!(otp.usage, 1);
        assert_eq!(otp.random, 0);
        assert_eq!(otp.checksum, 0xfe36);
    }

    #[test]
    fn test_forged_block_matches_reference() {
        assert_eq!(forge(&KEY, UID, 1, 65537, 1, 0), REFERENCE_BLOCK);
    }

    #[test]
    fn test_decrypt_roundtrip() {
        let block = forge(&KEY, UID, 513, 0x00a0_b0c0 & 0x00ff_ffff, 7, 0xbeef);
        let otp = Otp::decrypt(&block, &KEY).unwrap();
        assert_eq!(otp.uid, UID);
        assert_eq!(otp.session, 513);
        assert_eq!(otp.timestamp, 0x00a0_b0c0);
        assert_eq!(otp.usage, 7);
        assert_eq!(otp.random, 0xbeef);
    }

    #[test]
    fn test_wrong_key_is_checksum_mismatch() {
        let mut wrong = KEY;
        wrong[15] ^= 0xff;
        assert_eq!(
            Otp::decrypt(REFERENCE_BLOCK, &wrong),
            Err(OtpError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_tampered_block_is_checksum_mismatch() {
        // Swap the first symbol for another alphabet member so the modhex
        // layer still accepts it.
        let tampered = format!("c{}", &REFERENCE_BLOCK[1..]);
        assert_ne!(tampered, REFERENCE_BLOCK);
        assert_eq!(
            Otp::decrypt(&tampered, &KEY),
            Err(OtpError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_wrong_length_is_malformed() {
        assert_eq!(Otp::decrypt("", &KEY), Err(OtpError::MalformedToken));
        assert_eq!(
            Otp::decrypt(&REFERENCE_BLOCK[..30], &KEY),
            Err(OtpError::MalformedToken)
        );
        assert_eq!(
            Otp::decrypt(&REFERENCE_BLOCK[..31], &KEY),
            Err(OtpError::MalformedToken)
        );
    }

    #[test]
    fn test_foreign_symbol_is_malformed() {
        let bad = format!("a{}", &REFERENCE_BLOCK[1..]);
        assert_eq!(Otp::decrypt(&bad, &KEY), Err(OtpError::MalformedToken));
    }

    #[test]
    fn test_short_key_is_decryption_failure() {
        assert_eq!(
            Otp::decrypt(REFERENCE_BLOCK, &KEY[..8]),
            Err(OtpError::DecryptionFailure)
        );
    }
}
