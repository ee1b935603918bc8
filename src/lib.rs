//! # Otival (YubiKey OTP Validation Server)
//!
//! `otival` validates one-time passwords emitted by YubiKey hardware tokens,
//! speaking the YubiKey Validation Server Protocol over HTTP: clients submit
//! `GET /wsapi/2.0/verify?id=…&otp=…&nonce=…&h=…` and receive a plain-text,
//! HMAC-signed `status=` response.
//!
//! ## Token validation
//!
//! A token is 44 modhex symbols: a 12-symbol public ID followed by one
//! AES-128 block encrypted with the device's key. The decrypted payload
//! carries the device's secret private ID, a two-level monotonic counter,
//! and a CRC-16 checksum. A token is accepted only when the request
//! signature verifies, the payload decrypts and checksums, the private ID
//! matches, and the counter pair is strictly greater than the last accepted
//! pair for that device.
//!
//! ## Replay protection
//!
//! The counters are the only mutable state. Each validation reads them under
//! a row-level lock and commits the update before reporting `OK`, so two
//! concurrent submissions of the same token can never both succeed.
//!
//! ## Provisioning
//!
//! Devices and API keys are managed with the `device` and `apikey` CLI
//! subcommands; secrets are generated server-side and printed exactly once.

pub mod api;
pub mod cli;
pub mod engine;
pub mod otp;
pub mod protocol;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
