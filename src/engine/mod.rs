//! The per-request validation engine.
//!
//! Each request runs a fixed pipeline, short-circuiting at the first
//! failure: parameter checks, signature check, token shape check, device
//! lookup under a row lock, OTP decode, identity check, replay check,
//! counter update. Every request ends in exactly one terminal status, and
//! `OK` is only ever emitted after the counter update has committed.
//!
//! Replies accumulate fields as they become known, so a rejection still
//! echoes everything computed strictly before the failing step. Replies are
//! unsigned until an API key has been resolved.

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use crate::otp::{Otp, PUBLIC_ID_LEN, TOKEN_LEN};
use crate::protocol::{signature, Reply, ValidationStatus};
use crate::store::apikeys::ApiKeyRepo;
use crate::store::devices::DeviceRepo;
use crate::store::models::Device;

/// First value of a query parameter, if present.
fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Outcome of the storage-free opening stages.
enum Preflight {
    Reject(Reply),
    Proceed {
        key_id: i64,
        token: String,
        reply: Reply,
    },
}

/// Steps 1-3a: required parameters, nonce hygiene, numeric client id.
///
/// The nonce is echoed into the signed response body, so a nonce carrying
/// CR or LF is rejected before it is ever recorded.
fn preflight(params: &[(String, String)]) -> Preflight {
    let reply = Reply::new();

    let (Some(id), Some(token), Some(nonce)) = (
        param(params, "id"),
        param(params, "otp"),
        param(params, "nonce"),
    ) else {
        return Preflight::Reject(reply.status(ValidationStatus::MissingParameter));
    };

    if nonce.contains(['\r', '\n']) {
        return Preflight::Reject(reply.status(ValidationStatus::MissingParameter));
    }

    let mut reply = reply;
    reply.set("nonce", nonce);

    let Ok(key_id) = id.parse::<i64>() else {
        return Preflight::Reject(reply.status(ValidationStatus::NoSuchClient));
    };

    Preflight::Proceed {
        key_id,
        token: token.to_owned(),
        reply,
    }
}

/// Token shape: exactly [`TOKEN_LEN`] ASCII symbols, no CR or LF.
fn token_shape_ok(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.is_ascii() && !token.contains(['\r', '\n'])
}

/// Two-level counter ordering: a decoded pair is fresh only if strictly
/// greater than the stored pair, session major, usage minor.
const fn is_replay(stored_session: i32, stored_usage: i32, session: u16, usage: u8) -> bool {
    let session = session as i32;
    let usage = usage as i32;
    session < stored_session || (session == stored_session && usage <= stored_usage)
}

/// Judgement of a decoded OTP against the locked device row.
#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    /// The decrypted private ID is not this device's: a forgery or a key mixup.
    Mismatch,
    Replayed,
    Fresh,
}

fn judge(device: &Device, otp: &Otp) -> Verdict {
    if hex::encode(otp.uid) != device.private_id {
        return Verdict::Mismatch;
    }

    if is_replay(
        device.session_counter,
        device.usage_counter,
        otp.session,
        otp.usage,
    ) {
        Verdict::Replayed
    } else {
        Verdict::Fresh
    }
}

/// Run one validation request to its terminal status.
///
/// # Errors
///
/// Returns an error only on storage failures (pool, lock, commit); the
/// caller must surface those as a transport-level failure, never as a
/// protocol status.
#[instrument(skip_all)]
pub async fn validate(pool: &PgPool, params: &[(String, String)]) -> Result<Reply> {
    let (key_id, token, mut reply) = match preflight(params) {
        Preflight::Reject(reply) => return Ok(reply),
        Preflight::Proceed {
            key_id,
            token,
            reply,
        } => (key_id, token, reply),
    };

    let Some(api_key) = ApiKeyRepo::get(pool, key_id).await? else {
        debug!(key_id, "unknown API key");
        return Ok(reply.status(ValidationStatus::NoSuchClient));
    };
    let secret = api_key.secret_bytes()?;

    if !signature::request_is_authentic(params, &secret) {
        debug!(key_id, "request signature did not verify");
        return Ok(reply.status(ValidationStatus::BadSignature).signed(&secret));
    }

    if !token_shape_ok(&token) {
        return Ok(reply.status(ValidationStatus::BadOtp).signed(&secret));
    }
    reply.set("otp", &token);

    let public_id = &token[..PUBLIC_ID_LEN];
    let Some(lock) = DeviceRepo::lock(pool, public_id).await? else {
        debug!(public_id, "unknown device");
        return Ok(reply.status(ValidationStatus::BadOtp).signed(&secret));
    };

    let cipher_key = match lock.device().cipher_key() {
        Ok(key) => key,
        Err(err) => {
            lock.release().await?;
            return Err(err);
        }
    };

    let otp = match Otp::decrypt(&token[PUBLIC_ID_LEN..], &cipher_key) {
        Ok(otp) => otp,
        Err(err) => {
            debug!(public_id, %err, "undecodable OTP");
            lock.release().await?;
            return Ok(reply.status(ValidationStatus::BadOtp).signed(&secret));
        }
    };

    reply.set("sessionuse", otp.session);
    reply.set("sessioncounter", otp.usage);
    reply.set("timestamp", otp.timestamp);

    match judge(lock.device(), &otp) {
        Verdict::Mismatch => {
            debug!(public_id, "private ID mismatch");
            lock.release().await?;
            Ok(reply.status(ValidationStatus::BadOtp).signed(&secret))
        }
        Verdict::Replayed => {
            warn!(public_id, "replayed OTP rejected");
            lock.release().await?;
            Ok(reply.status(ValidationStatus::ReplayedOtp).signed(&secret))
        }
        Verdict::Fresh => {
            lock.commit_counters(otp.session, otp.usage).await?;
            reply.set("sl", 1);
            Ok(reply.status(ValidationStatus::Ok).signed(&secret))
        }
    }
}
