//! Plain-text response encoding.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use super::signature;
use super::status::ValidationStatus;

/// Accumulating response for one validation request.
///
/// Fields are emitted as CRLF-terminated `key=value` lines in ascending key
/// order. A signed reply carries an `h=` line whose signature covers the
/// remaining fields in canonical form, so the signature is never part of its
/// own input.
#[derive(Debug, Clone)]
pub struct Reply {
    params: BTreeMap<String, String>,
    key: Option<Vec<u8>>,
}

impl Reply {
    /// Start a reply stamped with the current server time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Start a reply stamped with an explicit server time.
    #[must_use]
    pub fn at(t: DateTime<Utc>) -> Self {
        let mut params = BTreeMap::new();
        params.insert("t".to_owned(), t.to_rfc3339_opts(SecondsFormat::Micros, true));
        Self { params, key: None }
    }

    /// Record a response field. Later writes to the same name win.
    pub fn set(&mut self, name: &str, value: impl ToString) {
        self.params.insert(name.to_owned(), value.to_string());
    }

    /// Record the terminal status.
    #[must_use]
    pub fn status(mut self, status: ValidationStatus) -> Self {
        self.set("status", status.as_str());
        self
    }

    /// Sign the reply with the caller's shared secret.
    #[must_use]
    pub fn signed(mut self, key: &[u8]) -> Self {
        self.key = Some(key.to_vec());
        self
    }

    /// The canonical text a response signature covers: the unescaped sorted
    /// `&`-join of every field except `h` itself.
    fn canonical(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        pairs.join("&")
    }

    /// Serialize to the wire body.
    #[must_use]
    pub fn into_body(self) -> String {
        let mut body = String::new();
        if let Some(key) = &self.key {
            body.push_str("h=");
            body.push_str(&signature::sign(&self.canonical(), key));
            body.push_str("\r\n");
        }
        for (name, value) in &self.params {
            body.push_str(name);
            body.push('=');
            body.push_str(value);
            body.push_str("\r\n");
        }
        body
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> Reply {
        Reply::at(Utc.with_ymd_and_hms(2021, 4, 9, 11, 11, 11).unwrap())
    }

    #[test]
    fn test_unsigned_body_is_sorted_crlf_lines() {
        let mut reply = fixed();
        reply.set("nonce", "fHUKs9");
        let body = reply.status(ValidationStatus::MissingParameter).into_body();
        assert_eq!(
            body,
            "nonce=fHUKs9\r\nstatus=MISSING_PARAMETER\r\nt=2021-04-09T11:11:11.000000Z\r\n"
        );
    }

    #[test]
    fn test_signed_body_prepends_signature_over_other_fields() {
        let key = b"0123456789abcdef0123";
        let mut reply = fixed();
        reply.set("nonce", "fHUKs9");
        let body = reply.status(ValidationStatus::BadOtp).signed(key).into_body();

        let mut lines = body.split("\r\n");
        let first = lines.next().unwrap();
        let signature = first.strip_prefix("h=").unwrap();

        let canonical =
            "nonce=fHUKs9&status=BAD_OTP&t=2021-04-09T11:11:11.000000Z";
        assert_eq!(signature, super::signature::sign(canonical, key));
        assert!(super::signature::verify(canonical, signature, key));
    }

    #[test]
    fn test_numeric_fields_render_in_decimal() {
        let mut reply = fixed();
        reply.set("sessionuse", 257u16);
        reply.set("sessioncounter", 3u8);
        reply.set("timestamp", 65537u32);
        reply.set("sl", 1);
        let body = reply.status(ValidationStatus::Ok).into_body();
        assert!(body.contains("sessionuse=257\r\n"));
        assert!(body.contains("sessioncounter=3\r\n"));
        assert!(body.contains("timestamp=65537\r\n"));
        assert!(body.contains("sl=1\r\n"));
        assert!(body.contains("status=OK\r\n"));
    }

    #[test]
    fn test_later_writes_win() {
        let mut reply = fixed();
        reply.set("nonce", "first");
        reply.set("nonce", "second");
        assert!(reply.status(ValidationStatus::Ok).into_body().contains("nonce=second\r\n"));
    }
}
