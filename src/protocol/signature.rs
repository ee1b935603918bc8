//! Request canonicalization and HMAC-SHA1 signatures.
//!
//! Both sides of the protocol sign the same canonical text: `key=value`
//! pairs joined with `&`, sorted byte-wise. Requests sign the URL-escaped
//! form; responses sign the raw form. The canonical text must be
//! byte-for-byte reproducible or signatures stop interoperating.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Escapes everything except unreserved URL characters; space becomes `%20`.
const ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Build the canonical signing text from request or response parameters.
///
/// Pairs are sorted byte-wise by key, ties broken by value. Insertion order
/// of the input never matters.
#[must_use]
pub fn canonicalize(params: &[(String, String)], escape: bool) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_unstable();

    let pairs: Vec<String> = pairs
        .into_iter()
        .map(|(k, v)| {
            if escape {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, ESCAPE),
                    utf8_percent_encode(v, ESCAPE)
                )
            } else {
                format!("{k}={v}")
            }
        })
        .collect();

    pairs.join("&")
}

/// HMAC-SHA1 signature over the UTF-8 bytes of `text`, standard base64.
#[must_use]
pub fn sign(text: &str, key: &[u8]) -> String {
    // Hmac accepts keys of any length, so construction cannot fail.
    let mut mac = HmacSha1::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(text.as_bytes());
    Base64::encode_string(&mac.finalize().into_bytes())
}

/// Constant-time signature check. A signature that does not base64-decode is
/// simply invalid; this never fails otherwise.
#[must_use]
pub fn verify(text: &str, signature: &str, key: &[u8]) -> bool {
    let Ok(claimed) = Base64::decode_vec(signature) else {
        return false;
    };

    let mut mac = HmacSha1::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(text.as_bytes());
    mac.verify_slice(&claimed).is_ok()
}

/// Check the `h` signature of an inbound request.
///
/// A request where any parameter name occurs more than once has an ambiguous
/// signing input and is invalid, as is a request without `h`. The remaining
/// parameters are canonicalized escaped and verified against `h`.
#[must_use]
pub fn request_is_authentic(params: &[(String, String)], key: &[u8]) -> bool {
    let mut names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
    names.sort_unstable();
    if names.windows(2).any(|pair| pair[0] == pair[1]) {
        return false;
    }

    let Some(signature) = params
        .iter()
        .find(|(k, _)| k == "h")
        .map(|(_, v)| v.as_str())
    else {
        return false;
    };

    let unsigned: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "h")
        .cloned()
        .collect();

    verify(&canonicalize(&unsigned, true), signature, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Request signing example published with the protocol test vectors.
    const SECRET_B64: &str = "mG5be6ZJU1qBGz24yPh/ESM3UdU=";
    const SIGNED_TEXT: &str =
        "id=1&nonce=jrFwbaYFhn0HoxZIsd9LQ6w2ceU&otp=vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft";
    const SIGNATURE: &str = "+ja8S3IjbX593/LAgTBixwPNGX4=";

    fn secret() -> Vec<u8> {
        Base64::decode_vec(SECRET_B64).unwrap()
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_sign_reference_vector() {
        assert_eq!(sign(SIGNED_TEXT, &secret()), SIGNATURE);
    }

    #[test]
    fn test_verify_reference_vector() {
        assert!(verify(SIGNED_TEXT, SIGNATURE, &secret()));
    }

    #[test]
    fn test_verify_rejects_altered_text() {
        let altered = SIGNED_TEXT.replace("id=1", "id=2");
        assert!(!verify(&altered, SIGNATURE, &secret()));
    }

    #[test]
    fn test_verify_rejects_altered_signature() {
        let altered = SIGNATURE.replace('j', "k");
        assert!(!verify(SIGNED_TEXT, &altered, &secret()));
    }

    #[test]
    fn test_verify_rejects_undecodable_signature() {
        // Truncated base64: no padding.
        assert!(!verify(SIGNED_TEXT, &SIGNATURE[..SIGNATURE.len() - 1], &secret()));
        assert!(!verify(SIGNED_TEXT, "not base64 at all!", &secret()));
    }

    #[test]
    fn test_canonicalize_is_order_independent() {
        let forward = canonicalize(&pairs(&[("a", "2"), ("b", "1")]), false);
        let backward = canonicalize(&pairs(&[("b", "1"), ("a", "2")]), false);
        assert_eq!(forward, backward);
        assert_eq!(forward, "a=2&b=1");
    }

    #[test]
    fn test_canonicalize_escapes_values() {
        let text = canonicalize(&pairs(&[("nonce", "a b+c/d")]), true);
        assert_eq!(text, "nonce=a%20b%2Bc%2Fd");
    }

    #[test]
    fn test_canonicalize_keeps_unreserved_characters() {
        let text = canonicalize(&pairs(&[("k", "A-z_0.9~")]), true);
        assert_eq!(text, "k=A-z_0.9~");
    }

    #[test]
    fn test_request_is_authentic() {
        let params = pairs(&[
            ("id", "1"),
            ("otp", "vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft"),
            ("nonce", "jrFwbaYFhn0HoxZIsd9LQ6w2ceU"),
            ("h", SIGNATURE),
        ]);
        assert!(request_is_authentic(&params, &secret()));
    }

    #[test]
    fn test_request_with_wrong_signature_is_not_authentic() {
        let params = pairs(&[
            ("id", "2"),
            ("otp", "vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft"),
            ("nonce", "jrFwbaYFhn0HoxZIsd9LQ6w2ceU"),
            ("h", SIGNATURE),
        ]);
        assert!(!request_is_authentic(&params, &secret()));
    }

    #[test]
    fn test_request_without_signature_is_not_authentic() {
        let params = pairs(&[("id", "1"), ("otp", "x"), ("nonce", "y")]);
        assert!(!request_is_authentic(&params, &secret()));
    }

    #[test]
    fn test_request_with_duplicate_parameter_is_not_authentic() {
        let params = pairs(&[
            ("id", "1"),
            ("id", "1"),
            ("otp", "x"),
            ("nonce", "y"),
            ("h", SIGNATURE),
        ]);
        assert!(!request_is_authentic(&params, &secret()));
    }
}
