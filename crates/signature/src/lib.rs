//! Inbound signature verification.
//!
//! Three versioned HMAC schemes, selected by the caller from the
//! `X-Hubspot-Signature-Version` header. All comparisons are constant-time
//! via `subtle`; none of the verify functions short-circuit on a mismatched
//! prefix.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVersion {
    V1,
    V2,
    V3,
}

impl SignatureVersion {
    pub fn parse(header_value: &str) -> Option<Self> {
        match header_value {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            "v3" => Some(Self::V3),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("unsupported signature version: {0}")]
    UnsupportedVersion(String),
    #[error("v3 signatures require a request timestamp header")]
    MissingTimestamp,
    #[error("signature is not validly encoded")]
    InvalidEncoding,
    #[error("signature does not match")]
    Mismatch,
    #[error("request timestamp is outside the {TIMESTAMP_WINDOW_SECS}s window")]
    StaleTimestamp,
}

/// The pieces of an inbound request relevant to signature verification.
///
/// `full_uri` must be the externally-visible absolute URL of the
/// deployment (scheme+host+path+query) as configured server-side — never
/// derived from the inbound `Host` header, which is attacker-controlled.
/// `body` must be the raw bytes the HTTP layer received, read before any
/// JSON parsing.
pub struct VerifyRequest<'a> {
    pub method: &'a str,
    pub full_uri: &'a str,
    pub body: &'a [u8],
    pub signature: &'a str,
    pub timestamp_ms: Option<i64>,
}

/// Verify an inbound request's signature against `client_secret`.
///
/// `now_ms` is passed in by the caller (rather than read from the clock
/// here) so verification stays a pure, independently testable function.
pub fn verify(
    version: SignatureVersion,
    client_secret: &[u8],
    req: &VerifyRequest<'_>,
    now_ms: i64,
) -> Result<(), SignatureError> {
    if req.signature.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    match version {
        SignatureVersion::V1 => verify_v1(client_secret, req),
        SignatureVersion::V2 => verify_v2(client_secret, req),
        SignatureVersion::V3 => verify_v3(client_secret, req, now_ms),
    }
}

fn verify_v1(client_secret: &[u8], req: &VerifyRequest<'_>) -> Result<(), SignatureError> {
    let mut hasher = Sha256::new();
    hasher.update(client_secret);
    hasher.update(req.body);
    let expected = hex::encode(hasher.finalize());
    hex_ct_eq(&expected, req.signature)
}

fn verify_v2(client_secret: &[u8], req: &VerifyRequest<'_>) -> Result<(), SignatureError> {
    let mut hasher = Sha256::new();
    hasher.update(client_secret);
    hasher.update(req.method.as_bytes());
    hasher.update(req.full_uri.as_bytes());
    hasher.update(req.body);
    let expected = hex::encode(hasher.finalize());
    hex_ct_eq(&expected, req.signature)
}

fn verify_v3(
    client_secret: &[u8],
    req: &VerifyRequest<'_>,
    now_ms: i64,
) -> Result<(), SignatureError> {
    let timestamp_ms = req.timestamp_ms.ok_or(SignatureError::MissingTimestamp)?;

    let delta_ms = (now_ms - timestamp_ms).abs();
    if delta_ms > TIMESTAMP_WINDOW_SECS * 1000 {
        return Err(SignatureError::StaleTimestamp);
    }

    let mut mac = HmacSha256::new_from_slice(client_secret)
        .expect("HMAC accepts a key of any length");
    mac.update(req.method.as_bytes());
    mac.update(req.full_uri.as_bytes());
    mac.update(req.body);
    mac.update(timestamp_ms.to_string().as_bytes());
    let expected = base64_standard_encode(&mac.finalize().into_bytes());

    base64_ct_eq(&expected, req.signature)
}

fn hex_ct_eq(expected: &str, actual: &str) -> Result<(), SignatureError> {
    let actual_bytes = actual.as_bytes();
    let expected_bytes = expected.as_bytes();
    if expected_bytes.len() != actual_bytes.len() {
        return Err(SignatureError::Mismatch);
    }
    if expected_bytes.ct_eq(actual_bytes).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn base64_ct_eq(expected: &str, actual: &str) -> Result<(), SignatureError> {
    use base64::Engine;
    let actual_decoded = base64::engine::general_purpose::STANDARD
        .decode(actual)
        .map_err(|_| SignatureError::InvalidEncoding)?;
    let expected_decoded = base64::engine::general_purpose::STANDARD
        .decode(expected)
        .map_err(|_| SignatureError::InvalidEncoding)?;
    if expected_decoded.len() != actual_decoded.len() {
        return Err(SignatureError::Mismatch);
    }
    if expected_decoded.ct_eq(&actual_decoded).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn base64_standard_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"client-secret";

    fn v1_signature(secret: &[u8], body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(body);
        hex::encode(hasher.finalize())
    }

    fn v2_signature(secret: &[u8], method: &str, uri: &str, body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(method.as_bytes());
        hasher.update(uri.as_bytes());
        hasher.update(body);
        hex::encode(hasher.finalize())
    }

    fn v3_signature(secret: &[u8], method: &str, uri: &str, body: &[u8], ts: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(method.as_bytes());
        mac.update(uri.as_bytes());
        mac.update(body);
        mac.update(ts.to_string().as_bytes());
        base64_standard_encode(&mac.finalize().into_bytes())
    }

    #[test]
    fn v1_accepts_valid_signature() {
        let body = br#"{"n":"Ada"}"#;
        let sig = v1_signature(SECRET, body);
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/v1/actions/webhook",
            body,
            signature: &sig,
            timestamp_ms: None,
        };
        assert!(verify(SignatureVersion::V1, SECRET, &req, 0).is_ok());
    }

    #[test]
    fn v1_rejects_single_bit_flip_in_body() {
        let body = br#"{"n":"Ada"}"#;
        let sig = v1_signature(SECRET, body);
        let tampered = br#"{"n":"Adb"}"#;
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/v1/actions/webhook",
            body: tampered,
            signature: &sig,
            timestamp_ms: None,
        };
        assert_eq!(
            verify(SignatureVersion::V1, SECRET, &req, 0),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn v2_is_sensitive_to_method_and_uri() {
        let body = b"{}";
        let sig = v2_signature(SECRET, "POST", "https://ax.example/webhook", body);
        let req_wrong_method = VerifyRequest {
            method: "GET",
            full_uri: "https://ax.example/webhook",
            body,
            signature: &sig,
            timestamp_ms: None,
        };
        assert_eq!(
            verify(SignatureVersion::V2, SECRET, &req_wrong_method, 0),
            Err(SignatureError::Mismatch)
        );

        let req_wrong_uri = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/other",
            body,
            signature: &sig,
            timestamp_ms: None,
        };
        assert_eq!(
            verify(SignatureVersion::V2, SECRET, &req_wrong_uri, 0),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn v3_accepts_within_window() {
        let body = b"{}";
        let ts = 1_000_000_000_000i64;
        let sig = v3_signature(SECRET, "POST", "https://ax.example/webhook", body, ts);
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/webhook",
            body,
            signature: &sig,
            timestamp_ms: Some(ts),
        };
        let now = ts + 299_000;
        assert!(verify(SignatureVersion::V3, SECRET, &req, now).is_ok());
    }

    #[test]
    fn v3_rejects_stale_timestamp_even_with_valid_signature() {
        let body = b"{}";
        let ts = 1_000_000_000_000i64;
        let sig = v3_signature(SECRET, "POST", "https://ax.example/webhook", body, ts);
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/webhook",
            body,
            signature: &sig,
            timestamp_ms: Some(ts),
        };
        let now = ts + 301_000;
        assert_eq!(
            verify(SignatureVersion::V3, SECRET, &req, now),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn v3_rejects_timestamp_a_fraction_of_a_second_past_the_window() {
        let body = b"{}";
        let ts = 1_000_000_000_000i64;
        let sig = v3_signature(SECRET, "POST", "https://ax.example/webhook", body, ts);
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/webhook",
            body,
            signature: &sig,
            timestamp_ms: Some(ts),
        };
        // 300.999s stale: truncating to whole seconds before comparing
        // would let this slip through as "300s", which is within bounds.
        let now = ts + 300_999;
        assert_eq!(
            verify(SignatureVersion::V3, SECRET, &req, now),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn v3_rejects_missing_timestamp() {
        let body = b"{}";
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/webhook",
            body,
            signature: "irrelevant",
            timestamp_ms: None,
        };
        assert_eq!(
            verify(SignatureVersion::V3, SECRET, &req, 0),
            Err(SignatureError::MissingTimestamp)
        );
    }

    #[test]
    fn v3_rejects_wrong_key() {
        let body = b"{}";
        let ts = 1_000_000_000_000i64;
        let sig = v3_signature(b"other-secret", "POST", "https://ax.example/webhook", body, ts);
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/webhook",
            body,
            signature: &sig,
            timestamp_ms: Some(ts),
        };
        assert_eq!(
            verify(SignatureVersion::V3, SECRET, &req, ts),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn empty_signature_is_rejected_outright() {
        let req = VerifyRequest {
            method: "POST",
            full_uri: "https://ax.example/webhook",
            body: b"{}",
            signature: "",
            timestamp_ms: None,
        };
        assert_eq!(
            verify(SignatureVersion::V1, SECRET, &req, 0),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn unrecognized_version_header_fails_to_parse() {
        assert!(SignatureVersion::parse("v4").is_none());
        assert!(SignatureVersion::parse("v1").is_some());
    }
}
