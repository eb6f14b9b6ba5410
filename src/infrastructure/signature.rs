//! Webhook signature verification.
//!
//! The vendor signs each delivery with HMAC-SHA256 over `"{timestamp}.{body}"`
//! and sends the result in a header of the form:
//!
//! ```text
//! t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! Several `v1` entries may be present while a secret is being rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "paybridge-signature";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,
    #[error("Invalid signature header format")]
    MalformedHeader,
    #[error("Timestamp outside tolerance window")]
    OutsideTolerance,
    #[error("No signature matches the payload")]
    Mismatch,
    #[error("Invalid secret key")]
    InvalidSecret,
}

/// A parsed signature header.
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" if !value.is_empty() => signatures.push(value.to_string()),
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::MalformedHeader),
    }
}

/// Hex-encoded HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a complete header value, as the vendor would send it.
pub fn signature_header(
    payload: &[u8],
    timestamp: i64,
    secret: &str,
) -> Result<String, SignatureError> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        sign_payload(payload, timestamp, secret)?
    ))
}

/// Verifies `header` against `payload` using the current time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    verify_signature_at(
        payload,
        header,
        secret,
        tolerance,
        chrono::Utc::now().timestamp(),
    )
}

pub fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    let parsed = parse_signature_header(header)?;

    if now.abs_diff(parsed.timestamp) > tolerance.as_secs() {
        return Err(SignatureError::OutsideTolerance);
    }

    let expected = sign_payload(payload, parsed.timestamp, secret)?;
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;
    const TOLERANCE: Duration = Duration::from_secs(300);

    #[test]
    fn test_parse_signature_header() {
        let parsed = parse_signature_header("t=1609459200,v1=abcdef,v1=123456").unwrap();
        assert_eq!(parsed.timestamp, 1609459200);
        assert_eq!(parsed.signatures, vec!["abcdef", "123456"]);
    }

    #[test]
    fn test_parse_signature_header_invalid() {
        assert_eq!(
            parse_signature_header("invalid"),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            parse_signature_header("t=abc,v1=ff"),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            parse_signature_header("t=1609459200"),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn test_valid_signature_verifies() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(payload, NOW, SECRET).unwrap();
        assert_eq!(
            verify_signature_at(payload, &header, SECRET, TOLERANCE, NOW + 10),
            Ok(())
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = signature_header(br#"{"amount":100}"#, NOW, SECRET).unwrap();
        assert_eq!(
            verify_signature_at(br#"{"amount":999}"#, &header, SECRET, TOLERANCE, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let header = signature_header(payload, NOW, "whsec_other").unwrap();
        assert_eq!(
            verify_signature_at(payload, &header, SECRET, TOLERANCE, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let header = signature_header(payload, NOW - 301, SECRET).unwrap();
        assert_eq!(
            verify_signature_at(payload, &header, SECRET, TOLERANCE, NOW),
            Err(SignatureError::OutsideTolerance)
        );
    }

    #[test]
    fn test_any_rolled_signature_matches() {
        let payload = b"{}";
        let good = sign_payload(payload, NOW, SECRET).unwrap();
        let header = format!("t={},v1=deadbeef,v1={}", NOW, good);
        assert!(verify_signature_at(payload, &header, SECRET, TOLERANCE, NOW).is_ok());
    }
}
