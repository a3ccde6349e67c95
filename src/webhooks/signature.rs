//! HMAC-SHA256 webhook signatures.
//!
//! Signatures are computed over the exact bytes sent on the wire and
//! hex-encoded (lowercase). Verification compares in constant time.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Hex length of an HMAC-SHA256 digest.
pub const SIGNATURE_HEX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature missing")]
    Missing,

    #[error("signature length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

fn mac(payload: &[u8], secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac
}

/// Sign a payload, returning the lowercase hex digest.
pub fn sign(payload: &[u8], secret: &str) -> String {
    hex::encode(mac(payload, secret).finalize().into_bytes())
}

/// Verify a hex signature against a payload.
///
/// Returns `Ok(false)` for any well-formed but wrong signature. An empty
/// signature or one of the wrong length is an error.
pub fn verify(payload: &[u8], signature: &str, secret: &str) -> Result<bool, SignatureError> {
    if signature.is_empty() {
        return Err(SignatureError::Missing);
    }

    let expected = sign(payload, secret);
    if signature.len() != expected.len() {
        return Err(SignatureError::LengthMismatch {
            expected: expected.len(),
            actual: signature.len(),
        });
    }

    Ok(expected.as_bytes().ct_eq(signature.as_bytes()).into())
}

/// Verify the `X-Webhook-Signature` header of an inbound request body.
pub fn verify_headers(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<bool, SignatureError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    verify(body, signature, secret)
}
