use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ring::digest;

use crate::errors::DecodeError;

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|e| DecodeError::Base64(format!("Failed to decode base64url: {e}")))
}

/// Standard (padded) base64, as used by JWS `x5c` headers and SafetyNet nonces.
pub(crate) fn base64_decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(input)
        .map_err(|e| DecodeError::Base64(format!("Failed to decode base64: {e}")))
}

pub(crate) fn base64_encode(input: &[u8]) -> String {
    STANDARD.encode(input)
}

/// SHA-256 over the concatenation of `parts`.
pub(crate) fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut ctx = digest::Context::new(&digest::SHA256);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// Big-endian integer bytes without leading zero octets, as DER and TPM
/// structures may pad them differently.
pub(crate) fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
