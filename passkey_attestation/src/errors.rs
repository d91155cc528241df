use thiserror::Error;

/// Errors that can occur while validating an attestation statement.
///
/// Every check fails fast with one of these variants. Callers are expected to
/// reject the whole registration ceremony on any error; there is no partial
/// success.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// A validator or accessor was called with input it does not support
    /// (e.g. a statement of another format)
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Raw bytes could not be decoded into the expected structure
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A required statement field (certificate chain, signature, ...) is absent
    /// or structurally unusable
    #[error("Bad attestation statement: {0}")]
    BadAttestationStatement(String),

    /// The nonce or challenge bound into the attestation certificate does not
    /// match this ceremony
    #[error("Key description validation failed: {0}")]
    KeyDescriptionValidation(String),

    /// The signature counter violates the format's expectations
    #[error("Malicious counter value: {0}")]
    MaliciousCounterValue(String),

    /// The attested AAGUID is not acceptable for the format
    #[error("Bad AAGUID: {0}")]
    BadAaguid(String),

    /// A signature over the attested data did not verify
    #[error("Bad signature: {0}")]
    BadSignature(String),

    /// The credential public key differs from the key the statement attests
    #[error("Public key mismatch: {0}")]
    PublicKeyMismatch(String),

    /// The attestation certificate does not meet the format's requirements
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// The authenticator data is malformed or inconsistent with its flags
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// The validator set is misconfigured (no validator or several validators
    /// claim the same format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from an extension's own consistency check
    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),
}

/// Low-level decoding failures, always wrapped by [`AttestationError::Decode`]
/// when they surface from statement validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("ASN.1 decode error: {0}")]
    Asn1(String),

    #[error("CBOR decode error: {0}")]
    Cbor(String),

    #[error("Base64 decode error: {0}")]
    Base64(String),

    #[error("JSON decode error: {0}")]
    Json(String),
}

/// Errors raised by extension inputs and outputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// The requested key does not belong to the extension
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The extension's internal state is inconsistent
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e.to_string())
    }
}
