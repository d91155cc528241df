use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;

use super::utils::{constant_time_eq, ensure_supported, required};
use super::{AttestationStatementValidator, AttestationType};
use crate::certificate::{AttestationCertificate, ParsedCertificate};
use crate::errors::{AttestationError, DecodeError};
use crate::registration::RegistrationObject;
use crate::statement::{AttestationFormat, AttestationStatement};
use crate::utils::{base64_decode, base64_encode, base64url_decode, sha256};

/// Subject common name of the SafetyNet attestation signing certificate.
pub const SAFETYNET_ATTESTATION_HOSTNAME: &str = "attest.android.com";

/// JWS payload of a SafetyNet attestation response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyNetPayload {
    nonce: String,
    cts_profile_match: bool,
    #[serde(default)]
    basic_integrity: bool,
    #[serde(default)]
    timestamp_ms: Option<u64>,
    #[serde(default)]
    apk_package_name: Option<String>,
}

/// Validator for `android-safetynet` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidSafetyNetValidator;

impl AndroidSafetyNetValidator {
    /// Verify the compact JWS signature with the leaf certificate of its
    /// `x5c` header and return the decoded payload.
    fn verify_response(&self, jws: &str) -> Result<SafetyNetPayload, AttestationError> {
        let parts: Vec<&str> = jws.split('.').collect();
        if parts.len() != 3 {
            return Err(AttestationError::BadAttestationStatement(
                "SafetyNet response is not a compact JWS".to_string(),
            ));
        }

        let header = jsonwebtoken::decode_header(jws).map_err(|e| {
            AttestationError::BadAttestationStatement(format!("Invalid SafetyNet JWS header: {e}"))
        })?;
        let leaf = header
            .x5c
            .as_ref()
            .and_then(|x5c| x5c.first())
            .ok_or_else(|| {
                AttestationError::BadAttestationStatement(
                    "Missing x5c in SafetyNet JWS header".to_string(),
                )
            })?;
        let leaf = base64_decode(leaf)?;
        let leaf = ParsedCertificate::from_der(&leaf)?;

        if leaf.common_name() != Some(SAFETYNET_ATTESTATION_HOSTNAME) {
            return Err(AttestationError::Certificate(format!(
                "SafetyNet certificate is not issued to {SAFETYNET_ATTESTATION_HOSTNAME}: {:?}",
                leaf.common_name()
            )));
        }

        let decoding_key = match header.alg {
            Algorithm::RS256 => DecodingKey::from_rsa_der(leaf.subject_public_key()),
            Algorithm::ES256 => DecodingKey::from_ec_der(leaf.subject_public_key()),
            other => {
                return Err(AttestationError::BadAttestationStatement(format!(
                    "Unsupported SafetyNet JWS algorithm: {other:?}"
                )));
            }
        };

        let message = format!("{}.{}", parts[0], parts[1]);
        let valid = jsonwebtoken::crypto::verify(
            parts[2],
            message.as_bytes(),
            &decoding_key,
            header.alg,
        )
        .map_err(|e| {
            AttestationError::BadSignature(format!("SafetyNet JWS verification failed: {e}"))
        })?;
        if !valid {
            return Err(AttestationError::BadSignature(
                "SafetyNet JWS signature invalid".to_string(),
            ));
        }

        let payload = base64url_decode(parts[1])?;
        let payload: SafetyNetPayload =
            serde_json::from_slice(&payload).map_err(DecodeError::from)?;
        Ok(payload)
    }
}

impl AttestationStatementValidator for AndroidSafetyNetValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::AndroidSafetyNet
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::AndroidSafetyNet(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected an android-safetynet statement".to_string(),
            ));
        };

        let ver = required(&statement.ver, "ver", self.format())?;
        let response = required(&statement.response, "response", self.format())?;
        if ver.is_empty() {
            return Err(AttestationError::BadAttestationStatement(
                "Empty ver in android-safetynet attestation".to_string(),
            ));
        }
        let jws = std::str::from_utf8(response).map_err(|e| {
            AttestationError::BadAttestationStatement(format!(
                "SafetyNet response is not UTF-8: {e}"
            ))
        })?;

        let payload = self.verify_response(jws)?;
        tracing::debug!(
            "SafetyNet payload: package {:?}, timestamp {:?}, basicIntegrity {}",
            payload.apk_package_name,
            payload.timestamp_ms,
            payload.basic_integrity
        );

        let expected_nonce = base64_encode(&sha256(&[
            registration.authenticator_data_bytes(),
            registration.client_data_hash().as_bytes(),
        ]));
        if !constant_time_eq(payload.nonce.as_bytes(), expected_nonce.as_bytes()) {
            return Err(AttestationError::KeyDescriptionValidation(
                "SafetyNet nonce does not match authenticator data and client data hash"
                    .to_string(),
            ));
        }

        if !payload.cts_profile_match {
            return Err(AttestationError::BadAttestationStatement(
                "SafetyNet ctsProfileMatch is false".to_string(),
            ));
        }

        Ok(AttestationType::Basic)
    }
}
