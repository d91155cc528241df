use super::apple_app_attest::APPLE_CRED_CERT_EXTENSION_OID;
use super::utils::{
    constant_time_eq, end_entity_certificate, ensure_supported, extract_certificate_nonce,
};
use super::{AttestationStatementValidator, AttestationType};
use crate::certificate::{AttestationCertificate, ParsedCertificate};
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::{AttestationFormat, AttestationStatement};
use crate::utils::sha256;

/// Validator for Apple anonymous (`apple`) statements issued to WebAuthn
/// credentials on Apple platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleAnonymousValidator;

impl AttestationStatementValidator for AppleAnonymousValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Apple
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::Apple(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected an apple statement".to_string(),
            ));
        };

        let cred_cert = end_entity_certificate(&statement.x5c, self.format())?;
        let cred_cert = ParsedCertificate::from_der(cred_cert)?;

        let nonce = extract_certificate_nonce(&cred_cert, APPLE_CRED_CERT_EXTENSION_OID)?;
        let expected = sha256(&[
            registration.authenticator_data_bytes(),
            registration.client_data_hash().as_bytes(),
        ]);
        if !constant_time_eq(&nonce, &expected) {
            return Err(AttestationError::BadAttestationStatement(
                "Apple attestation nonce does not match authenticator data and client data hash"
                    .to_string(),
            ));
        }

        let credential_key = registration
            .attested_credential_data()?
            .credential_public_key();
        if !credential_key.matches_subject_public_key(cred_cert.subject_public_key()) {
            return Err(AttestationError::PublicKeyMismatch(
                "Credential public key does not match the Apple credential certificate"
                    .to_string(),
            ));
        }

        Ok(AttestationType::AnonCa)
    }
}
