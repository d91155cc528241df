use super::utils::{check_certificate_aaguid, end_entity_certificate, ensure_supported, required};
use super::{AttestationStatementValidator, AttestationType};
use crate::authenticator::CoseAlgorithm;
use crate::certificate::ParsedCertificate;
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::{AttestationFormat, AttestationStatement, PackedStatement};

/// Validator for `packed` statements (security keys).
///
/// With `x5c` the statement is a basic attestation signed by the attestation
/// certificate; without it the credential key signs for itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedValidator;

impl PackedValidator {
    fn verify_full_attestation(
        &self,
        statement: &PackedStatement,
        alg: CoseAlgorithm,
        sig: &[u8],
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        tracing::debug!("Full attestation with certificate chain");
        let attestn_cert = end_entity_certificate(&statement.x5c, self.format())?;
        let attestn_cert = ParsedCertificate::from_der(attestn_cert)?;

        attestn_cert.verify_signature(alg, &registration.signed_data(), sig)?;

        if !attestn_cert.is_v3() {
            return Err(AttestationError::Certificate(
                "Packed attestation certificate must be X.509 version 3".to_string(),
            ));
        }
        if attestn_cert.is_ca() {
            return Err(AttestationError::Certificate(
                "Packed attestation certificate must not be a CA certificate".to_string(),
            ));
        }
        check_certificate_aaguid(&attestn_cert, registration.attested_credential_data()?)?;

        Ok(AttestationType::Basic)
    }

    fn verify_self_attestation(
        &self,
        alg: CoseAlgorithm,
        sig: &[u8],
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        tracing::debug!("Self attestation");
        let credential_key = registration
            .attested_credential_data()?
            .credential_public_key();

        if credential_key.algorithm() != alg {
            return Err(AttestationError::BadAttestationStatement(format!(
                "Self attestation algorithm {:?} does not match credential key algorithm {:?}",
                alg,
                credential_key.algorithm()
            )));
        }
        credential_key.verify(&registration.signed_data(), sig)?;

        Ok(AttestationType::SelfAttestation)
    }
}

impl AttestationStatementValidator for PackedValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Packed
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::Packed(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected a packed statement".to_string(),
            ));
        };

        let alg = *required(&statement.alg, "alg", self.format())?;
        let sig = required(&statement.sig, "sig", self.format())?;

        match (&statement.x5c, &statement.ecdaa_key_id) {
            (Some(_), None) => self.verify_full_attestation(statement, alg, sig, registration),
            (None, None) => self.verify_self_attestation(alg, sig, registration),
            (None, Some(_)) => Err(AttestationError::BadAttestationStatement(
                "ECDAA attestation is not supported".to_string(),
            )),
            (Some(_), Some(_)) => Err(AttestationError::BadAttestationStatement(
                "Invalid attestation: both x5c and ecdaaKeyId present".to_string(),
            )),
        }
    }
}
