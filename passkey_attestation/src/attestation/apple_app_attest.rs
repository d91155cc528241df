use super::utils::{
    constant_time_eq, end_entity_certificate, ensure_supported, extract_certificate_nonce,
};
use super::{AttestationStatementValidator, AttestationType};
use crate::authenticator::Aaguid;
use crate::certificate::ParsedCertificate;
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::{AppleAppAttestStatement, AttestationFormat, AttestationStatement};
use crate::utils::sha256;

/// Extension of the App Attest credential certificate carrying the nonce.
pub const APPLE_CRED_CERT_EXTENSION_OID: &str = "1.2.840.113635.100.8.2";

/// Validator for Apple App Attest (`apple-appattest`) statements.
///
/// Checks run in a fixed order: nonce, then counter, then AAGUID. A forged
/// nonce is always reported before anything about the device environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleAppAttestValidator;

impl AppleAppAttestValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_nonce(
        &self,
        statement: &AppleAppAttestStatement,
        registration: &RegistrationObject<'_>,
    ) -> Result<(), AttestationError> {
        let cred_cert = end_entity_certificate(&statement.x5c, self.format())?;
        let cred_cert = ParsedCertificate::from_der(cred_cert)?;

        let actual = extract_certificate_nonce(&cred_cert, APPLE_CRED_CERT_EXTENSION_OID)?;
        let expected = sha256(&[
            registration.authenticator_data_bytes(),
            registration.client_data_hash().as_bytes(),
        ]);

        if !constant_time_eq(&actual, &expected) {
            tracing::debug!("App Attest nonce: {actual:02x?}, expected: {expected:02x?}");
            return Err(AttestationError::KeyDescriptionValidation(
                "App Attest nonce does not match authenticator data and client data hash"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn validate_authenticator_data(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<(), AttestationError> {
        let authenticator_data = registration.authenticator_data();
        if authenticator_data.sign_count() != 0 {
            return Err(AttestationError::MaliciousCounterValue(format!(
                "App Attest counter must be 0 at registration, got {}",
                authenticator_data.sign_count()
            )));
        }

        let aaguid = registration.attested_credential_data()?.aaguid();
        if *aaguid != Aaguid::APP_ATTEST_DEVELOPMENT && *aaguid != Aaguid::APP_ATTEST_PRODUCTION {
            return Err(AttestationError::BadAaguid(format!(
                "Unrecognized App Attest environment AAGUID: {aaguid}"
            )));
        }
        tracing::debug!("App Attest environment AAGUID: {:?}", aaguid.as_bytes());
        Ok(())
    }
}

impl AttestationStatementValidator for AppleAppAttestValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::AppleAppAttest
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::AppleAppAttest(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected an apple-appattest statement".to_string(),
            ));
        };

        self.validate_nonce(statement, registration)?;
        self.validate_authenticator_data(registration)?;

        tracing::debug!("App Attest statement verified");
        Ok(AttestationType::Basic)
    }
}
