use super::utils::ensure_supported;
use super::{AttestationStatementValidator, AttestationType};
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::AttestationFormat;

/// Validator for `none` statements (platform authenticators that do not
/// attest). The empty `attStmt` is enforced when the statement is decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneValidator;

impl AttestationStatementValidator for NoneValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::None
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;

        let credential = registration.attested_credential_data()?;
        tracing::debug!(
            "No attestation for credential with AAGUID {}",
            credential.aaguid()
        );
        Ok(AttestationType::None)
    }
}
