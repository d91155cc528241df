use super::{
    AndroidKeyValidator, AndroidSafetyNetValidator, AppleAnonymousValidator,
    AppleAppAttestValidator, AttestationStatementValidator, AttestationType, FidoU2fValidator,
    NoneValidator, PackedValidator, TpmValidator,
};
use crate::config::PASSKEY_ATTESTATION_FORMATS;
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::AttestationFormat;

/// Dispatches a registration to the one validator that supports its
/// statement format.
///
/// The orchestrator adds no checks of its own: the validator's result or
/// error is returned unchanged.
pub struct ValidationOrchestrator {
    validators: Vec<Box<dyn AttestationStatementValidator>>,
}

impl ValidationOrchestrator {
    pub fn new(validators: Vec<Box<dyn AttestationStatementValidator>>) -> Self {
        Self { validators }
    }

    /// Orchestrator with the built-in validator for each of `formats`.
    pub fn with_formats(formats: &[AttestationFormat]) -> Self {
        let mut enabled: Vec<AttestationFormat> = Vec::with_capacity(formats.len());
        for format in formats {
            if !enabled.contains(format) {
                enabled.push(*format);
            }
        }
        Self::new(enabled.into_iter().map(validator_for).collect())
    }

    /// Formats handled by the registered validators, in registration order.
    pub fn formats(&self) -> Vec<AttestationFormat> {
        self.validators.iter().map(|v| v.format()).collect()
    }

    pub fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        let format = registration.format();
        let mut claimants = self.validators.iter().filter(|v| v.supports(registration));

        let validator = match (claimants.next(), claimants.next()) {
            (Some(validator), None) => validator,
            (None, _) => {
                return Err(AttestationError::Config(format!(
                    "No validator registered for {format} attestation"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(AttestationError::Config(format!(
                    "Multiple validators registered for {format} attestation"
                )));
            }
        };

        tracing::debug!("Using '{}' attestation format", format);
        validator.validate(registration)
    }
}

impl Default for ValidationOrchestrator {
    fn default() -> Self {
        Self::with_formats(&PASSKEY_ATTESTATION_FORMATS)
    }
}

impl std::fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("formats", &self.formats())
            .finish()
    }
}

fn validator_for(format: AttestationFormat) -> Box<dyn AttestationStatementValidator> {
    match format {
        AttestationFormat::Packed => Box::new(PackedValidator),
        AttestationFormat::Tpm => Box::new(TpmValidator),
        AttestationFormat::AndroidKey => Box::new(AndroidKeyValidator::default()),
        AttestationFormat::AndroidSafetyNet => Box::new(AndroidSafetyNetValidator),
        AttestationFormat::FidoU2f => Box::new(FidoU2fValidator),
        AttestationFormat::Apple => Box::new(AppleAnonymousValidator),
        AttestationFormat::AppleAppAttest => Box::new(AppleAppAttestValidator::new()),
        AttestationFormat::None => Box::new(NoneValidator),
    }
}
