//! Attestation statement validators, one per format, and the orchestrator
//! that dispatches to them.

mod android_key;
mod android_safetynet;
mod apple_anonymous;
mod apple_app_attest;
mod core;
mod none;
mod packed;
mod tpm;
mod u2f;
mod utils;

use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::AttestationFormat;

pub use self::core::ValidationOrchestrator;
pub use android_key::{ANDROID_KEY_DESCRIPTION_OID, AndroidKeyValidator};
pub use android_safetynet::{AndroidSafetyNetValidator, SAFETYNET_ATTESTATION_HOSTNAME};
pub use apple_anonymous::AppleAnonymousValidator;
pub use apple_app_attest::{APPLE_CRED_CERT_EXTENSION_OID, AppleAppAttestValidator};
pub use none::NoneValidator;
pub use packed::PackedValidator;
pub use tpm::TpmValidator;
pub use u2f::FidoU2fValidator;

/// Trust classification produced by a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationType {
    None,
    Basic,
    SelfAttestation,
    AttCa,
    AnonCa,
    Ecdaa,
}

/// Validator for a single attestation statement format.
///
/// Implementations hold no per-call state and can be shared across threads.
pub trait AttestationStatementValidator: Send + Sync {
    /// Format handled by this validator.
    fn format(&self) -> AttestationFormat;

    fn supports(&self, registration: &RegistrationObject<'_>) -> bool {
        registration.format() == self.format()
    }

    /// Validate the statement of `registration`.
    ///
    /// Fails with [`AttestationError::Argument`] if the statement is of
    /// another format.
    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError>;
}
