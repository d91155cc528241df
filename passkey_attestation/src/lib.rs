//! passkey-attestation - WebAuthn attestation statement verification
//!
//! Decodes the `attestationObject` returned by a registration ceremony and
//! verifies its attestation statement for every standard format (packed,
//! tpm, android-key, android-safetynet, fido-u2f, apple, apple-appattest,
//! none). Trust-anchor resolution is left to the caller.

mod asn1;
mod attestation;
mod authenticator;
mod certificate;
mod config;
mod errors;
mod extension;
mod registration;
mod statement;
mod utils;

#[cfg(test)]
mod test_utils;

pub use asn1::Asn1Envelope;

pub use attestation::{
    ANDROID_KEY_DESCRIPTION_OID, APPLE_CRED_CERT_EXTENSION_OID, AndroidKeyValidator,
    AndroidSafetyNetValidator, AppleAnonymousValidator, AppleAppAttestValidator,
    AttestationStatementValidator, AttestationType, FidoU2fValidator, NoneValidator,
    PackedValidator, SAFETYNET_ATTESTATION_HOSTNAME, TpmValidator, ValidationOrchestrator,
};

pub use authenticator::{
    Aaguid, AttestedCredentialData, AuthenticatorData, CURVE_ED25519, CURVE_P256, CURVE_P384,
    CoseAlgorithm, CoseKey, CredentialPublicKey, auth_data_flags,
};

pub use certificate::{AttestationCertificate, CertificatePath, ParsedCertificate};

pub use errors::{AttestationError, DecodeError, ExtensionError};

pub use extension::{
    AuthenticatorExtensionInput, AuthenticatorExtensionOutput, ClientExtensionInput,
    ClientExtensionOutput, CredentialPropertiesOutput, CredentialProtectionPolicy, Extension,
    ExtensionRegistry, ExtensionValue,
};

pub use registration::{
    AttestationObject, AuthenticatorAttestationResponse, ClientDataHash, PublicKeyCredentialType,
    RegistrationCredential, RegistrationObject,
};

pub use statement::{
    AndroidKeyStatement, AndroidSafetyNetStatement, AppleAnonymousStatement,
    AppleAppAttestStatement, AttestationFormat, AttestationStatement, FidoU2fStatement,
    PackedStatement, TpmStatement,
};

/// Decode a base64url `attestationObject`, hash the client data and verify
/// the statement with the default orchestrator.
///
/// Returns the decoded object alongside the attestation type so the caller
/// can store the credential.
pub fn verify_attestation(
    attestation_object: &str,
    client_data_json: &[u8],
) -> Result<(AttestationObject, AttestationType), AttestationError> {
    let object = AttestationObject::from_base64url(attestation_object)?;
    let client_data_hash = ClientDataHash::from_client_data_json(client_data_json);
    let attestation_type =
        ValidationOrchestrator::default().validate(&object.registration(&client_data_hash))?;
    Ok((object, attestation_type))
}
