use super::utils::{end_entity_certificate, ensure_supported, required};
use super::{AttestationStatementValidator, AttestationType};
use crate::authenticator::{CURVE_P256, CoseAlgorithm, CoseKey};
use crate::certificate::ParsedCertificate;
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::{AttestationFormat, AttestationStatement};

/// Validator for `fido-u2f` statements produced by CTAP1 security keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct FidoU2fValidator;

impl FidoU2fValidator {
    /// Raw U2F registration message:
    /// `0x00 || rpIdHash || clientDataHash || credentialId || 0x04 || x || y`
    fn verification_data(
        registration: &RegistrationObject<'_>,
        x: &[u8],
        y: &[u8],
    ) -> Result<Vec<u8>, AttestationError> {
        let credential = registration.attested_credential_data()?;
        let credential_id = credential.credential_id();

        let mut data = Vec::with_capacity(1 + 32 + 32 + credential_id.len() + 65);
        data.push(0x00);
        data.extend_from_slice(registration.authenticator_data().rp_id_hash());
        data.extend_from_slice(registration.client_data_hash().as_bytes());
        data.extend_from_slice(credential_id);
        data.push(0x04);
        data.extend_from_slice(x);
        data.extend_from_slice(y);
        Ok(data)
    }
}

impl AttestationStatementValidator for FidoU2fValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::FidoU2f
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::FidoU2f(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected a fido-u2f statement".to_string(),
            ));
        };

        let sig = required(&statement.sig, "sig", self.format())?;
        let attestn_cert = end_entity_certificate(&statement.x5c, self.format())?;
        let chain_len = statement.x5c.as_ref().map_or(0, |x5c| x5c.len());
        if chain_len != 1 {
            return Err(AttestationError::BadAttestationStatement(format!(
                "FIDO-U2F attestation requires exactly one certificate, got {chain_len}"
            )));
        }

        let attestn_cert = ParsedCertificate::from_der(attestn_cert)?;
        if !attestn_cert.is_ec_p256_key() {
            return Err(AttestationError::Certificate(
                "FIDO-U2F attestation certificate key must be EC P-256".to_string(),
            ));
        }

        let credential_key = registration
            .attested_credential_data()?
            .credential_public_key();
        let point = match credential_key.key() {
            CoseKey::Ec2 { curve, x, y } if *curve == CURVE_P256 => Some((x, y)),
            _ => None,
        };
        let Some((x, y)) = point.filter(|(x, y)| x.len() == 32 && y.len() == 32) else {
            return Err(AttestationError::BadAttestationStatement(
                "FIDO-U2F credential public key must be EC2 P-256".to_string(),
            ));
        };

        let verification_data = Self::verification_data(registration, x, y)?;
        tracing::debug!("U2F verification data: {} bytes", verification_data.len());
        attestn_cert.verify_signature(CoseAlgorithm::Es256, &verification_data, sig)?;

        Ok(AttestationType::Basic)
    }
}
