use subtle::ConstantTimeEq;

use super::AttestationStatementValidator;
use crate::asn1::Asn1Envelope;
use crate::authenticator::AttestedCredentialData;
use crate::certificate::{AttestationCertificate, CertificatePath, ParsedCertificate};
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::AttestationFormat;

/// Reject registrations of another format before any other check.
pub(super) fn ensure_supported<V: AttestationStatementValidator + ?Sized>(
    validator: &V,
    registration: &RegistrationObject<'_>,
) -> Result<(), AttestationError> {
    if !validator.supports(registration) {
        return Err(AttestationError::Argument(format!(
            "{} validator does not support {} statements",
            validator.format(),
            registration.format()
        )));
    }
    Ok(())
}

pub(super) fn required<'a, T>(
    field: &'a Option<T>,
    name: &str,
    format: AttestationFormat,
) -> Result<&'a T, AttestationError> {
    field.as_ref().ok_or_else(|| {
        let msg = format!("Missing {name} in {format} attestation");
        AttestationError::BadAttestationStatement(msg)
    })
}

/// DER bytes of the end-entity certificate of a required, non-empty `x5c`.
pub(super) fn end_entity_certificate(
    x5c: &Option<CertificatePath>,
    format: AttestationFormat,
) -> Result<&[u8], AttestationError> {
    required(x5c, "x5c", format)?.end_entity().ok_or_else(|| {
        AttestationError::BadAttestationStatement(format!("Empty x5c in {format} attestation"))
    })
}

/// Nonce carried by Apple credential certificates at `oid`.
pub(super) fn extract_certificate_nonce(
    certificate: &impl AttestationCertificate,
    oid: &str,
) -> Result<Vec<u8>, AttestationError> {
    let value = certificate.extension_value(oid).ok_or_else(|| {
        AttestationError::BadAttestationStatement(format!(
            "Certificate has no nonce extension {oid}"
        ))
    })?;
    let envelope = Asn1Envelope::from_der(&value)?;
    Ok(envelope.inner_octet_string(0)?.to_vec())
}

/// The certificate's AAGUID extension, when present, must name the
/// attested authenticator.
pub(super) fn check_certificate_aaguid(
    certificate: &ParsedCertificate<'_>,
    credential: &AttestedCredentialData,
) -> Result<(), AttestationError> {
    if let Some(cert_aaguid) = certificate.fido_aaguid()? {
        tracing::debug!(
            "Certificate AAGUID: {}, authenticator AAGUID: {}",
            cert_aaguid,
            credential.aaguid()
        );
        if &cert_aaguid != credential.aaguid() {
            return Err(AttestationError::BadAaguid(format!(
                "AAGUID mismatch between certificate ({}) and authenticator data ({})",
                cert_aaguid,
                credential.aaguid()
            )));
        }
    }
    Ok(())
}

pub(super) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
