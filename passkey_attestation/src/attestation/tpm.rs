use sha2::{Digest, Sha256, Sha384, Sha512};

use super::utils::{
    check_certificate_aaguid, constant_time_eq, end_entity_certificate, ensure_supported, required,
};
use super::{AttestationStatementValidator, AttestationType};
use crate::authenticator::{CURVE_P256, CURVE_P384, CoseAlgorithm, CoseKey, CredentialPublicKey};
use crate::certificate::ParsedCertificate;
use crate::errors::AttestationError;
use crate::registration::RegistrationObject;
use crate::statement::{AttestationFormat, AttestationStatement};
use crate::utils::strip_leading_zeros;

const TPM_GENERATED_VALUE: u32 = 0xff544347; // 0xFF + "TCG"
const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

const TPM_ALG_RSA: u16 = 0x0001;
const TPM_ALG_SHA256: u16 = 0x000B;
const TPM_ALG_SHA384: u16 = 0x000C;
const TPM_ALG_SHA512: u16 = 0x000D;
const TPM_ALG_NULL: u16 = 0x0010;
const TPM_ALG_ECC: u16 = 0x0023;

const TPM_ECC_NIST_P256: u16 = 0x0003;
const TPM_ECC_NIST_P384: u16 = 0x0004;

/// TPMS_CLOCK_INFO: clock (8), resetCount (4), restartCount (4), safe (1)
const CLOCK_INFO_LEN: usize = 17;
const FIRMWARE_VERSION_LEN: usize = 8;

/// tcg-kp-AIKCertificate
const OID_TCG_KP_AIK_CERTIFICATE: &str = "2.23.133.8.3";

/// Validator for `tpm` statements produced by TPM 2.0 platform
/// authenticators (Windows Hello).
#[derive(Debug, Clone, Copy, Default)]
pub struct TpmValidator;

impl AttestationStatementValidator for TpmValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Tpm
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::Tpm(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected a tpm statement".to_string(),
            ));
        };

        let ver = required(&statement.ver, "ver", self.format())?;
        let alg = *required(&statement.alg, "alg", self.format())?;
        let sig = required(&statement.sig, "sig", self.format())?;
        let aik_cert = end_entity_certificate(&statement.x5c, self.format())?;
        let cert_info_bytes = required(&statement.cert_info, "certInfo", self.format())?;
        let pub_area_bytes = required(&statement.pub_area, "pubArea", self.format())?;

        if ver != "2.0" {
            return Err(AttestationError::BadAttestationStatement(format!(
                "Unsupported TPM version: {ver}"
            )));
        }

        let credential = registration.attested_credential_data()?;
        let pub_area = PubArea::parse(pub_area_bytes)?;
        if !pub_area.matches(credential.credential_public_key()) {
            return Err(AttestationError::PublicKeyMismatch(
                "TPM pubArea key does not match the credential public key".to_string(),
            ));
        }

        let cert_info = CertInfo::parse(cert_info_bytes)?;
        let hash_alg = attestation_hash_alg(alg)?;
        let expected_extra_data = tpm_digest(
            hash_alg,
            &[
                registration.authenticator_data_bytes(),
                registration.client_data_hash().as_bytes(),
            ],
        )
        .ok_or_else(|| {
            AttestationError::BadAttestationStatement(format!(
                "Unsupported hash algorithm for {alg:?}"
            ))
        })?;
        if !constant_time_eq(cert_info.extra_data, &expected_extra_data) {
            tracing::debug!("extraData: {:02x?}", cert_info.extra_data);
            return Err(AttestationError::KeyDescriptionValidation(
                "TPM certInfo extraData does not match hash of attToBeSigned".to_string(),
            ));
        }
        cert_info.verify_attested_name(pub_area.name_alg, pub_area_bytes)?;

        let aik_cert = ParsedCertificate::from_der(aik_cert)?;
        aik_cert.verify_signature(alg, cert_info_bytes, sig)?;
        verify_aik_certificate(&aik_cert)?;
        check_certificate_aaguid(&aik_cert, credential)?;

        tracing::debug!("TPM attestation verified");
        Ok(AttestationType::AttCa)
    }
}

/// AIK certificate requirements for TPM attestation.
fn verify_aik_certificate(aik_cert: &ParsedCertificate<'_>) -> Result<(), AttestationError> {
    if !aik_cert.is_v3() {
        return Err(AttestationError::Certificate(
            "AIK certificate must be X.509 version 3".to_string(),
        ));
    }
    if !aik_cert.has_empty_subject() {
        return Err(AttestationError::Certificate(
            "AIK certificate subject must be empty".to_string(),
        ));
    }
    if !aik_cert.has_extended_key_usage(OID_TCG_KP_AIK_CERTIFICATE) {
        return Err(AttestationError::Certificate(
            "AIK certificate missing tcg-kp-AIKCertificate extended key usage".to_string(),
        ));
    }
    if aik_cert.is_ca() {
        return Err(AttestationError::Certificate(
            "AIK certificate must not be a CA certificate".to_string(),
        ));
    }
    Ok(())
}

/// TPM hash algorithm matching the digest of a COSE signature algorithm.
fn attestation_hash_alg(alg: CoseAlgorithm) -> Result<u16, AttestationError> {
    match alg {
        CoseAlgorithm::Es256 | CoseAlgorithm::Rs256 | CoseAlgorithm::Ps256 => Ok(TPM_ALG_SHA256),
        CoseAlgorithm::Es384 | CoseAlgorithm::Rs384 => Ok(TPM_ALG_SHA384),
        CoseAlgorithm::Es512 | CoseAlgorithm::Rs512 => Ok(TPM_ALG_SHA512),
        other => Err(AttestationError::BadAttestationStatement(format!(
            "Unsupported algorithm for TPM attestation: {other:?}"
        ))),
    }
}

fn tpm_digest(hash_alg: u16, parts: &[&[u8]]) -> Option<Vec<u8>> {
    fn digest<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = D::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().to_vec()
    }

    match hash_alg {
        TPM_ALG_SHA256 => Some(digest::<Sha256>(parts)),
        TPM_ALG_SHA384 => Some(digest::<Sha384>(parts)),
        TPM_ALG_SHA512 => Some(digest::<Sha512>(parts)),
        _ => None,
    }
}

/// Big-endian cursor over a TPM structure.
struct TpmReader<'a> {
    data: &'a [u8],
    offset: usize,
    structure: &'static str,
}

impl<'a> TpmReader<'a> {
    fn new(data: &'a [u8], structure: &'static str) -> Self {
        Self {
            data,
            offset: 0,
            structure,
        }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], AttestationError> {
        let end = self.offset.checked_add(len);
        let Some(end) = end.filter(|end| *end <= self.data.len()) else {
            return Err(AttestationError::BadAttestationStatement(format!(
                "TPM {} too short: need {} bytes at offset {}, have {}",
                self.structure,
                len,
                self.offset,
                self.data.len()
            )));
        };
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, AttestationError> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, AttestationError> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// TPM2B: u16 size followed by that many bytes.
    fn sized(&mut self) -> Result<&'a [u8], AttestationError> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }

    fn finish(&self) -> Result<(), AttestationError> {
        if self.offset != self.data.len() {
            return Err(AttestationError::BadAttestationStatement(format!(
                "TPM {} has {} trailing bytes",
                self.structure,
                self.data.len() - self.offset
            )));
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TpmPublicKey<'a> {
    Rsa { modulus: &'a [u8], exponent: u32 },
    Ecc {
        curve: u16,
        x: &'a [u8],
        y: &'a [u8],
    },
}

/// TPMT_PUBLIC of the credential key.
#[derive(Debug)]
struct PubArea<'a> {
    name_alg: u16,
    key: TpmPublicKey<'a>,
}

impl<'a> PubArea<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self, AttestationError> {
        let mut reader = TpmReader::new(bytes, "pubArea");
        let key_type = reader.u16()?;
        let name_alg = reader.u16()?;
        let _object_attributes = reader.u32()?;
        let _auth_policy = reader.sized()?;

        let key = match key_type {
            TPM_ALG_RSA => {
                let symmetric = reader.u16()?;
                if symmetric != TPM_ALG_NULL {
                    let _key_bits = reader.u16()?;
                    let _mode = reader.u16()?;
                }
                let scheme = reader.u16()?;
                if scheme != TPM_ALG_NULL {
                    let _hash_alg = reader.u16()?;
                }
                let _key_bits = reader.u16()?;
                let exponent = match reader.u32()? {
                    0 => 65537,
                    e => e,
                };
                let modulus = reader.sized()?;
                TpmPublicKey::Rsa { modulus, exponent }
            }
            TPM_ALG_ECC => {
                let symmetric = reader.u16()?;
                if symmetric != TPM_ALG_NULL {
                    let _key_bits = reader.u16()?;
                    let _mode = reader.u16()?;
                }
                let scheme = reader.u16()?;
                if scheme != TPM_ALG_NULL {
                    let _hash_alg = reader.u16()?;
                }
                let curve = reader.u16()?;
                let kdf = reader.u16()?;
                if kdf != TPM_ALG_NULL {
                    let _hash_alg = reader.u16()?;
                }
                let x = reader.sized()?;
                let y = reader.sized()?;
                TpmPublicKey::Ecc { curve, x, y }
            }
            other => {
                return Err(AttestationError::BadAttestationStatement(format!(
                    "Unsupported TPM public key type: {other:#06x}"
                )));
            }
        };
        reader.finish()?;

        Ok(Self { name_alg, key })
    }

    fn matches(&self, credential_key: &CredentialPublicKey) -> bool {
        let cose_key = credential_key.key();
        match self.key {
            TpmPublicKey::Rsa { modulus, exponent } => {
                let CoseKey::Rsa { n, e } = cose_key else {
                    return false;
                };
                strip_leading_zeros(modulus) == strip_leading_zeros(n)
                    && big_endian_value(e) == Some(u64::from(exponent))
            }
            TpmPublicKey::Ecc { curve, x, y } => {
                let curve = match curve {
                    TPM_ECC_NIST_P256 => CURVE_P256,
                    TPM_ECC_NIST_P384 => CURVE_P384,
                    _ => return false,
                };
                let expected = CoseKey::Ec2 {
                    curve,
                    x: x.to_vec(),
                    y: y.to_vec(),
                };
                *cose_key == expected
            }
        }
    }
}

/// TPMS_ATTEST of a TPM2_Certify over the credential key.
#[derive(Debug)]
struct CertInfo<'a> {
    extra_data: &'a [u8],
    attested_name: &'a [u8],
}

impl<'a> CertInfo<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self, AttestationError> {
        let mut reader = TpmReader::new(bytes, "certInfo");

        let magic = reader.u32()?;
        if magic != TPM_GENERATED_VALUE {
            return Err(AttestationError::BadAttestationStatement(format!(
                "Invalid magic value: {magic:x}, expected: {TPM_GENERATED_VALUE:x}"
            )));
        }
        let attest_type = reader.u16()?;
        if attest_type != TPM_ST_ATTEST_CERTIFY {
            return Err(AttestationError::BadAttestationStatement(format!(
                "Invalid attestation type: {attest_type:x}, expected: {TPM_ST_ATTEST_CERTIFY:x}"
            )));
        }

        let _qualified_signer = reader.sized()?;
        let extra_data = reader.sized()?;
        let _clock_info = reader.bytes(CLOCK_INFO_LEN)?;
        let _firmware_version = reader.bytes(FIRMWARE_VERSION_LEN)?;
        let attested_name = reader.sized()?;
        let _qualified_name = reader.sized()?;
        reader.finish()?;

        Ok(Self {
            extra_data,
            attested_name,
        })
    }

    /// The certified name must be `nameAlg || H_nameAlg(pubArea)`.
    fn verify_attested_name(&self, name_alg: u16, pub_area: &[u8]) -> Result<(), AttestationError> {
        let pub_area_hash = tpm_digest(name_alg, &[pub_area]).ok_or_else(|| {
            AttestationError::BadAttestationStatement(format!(
                "Unsupported TPM name algorithm: {name_alg:#06x}"
            ))
        })?;

        let mut expected = Vec::with_capacity(2 + pub_area_hash.len());
        expected.extend_from_slice(&name_alg.to_be_bytes());
        expected.extend_from_slice(&pub_area_hash);

        if self.attested_name != expected.as_slice() {
            tracing::debug!("Attested name: {:02x?}", self.attested_name);
            return Err(AttestationError::PublicKeyMismatch(
                "TPM attested name does not match pubArea".to_string(),
            ));
        }
        Ok(())
    }
}

fn big_endian_value(bytes: &[u8]) -> Option<u64> {
    let bytes = strip_leading_zeros(bytes);
    if bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}
