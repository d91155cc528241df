use std::collections::BTreeMap;

use ciborium::value::Value as CborValue;
use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey};
use x509_parser::der_parser::ber::BerObjectContent;
use x509_parser::der_parser::der::parse_der;

use crate::errors::AttestationError;
use crate::utils::strip_leading_zeros;

// COSE_Key labels (RFC 9052 / RFC 9053)
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV_OR_N: i64 = -1;
const LABEL_X_OR_E: i64 = -2;
const LABEL_Y: i64 = -3;

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

pub const CURVE_P256: i64 = 1;
pub const CURVE_P384: i64 = 2;
pub const CURVE_ED25519: i64 = 6;

/// COSE algorithm identifiers accepted in attestation statements and
/// credential public keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    Es256,
    Es384,
    Es512,
    EdDsa,
    Ps256,
    Rs256,
    Rs384,
    Rs512,
    Rs1,
}

impl CoseAlgorithm {
    pub fn value(self) -> i64 {
        match self {
            CoseAlgorithm::Es256 => -7,
            CoseAlgorithm::Es384 => -35,
            CoseAlgorithm::Es512 => -36,
            CoseAlgorithm::EdDsa => -8,
            CoseAlgorithm::Ps256 => -37,
            CoseAlgorithm::Rs256 => -257,
            CoseAlgorithm::Rs384 => -258,
            CoseAlgorithm::Rs512 => -259,
            CoseAlgorithm::Rs1 => -65535,
        }
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = AttestationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -7 => Ok(CoseAlgorithm::Es256),
            -35 => Ok(CoseAlgorithm::Es384),
            -36 => Ok(CoseAlgorithm::Es512),
            -8 => Ok(CoseAlgorithm::EdDsa),
            -37 => Ok(CoseAlgorithm::Ps256),
            -257 => Ok(CoseAlgorithm::Rs256),
            -258 => Ok(CoseAlgorithm::Rs384),
            -259 => Ok(CoseAlgorithm::Rs512),
            -65535 => Ok(CoseAlgorithm::Rs1),
            other => Err(AttestationError::BadAttestationStatement(format!(
                "Unsupported COSE algorithm: {other}"
            ))),
        }
    }
}

/// Key material of a COSE_Key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    Ec2 { curve: i64, x: Vec<u8>, y: Vec<u8> },
    Okp { curve: i64, x: Vec<u8> },
    Rsa { n: Vec<u8>, e: Vec<u8> },
}

/// Credential public key as carried in attested credential data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPublicKey {
    algorithm: CoseAlgorithm,
    key: CoseKey,
}

impl CredentialPublicKey {
    pub fn new(algorithm: CoseAlgorithm, key: CoseKey) -> Self {
        Self { algorithm, key }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn key(&self) -> &CoseKey {
        &self.key
    }

    /// Parse a decoded COSE_Key map.
    pub fn from_cbor(value: &CborValue) -> Result<Self, AttestationError> {
        let CborValue::Map(entries) = value else {
            return Err(AttestationError::AuthenticatorData(
                "Credential public key is not a CBOR map".to_string(),
            ));
        };

        let params: BTreeMap<i64, &CborValue> = entries
            .iter()
            .filter_map(|(k, v)| integer_value(k).map(|label| (label, v)))
            .collect();

        let kty = params
            .get(&LABEL_KTY)
            .and_then(|v| integer_value(v))
            .ok_or_else(|| {
                AttestationError::AuthenticatorData(
                    "Missing key type in credential public key".to_string(),
                )
            })?;
        let alg = params
            .get(&LABEL_ALG)
            .and_then(|v| integer_value(v))
            .ok_or_else(|| {
                AttestationError::AuthenticatorData(
                    "Missing algorithm in credential public key".to_string(),
                )
            })?;
        let algorithm = CoseAlgorithm::try_from(alg)?;

        let bytes_param = |label: i64, name: &str| -> Result<Vec<u8>, AttestationError> {
            params
                .get(&label)
                .and_then(|v| v.as_bytes())
                .cloned()
                .ok_or_else(|| {
                    AttestationError::AuthenticatorData(format!(
                        "Missing {name} in credential public key"
                    ))
                })
        };
        let curve_param = || -> Result<i64, AttestationError> {
            params
                .get(&LABEL_CRV_OR_N)
                .and_then(|v| integer_value(v))
                .ok_or_else(|| {
                    AttestationError::AuthenticatorData(
                        "Missing curve in credential public key".to_string(),
                    )
                })
        };

        let key = match kty {
            KTY_EC2 => CoseKey::Ec2 {
                curve: curve_param()?,
                x: bytes_param(LABEL_X_OR_E, "x-coordinate")?,
                y: bytes_param(LABEL_Y, "y-coordinate")?,
            },
            KTY_OKP => CoseKey::Okp {
                curve: curve_param()?,
                x: bytes_param(LABEL_X_OR_E, "public key")?,
            },
            KTY_RSA => CoseKey::Rsa {
                n: bytes_param(LABEL_CRV_OR_N, "RSA modulus")?,
                e: bytes_param(LABEL_X_OR_E, "RSA exponent")?,
            },
            other => {
                return Err(AttestationError::AuthenticatorData(format!(
                    "Unsupported key type: {other}"
                )));
            }
        };

        Ok(Self { algorithm, key })
    }

    /// Uncompressed SEC1 point (`0x04 || x || y`) for EC2 keys.
    pub fn uncompressed_point(&self) -> Option<Vec<u8>> {
        match &self.key {
            CoseKey::Ec2 { x, y, .. } => {
                let mut point = Vec::with_capacity(1 + x.len() + y.len());
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                Some(point)
            }
            _ => None,
        }
    }

    /// Whether this key equals the `subjectPublicKey` bits of a certificate.
    pub fn matches_subject_public_key(&self, subject_public_key: &[u8]) -> bool {
        match &self.key {
            CoseKey::Ec2 { .. } => {
                self.uncompressed_point().as_deref() == Some(subject_public_key)
            }
            CoseKey::Okp { x, .. } => x.as_slice() == subject_public_key,
            CoseKey::Rsa { n, e } => match rsa_components(subject_public_key) {
                Some((cert_n, cert_e)) => {
                    strip_leading_zeros(n) == cert_n && strip_leading_zeros(e) == cert_e
                }
                None => false,
            },
        }
    }

    /// Verify `sig` over `message` with this key and its own algorithm.
    pub fn verify(&self, message: &[u8], sig: &[u8]) -> Result<(), AttestationError> {
        let result = match (self.algorithm, &self.key) {
            (CoseAlgorithm::Es256, CoseKey::Ec2 { curve: CURVE_P256, .. }) => {
                self.verify_ec(&signature::ECDSA_P256_SHA256_ASN1, message, sig)
            }
            (CoseAlgorithm::Es384, CoseKey::Ec2 { curve: CURVE_P384, .. }) => {
                self.verify_ec(&signature::ECDSA_P384_SHA384_ASN1, message, sig)
            }
            (CoseAlgorithm::EdDsa, CoseKey::Okp { curve, x }) if *curve == CURVE_ED25519 => {
                UnparsedPublicKey::new(&signature::ED25519, x).verify(message, sig)
            }
            (CoseAlgorithm::Rs256, CoseKey::Rsa { n, e }) => {
                verify_rsa(n, e, &signature::RSA_PKCS1_2048_8192_SHA256, message, sig)
            }
            (CoseAlgorithm::Rs384, CoseKey::Rsa { n, e }) => {
                verify_rsa(n, e, &signature::RSA_PKCS1_2048_8192_SHA384, message, sig)
            }
            (CoseAlgorithm::Rs512, CoseKey::Rsa { n, e }) => {
                verify_rsa(n, e, &signature::RSA_PKCS1_2048_8192_SHA512, message, sig)
            }
            (CoseAlgorithm::Ps256, CoseKey::Rsa { n, e }) => {
                verify_rsa(n, e, &signature::RSA_PSS_2048_8192_SHA256, message, sig)
            }
            (alg, key) => {
                return Err(AttestationError::BadAttestationStatement(format!(
                    "Unsupported algorithm {alg:?} for key {}",
                    key_kind(key)
                )));
            }
        };

        result.map_err(|_| {
            AttestationError::BadSignature(format!(
                "Signature verification with credential public key ({:?}) failed",
                self.algorithm
            ))
        })
    }

    fn verify_ec(
        &self,
        alg: &'static signature::EcdsaVerificationAlgorithm,
        message: &[u8],
        sig: &[u8],
    ) -> Result<(), ring::error::Unspecified> {
        let point = self.uncompressed_point().ok_or(ring::error::Unspecified)?;
        UnparsedPublicKey::new(alg, &point).verify(message, sig)
    }
}

fn verify_rsa(
    n: &[u8],
    e: &[u8],
    params: &'static signature::RsaParameters,
    message: &[u8],
    sig: &[u8],
) -> Result<(), ring::error::Unspecified> {
    RsaPublicKeyComponents { n, e }.verify(params, message, sig)
}

fn key_kind(key: &CoseKey) -> &'static str {
    match key {
        CoseKey::Ec2 { .. } => "EC2",
        CoseKey::Okp { .. } => "OKP",
        CoseKey::Rsa { .. } => "RSA",
    }
}

pub(crate) fn integer_value(value: &CborValue) -> Option<i64> {
    match value {
        CborValue::Integer(i) => i64::try_from(*i).ok(),
        _ => None,
    }
}

/// Modulus and exponent of a PKCS#1 `RSAPublicKey`.
fn rsa_components(der: &[u8]) -> Option<(&[u8], &[u8])> {
    let (_, obj) = parse_der(der).ok()?;
    let BerObjectContent::Sequence(items) = obj.content else {
        return None;
    };
    match items.as_slice() {
        [n, e] => match (&n.content, &e.content) {
            (BerObjectContent::Integer(n), BerObjectContent::Integer(e)) => {
                Some((strip_leading_zeros(*n), strip_leading_zeros(*e)))
            }
            _ => None,
        },
        _ => None,
    }
}
