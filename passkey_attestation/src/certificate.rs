//! Certificate access for statement validators.
//!
//! Chain building and trust-anchor resolution happen outside this crate; the
//! validators only look at the end-entity certificate's extensions, public
//! key and signature.

use oid_registry::{OID_KEY_TYPE_EC_PUBLIC_KEY, OID_X509_EXT_BASIC_CONSTRAINTS};
use webpki::EndEntityCert;
use x509_parser::der_parser::ber::BerObjectContent;
use x509_parser::der_parser::der::parse_der;
use x509_parser::extensions::BasicConstraints;
use x509_parser::prelude::*;

use crate::asn1::encode_octet_string;
use crate::authenticator::{Aaguid, CoseAlgorithm};
use crate::errors::AttestationError;

/// id-fido-gen-ce-aaguid
pub(crate) const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";

/// Read access to an attestation certificate.
pub trait AttestationCertificate {
    /// DER-encoded `extnValue` (the `OCTET STRING` wrapper included) of the
    /// extension identified by the dotted `oid`, if present.
    fn extension_value(&self, oid: &str) -> Option<Vec<u8>>;

    /// Raw `subjectPublicKey` bits: an uncompressed point for EC keys, a
    /// PKCS#1 `RSAPublicKey` for RSA keys.
    fn subject_public_key(&self) -> &[u8];
}

/// Ordered certificate chain (`x5c`), end-entity certificate first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificatePath(Vec<Vec<u8>>);

impl CertificatePath {
    pub fn new(certificates: Vec<Vec<u8>>) -> Self {
        Self(certificates)
    }

    /// DER bytes of the end-entity certificate.
    pub fn end_entity(&self) -> Option<&[u8]> {
        self.0.first().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }
}

impl From<Vec<Vec<u8>>> for CertificatePath {
    fn from(certificates: Vec<Vec<u8>>) -> Self {
        Self(certificates)
    }
}

/// X.509 certificate parsed with `x509-parser`, keeping its DER bytes for
/// signature verification with `webpki`.
pub struct ParsedCertificate<'a> {
    der: &'a [u8],
    x509: X509Certificate<'a>,
}

impl<'a> ParsedCertificate<'a> {
    pub fn from_der(der: &'a [u8]) -> Result<Self, AttestationError> {
        let (_, x509) = X509Certificate::from_der(der).map_err(|e| {
            AttestationError::Certificate(format!("Failed to parse X509 certificate: {e}"))
        })?;
        Ok(Self { der, x509 })
    }

    /// Verify `signature` over `message` with the certificate's public key.
    pub fn verify_signature(
        &self,
        alg: CoseAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AttestationError> {
        let scheme = webpki_algorithm(alg)?;
        let cert = EndEntityCert::try_from(self.der).map_err(|e| {
            AttestationError::Certificate(format!(
                "Failed to parse attestation certificate: {e:?}"
            ))
        })?;
        cert.verify_signature(scheme, message, signature)
            .map_err(|e| {
                AttestationError::BadSignature(format!(
                    "Attestation signature invalid ({alg:?}): {e:?}"
                ))
            })
    }

    /// X.509 v3 (encoded as version 2)
    pub fn is_v3(&self) -> bool {
        self.x509.version == X509Version::V3
    }

    pub fn is_ca(&self) -> bool {
        self.x509
            .extensions()
            .iter()
            .find(|ext| ext.oid == OID_X509_EXT_BASIC_CONSTRAINTS)
            .and_then(|ext| BasicConstraints::from_der(ext.value).ok())
            .is_some_and(|(_, bc)| bc.ca)
    }

    pub fn has_empty_subject(&self) -> bool {
        self.x509.subject().iter().next().is_none()
    }

    /// Whether the extended key usage extension lists `oid`.
    pub fn has_extended_key_usage(&self, oid: &str) -> bool {
        match self.x509.extended_key_usage() {
            Ok(Some(eku)) => eku.value.other.iter().any(|o| o.to_id_string() == oid),
            _ => false,
        }
    }

    pub fn common_name(&self) -> Option<&str> {
        self.x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
    }

    pub fn is_ec_p256_key(&self) -> bool {
        let spki = self.x509.public_key();
        let key = self.subject_public_key();
        spki.algorithm.algorithm == OID_KEY_TYPE_EC_PUBLIC_KEY && key.len() == 65 && key[0] == 0x04
    }

    /// AAGUID from the id-fido-gen-ce-aaguid extension, if present.
    pub fn fido_aaguid(&self) -> Result<Option<Aaguid>, AttestationError> {
        let Some(value) = self.raw_extension(OID_FIDO_GEN_CE_AAGUID) else {
            return Ok(None);
        };
        let (_, obj) = parse_der(value).map_err(|e| {
            AttestationError::Certificate(format!("Invalid AAGUID extension: {e}"))
        })?;
        let BerObjectContent::OctetString(bytes) = obj.content else {
            return Err(AttestationError::Certificate(
                "Invalid AAGUID extension format".to_string(),
            ));
        };
        let aaguid = Aaguid::try_from(bytes).map_err(|e| {
            AttestationError::Certificate(format!("Invalid AAGUID extension: {e}"))
        })?;
        Ok(Some(aaguid))
    }

    /// Contents of the extension's `extnValue`, without the wrapper.
    pub(crate) fn raw_extension(&self, oid: &str) -> Option<&'a [u8]> {
        self.x509
            .extensions()
            .iter()
            .find(|ext| ext.oid.to_id_string() == oid)
            .map(|ext| ext.value)
    }
}

impl AttestationCertificate for ParsedCertificate<'_> {
    fn extension_value(&self, oid: &str) -> Option<Vec<u8>> {
        self.raw_extension(oid).map(encode_octet_string)
    }

    fn subject_public_key(&self) -> &[u8] {
        &self.x509.public_key().subject_public_key.data
    }
}

fn webpki_algorithm(
    alg: CoseAlgorithm,
) -> Result<&'static webpki::SignatureAlgorithm, AttestationError> {
    match alg {
        CoseAlgorithm::Es256 => Ok(&webpki::ECDSA_P256_SHA256),
        CoseAlgorithm::Es384 => Ok(&webpki::ECDSA_P384_SHA384),
        CoseAlgorithm::EdDsa => Ok(&webpki::ED25519),
        CoseAlgorithm::Rs256 => Ok(&webpki::RSA_PKCS1_2048_8192_SHA256),
        CoseAlgorithm::Rs384 => Ok(&webpki::RSA_PKCS1_2048_8192_SHA384),
        CoseAlgorithm::Rs512 => Ok(&webpki::RSA_PKCS1_2048_8192_SHA512),
        CoseAlgorithm::Ps256 => Ok(&webpki::RSA_PSS_2048_8192_SHA256_LEGACY_KEY),
        other => Err(AttestationError::BadAttestationStatement(format!(
            "Unsupported attestation signature algorithm: {other:?}"
        ))),
    }
}
