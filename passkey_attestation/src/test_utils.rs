//! Fixture builders for unit tests: authenticator data, signing keys and
//! X.509 certificates with vendor extensions.

use ciborium::value::Value as CborValue;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa,
};
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

use crate::asn1::encode_length;
use crate::authenticator::{Aaguid, AuthenticatorData, CredentialPublicKey, auth_data_flags};
use crate::registration::{ClientDataHash, RegistrationObject};
use crate::statement::AttestationStatement;
use crate::utils::sha256;

/// P-256 signing key.
pub(crate) struct TestKey {
    pair: EcdsaKeyPair,
    pkcs8: Vec<u8>,
    rng: SystemRandom,
}

pub(crate) fn test_ec_key() -> TestKey {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
        .unwrap()
        .as_ref()
        .to_vec();
    let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &pkcs8, &rng).unwrap();
    TestKey { pair, pkcs8, rng }
}

impl TestKey {
    /// ASN.1 DER ECDSA signature over `message`.
    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature = self.pair.sign(&self.rng, message).unwrap();
        signature.as_ref().to_vec()
    }

    /// Uncompressed SEC1 point.
    pub(crate) fn public_point(&self) -> &[u8] {
        self.pair.public_key().as_ref()
    }

    pub(crate) fn x(&self) -> &[u8] {
        &self.public_point()[1..33]
    }

    pub(crate) fn y(&self) -> &[u8] {
        &self.public_point()[33..65]
    }

    pub(crate) fn pkcs8(&self) -> &[u8] {
        &self.pkcs8
    }

    pub(crate) fn cose_key(&self) -> CborValue {
        cose_ec2_map(self.x(), self.y())
    }

    pub(crate) fn credential_public_key(&self) -> CredentialPublicKey {
        CredentialPublicKey::from_cbor(&self.cose_key()).unwrap()
    }
}

pub(crate) fn cbor_int(value: i64) -> CborValue {
    CborValue::Integer(value.into())
}

/// ES256 / P-256 COSE_Key map.
pub(crate) fn cose_ec2_map(x: &[u8], y: &[u8]) -> CborValue {
    CborValue::Map(vec![
        (cbor_int(1), cbor_int(2)),
        (cbor_int(3), cbor_int(-7)),
        (cbor_int(-1), cbor_int(1)),
        (cbor_int(-2), CborValue::Bytes(x.to_vec())),
        (cbor_int(-3), CborValue::Bytes(y.to_vec())),
    ])
}

/// Raw authenticator data. Defaults to UP | AT for `example.com` with a zero
/// counter, zero AAGUID and a placeholder EC2 key.
pub(crate) struct AuthDataBuilder {
    rp_id_hash: [u8; 32],
    flags: u8,
    sign_count: u32,
    aaguid: Aaguid,
    credential_id: Vec<u8>,
    credential_public_key: CborValue,
    extensions: Option<CborValue>,
}

impl AuthDataBuilder {
    pub(crate) fn new() -> Self {
        Self {
            rp_id_hash: sha256(&[b"example.com"]),
            flags: auth_data_flags::UP | auth_data_flags::AT,
            sign_count: 0,
            aaguid: Aaguid::ZERO,
            credential_id: vec![0x02; 16],
            credential_public_key: cose_ec2_map(&[0x02; 32], &[0x03; 32]),
            extensions: None,
        }
    }

    pub(crate) fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    pub(crate) fn aaguid(mut self, aaguid: Aaguid) -> Self {
        self.aaguid = aaguid;
        self
    }

    pub(crate) fn credential_id(mut self, credential_id: Vec<u8>) -> Self {
        self.credential_id = credential_id;
        self
    }

    pub(crate) fn credential_public_key(mut self, key: CborValue) -> Self {
        self.credential_public_key = key;
        self
    }

    pub(crate) fn extensions(mut self, extensions: CborValue) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.rp_id_hash);
        data.push(self.flags);
        data.extend_from_slice(&self.sign_count.to_be_bytes());

        if self.flags & auth_data_flags::AT != 0 {
            data.extend_from_slice(self.aaguid.as_bytes());
            data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            data.extend_from_slice(&self.credential_id);
            ciborium::ser::into_writer(&self.credential_public_key, &mut data).unwrap();
        }
        if let Some(extensions) = &self.extensions {
            ciborium::ser::into_writer(extensions, &mut data).unwrap();
        }
        data
    }
}

/// Self-signed X.509 v3 certificate for a [`TestKey`]. The subject is empty
/// unless a common name is set.
pub(crate) struct CertBuilder<'a> {
    key: &'a TestKey,
    params: CertificateParams,
}

impl<'a> CertBuilder<'a> {
    pub(crate) fn new(key: &'a TestKey) -> Self {
        let mut params = CertificateParams::default();
        params.distinguished_name = DistinguishedName::new();
        params.is_ca = IsCa::ExplicitNoCa;
        Self { key, params }
    }

    pub(crate) fn common_name(mut self, name: &str) -> Self {
        self.params
            .distinguished_name
            .push(DnType::CommonName, name);
        self
    }

    /// Extension whose `extnValue` contents are `content`.
    pub(crate) fn extension(mut self, oid: &[u64], content: Vec<u8>) -> Self {
        self.params
            .custom_extensions
            .push(CustomExtension::from_oid_content(oid, content));
        self
    }

    pub(crate) fn extended_key_usage(mut self, oid: &[u64]) -> Self {
        self.params
            .extended_key_usages
            .push(ExtendedKeyUsagePurpose::Other(oid.to_vec()));
        self
    }

    pub(crate) fn ca(mut self) -> Self {
        self.params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let key_pair = rcgen::KeyPair::try_from(self.key.pkcs8()).unwrap();
        self.params.self_signed(&key_pair).unwrap().der().to_vec()
    }
}

/// DER TLV with a pre-encoded tag.
pub(crate) fn der_tlv(tag: &[u8], content: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    encode_length(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Contents of the Apple nonce extension: `SEQUENCE { [1] { OCTET STRING } }`.
pub(crate) fn apple_nonce_extension(nonce: &[u8]) -> Vec<u8> {
    der_tlv(&[0x30], &der_tlv(&[0xa1], &der_tlv(&[0x04], nonce)))
}

pub(crate) fn attestation_object_cbor(
    fmt: &str,
    att_stmt: CborValue,
    auth_data: &[u8],
) -> Vec<u8> {
    let value = CborValue::Map(vec![
        (
            CborValue::Text("fmt".to_string()),
            CborValue::Text(fmt.to_string()),
        ),
        (CborValue::Text("attStmt".to_string()), att_stmt),
        (
            CborValue::Text("authData".to_string()),
            CborValue::Bytes(auth_data.to_vec()),
        ),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&value, &mut out).unwrap();
    out
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    URL_SAFE_NO_PAD.encode(input)
}

/// Owned inputs of one ceremony, lent out as a [`RegistrationObject`].
pub(crate) struct Ceremony {
    statement: AttestationStatement,
    auth_data_bytes: Vec<u8>,
    auth_data: AuthenticatorData,
    client_data_hash: ClientDataHash,
}

impl Ceremony {
    pub(crate) fn new(
        statement: AttestationStatement,
        auth_data_bytes: Vec<u8>,
        client_data_hash: ClientDataHash,
    ) -> Self {
        let auth_data = AuthenticatorData::from_bytes(&auth_data_bytes).unwrap();
        Self {
            statement,
            auth_data_bytes,
            auth_data,
            client_data_hash,
        }
    }

    pub(crate) fn registration(&self) -> RegistrationObject<'_> {
        RegistrationObject::new(
            &self.statement,
            &self.auth_data_bytes,
            &self.auth_data,
            &self.client_data_hash,
        )
    }

    /// `authenticatorData || clientDataHash`
    pub(crate) fn signed_data(&self) -> Vec<u8> {
        self.registration().signed_data()
    }
}
