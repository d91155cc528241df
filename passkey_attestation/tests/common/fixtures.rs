use base64::{Engine as _, engine::general_purpose};
use ciborium::value::{Integer, Value as CborValue};
use ring::signature::KeyPair;
use serde_json::{Value, json};

/// App Attest credential certificate (x5c[0]) issued by Apple for a
/// production key.
pub const APP_ATTEST_CRED_CERT_B64: &str = concat!(
    "MIIDLTCCArOgAwIBAgIGAZBqsWxPMAoGCCqGSM49BAMCME8xIzAhBgNVBAMMGkFwcGxlIEFwcCBBdHRlc3RhdGlvbiBD",
    "QSAxMRMwEQYDVQQKDApBcHBsZSBJbmMuMRMwEQYDVQQIDApDYWxpZm9ybmlhMB4XDTI0MDYyOTE5NDg1MFoXDTI1MDEy",
    "NDA3Mjc1MFowgZExSTBHBgNVBAMMQDFiNzc5ZmY2OTFlZGY0ZGUwM2M1NDhlOGZlMTk2MmY2ZDU3OTgwNjBjYTY4M2Rk",
    "NDdiYjJiYzcyYTc4ZGZlYmYxGjAYBgNVBAsMEUFBQSBDZXJ0aWZpY2F0aW9uMRMwEQYDVQQKDApBcHBsZSBJbmMuMRMw",
    "EQYDVQQIDApDYWxpZm9ybmlhMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE1a4L/Uyf6QJoFEGANILVw0Vfb8N00Sb/",
    "AtaraRWeDzjCAR3Aci1LA2UhTyUEMTN50Zig9RCxH3dEV8yma4YV56OCATYwggEyMAwGA1UdEwEB/wQCMAAwDgYDVR0P",
    "AQH/BAQDAgTwMIGDBgkqhkiG92NkCAUEdjB0pAMCAQq/iTADAgEBv4kxAwIBAL+JMgMCAQG/iTMDAgEBv4k0JAQiNzYy",
    "VTVHNzIzNi5uZXR3b3JrLmdhbmRhbGYuY29ubmVjdKUGBARza3Mgv4k2AwIBBb+JNwMCAQC/iTkDAgEAv4k6AwIBAL+J",
    "OwMCAQAwVwYJKoZIhvdjZAgHBEowSL+KeAgEBjE3LjUuMb+IUAcCBQD/////v4p7BwQFMjFGOTC/in0IBAYxNy41LjG/",
    "in4DAgEAv4sMDwQNMjEuNi45MC4wLjAsMDAzBgkqhkiG92NkCAIEJjAkoSIEIBbK8+eXK+RbgVqC8N/wbQMVDV1cLhtf",
    "mK6h292uJ5d/MAoGCCqGSM49BAMCA2gAMGUCMDF4I2kb9VwqZdm+O8aEnA6nkfLsLCqRuYD7EFa+wJt61zcT8lmzf0B0",
    "rr+MVgESPAIxAL13cvI0L8l9UVWQoNmnFMN9abUjnntwgxFjHEpr9uIkREyqPek3TD2DTfOuHKVB6Q==",
);

/// Nonce embedded in [`APP_ATTEST_CRED_CERT_B64`].
pub const APP_ATTEST_NONCE_HEX: &str =
    "16caf3e7972be45b815a82f0dff06d03150d5d5c2e1b5f98aea1dbddae27977f";

/// Authenticator data that accompanied [`APP_ATTEST_CRED_CERT_B64`]: AT flag
/// only, counter 0, production AAGUID, 32-byte key id and the EC2 key of the
/// certificate.
pub const APP_ATTEST_AUTH_DATA_HEX: &str = concat!(
    "a45cd96c06ba89e2644aad17e92894e6e3c5c73315d0f16eb84947f9d3f1e853",
    "40",
    "00000000",
    "61707061747465737400000000000000",
    "0020",
    "1b779ff691edf4de03c548e8fe1962f6d5798060ca683dd47bb2bc72a78dfebf",
    "a5010203262001215820d5ae0bfd4c9fe902681441803482d5c3455f6fc374d126ff02d6ab69159e0f38",
    "225820c2011dc0722d4b0365214f2504313379d198a0f510b11f774457cca66b8615e7",
);

/// App Attest credential certificate for a development key, issued for the
/// nonce derived from [`APP_ATTEST_DEV_AUTH_DATA_HEX`] and the client data
/// hash of [`APP_ATTEST_DEV_CLIENT_DATA`].
pub const APP_ATTEST_DEV_CRED_CERT_B64: &str = concat!(
    "MIIDVTCCAtygAwIBAgIGAZkp3UYuMAoGCCqGSM49BAMCME8xIzAhBgNVBAMMGkFwcGxlIEFwcCBBdHRlc3RhdGlvbiBD",
    "QSAxMRMwEQYDVQQKDApBcHBsZSBJbmMuMRMwEQYDVQQIDApDYWxpZm9ybmlhMB4XDTI1MDkwNzE1MDYzMVoXDTI2MDQy",
    "NTAzMDkzMVowgZExSTBHBgNVBAMMQDE5ZDRmOGY0NzRlZjU3NGFmZTdmNzVjN2U1NmUzZjRlZTQzZmZkMTQ5ZTA2ZTNj",
    "YzAxNTAxNzA2NzIyN2QxZjgxGjAYBgNVBAsMEUFBQSBDZXJ0aWZpY2F0aW9uMRMwEQYDVQQKDApBcHBsZSBJbmMuMRMw",
    "EQYDVQQIDApDYWxpZm9ybmlhMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE5a+gVeXbm7ib67Nc/grPuz5ahuP2l+gJ",
    "jWPxjTF+3+07rXmFfsU7l5vdHyY0M2PKTHXotu6p2Kesins4aNL6jKOCAV8wggFbMAwGA1UdEwEB/wQCMAAwDgYDVR0P",
    "AQH/BAQDAgTwMIGXBgkqhkiG92NkCAUEgYkwgYakAwIBCr+JMAMCAQG/iTEDAgEAv4kyAwIBAb+JMwMCAQG/iTQnBCVB",
    "R0czVjZRTjRHLmNoLnByb2NpdmlzLm9uZS53YWxsZXQuZGV2pQYEBHNrcyC/iTYDAgEFv4k3AwIBAL+JOQMCAQC/iToD",
    "AgEAv4k7AwIBAKoDAgEAv4k8BgIEc2tzIDBsBgkqhkiG92NkCAcEXzBdv4p4CAQGMTcuNy4xv4hQBwIFAP////6/inkJ",
    "BAcxLjAuMTk4v4p7CAQGMjFIMjE2v4p8AgQAv4p9CAQGMTcuNy4xv4p+AwIBAL+LDBAEDjIxLjguMjE2LjAuMCwwMDMG",
    "CSqGSIb3Y2QIAgQmMCShIgQgZtA5mMcg4gBWvV1C8+DIvWnyhqOhFbwxUMOwBxTirEQwCgYIKoZIzj0EAwIDZwAwZAIw",
    "HxWcErpAzwqqWuvJ6kx0f98YDxlCgARO0gPKD4KEtwamK7nEByNAfEJ8yuBi5sLGAjBBudqssh94Lwh45u41J+owqord",
    "sr2Ol8KOe48g6IpW49wIN70G3GER5jeXI6q8/Fo=",
);

/// Client data the development key was attested over.
pub const APP_ATTEST_DEV_CLIENT_DATA: &[u8] = b"test";

/// Authenticator data that accompanied [`APP_ATTEST_DEV_CRED_CERT_B64`]:
/// AT flag only, counter 0, development AAGUID.
pub const APP_ATTEST_DEV_AUTH_DATA_HEX: &str = concat!(
    "4eb12f0f254ec95897e10fc295ff0b7138007a58d514fe3a659efbcac7e5855a",
    "40",
    "00000000",
    "617070617474657374646576656c6f70",
    "0020",
    "19d4f8f474ef574afe7f75c7e56e3f4ee43ffd149e06e3cc015017067227d1f8",
    "a5010203262001215820e5afa055e5db9bb89bebb35cfe0acfbb3e5a86e3f697e8098d63f18d317edfed",
    "2258203bad79857ec53b979bdd1f26343363ca4c75e8b6eea9d8a7ac8a7b3868d2fa8c",
);

pub fn decode_hex(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

pub fn app_attest_cred_cert() -> Vec<u8> {
    general_purpose::STANDARD
        .decode(APP_ATTEST_CRED_CERT_B64)
        .unwrap()
}

pub fn app_attest_dev_cred_cert() -> Vec<u8> {
    general_purpose::STANDARD
        .decode(APP_ATTEST_DEV_CRED_CERT_B64)
        .unwrap()
}

/// P-256 key pair for signing attestation payloads.
pub struct TestKeyPair {
    key_pair: ring::signature::EcdsaKeyPair,
    rng: ring::rand::SystemRandom,
}

impl TestKeyPair {
    pub fn generate() -> Self {
        let rng = ring::rand::SystemRandom::new();
        let pkcs8 = ring::signature::EcdsaKeyPair::generate_pkcs8(
            &ring::signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            &rng,
        )
        .expect("Failed to generate key pair");
        let key_pair = ring::signature::EcdsaKeyPair::from_pkcs8(
            &ring::signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            pkcs8.as_ref(),
            &rng,
        )
        .expect("Failed to create key pair");
        Self { key_pair, rng }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key_pair
            .sign(&self.rng, message)
            .expect("Failed to sign")
            .as_ref()
            .to_vec()
    }

    /// COSE_Key map of the public key (ES256, P-256).
    pub fn cose_key(&self) -> CborValue {
        let point = self.key_pair.public_key().as_ref();
        CborValue::Map(vec![
            (
                CborValue::Integer(Integer::from(1)),
                CborValue::Integer(Integer::from(2)),
            ),
            (
                CborValue::Integer(Integer::from(3)),
                CborValue::Integer(Integer::from(-7)),
            ),
            (
                CborValue::Integer(Integer::from(-1)),
                CborValue::Integer(Integer::from(1)),
            ),
            (
                CborValue::Integer(Integer::from(-2)),
                CborValue::Bytes(point[1..33].to_vec()),
            ),
            (
                CborValue::Integer(Integer::from(-3)),
                CborValue::Bytes(point[33..65].to_vec()),
            ),
        ])
    }
}

/// Authenticator data for `example.com` with UP | UV | AT, attesting
/// `cose_key`. `extensions` adds the ED flag and the extension map.
pub fn auth_data(cose_key: &CborValue, extensions: Option<&CborValue>) -> Vec<u8> {
    let mut auth_data = Vec::new();
    let rp_id_hash = ring::digest::digest(&ring::digest::SHA256, b"example.com");
    auth_data.extend_from_slice(rp_id_hash.as_ref());

    let mut flags = 0x45;
    if extensions.is_some() {
        flags |= 0x80;
    }
    auth_data.push(flags);
    auth_data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    auth_data.extend_from_slice(&[0x00; 16]);
    auth_data.extend_from_slice(&[0x00, 0x10]);
    auth_data.extend_from_slice(b"mock_cred_id_123");
    ciborium::ser::into_writer(cose_key, &mut auth_data).unwrap();

    if let Some(extensions) = extensions {
        ciborium::ser::into_writer(extensions, &mut auth_data).unwrap();
    }
    auth_data
}

/// CBOR `attestationObject`, base64url encoded.
pub fn attestation_object(fmt: &str, att_stmt: CborValue, auth_data: &[u8]) -> String {
    let attestation_obj = CborValue::Map(vec![
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
    let mut cbor_bytes = Vec::new();
    ciborium::ser::into_writer(&attestation_obj, &mut cbor_bytes).unwrap();
    general_purpose::URL_SAFE_NO_PAD.encode(&cbor_bytes)
}

pub fn client_data_json(challenge: &str) -> Vec<u8> {
    json!({
        "type": "webauthn.create",
        "challenge": challenge,
        "origin": "https://example.com"
    })
    .to_string()
    .into_bytes()
}

/// `PublicKeyCredential` JSON as posted by the browser.
pub fn registration_credential(
    attestation_object: &str,
    client_data_json: &[u8],
    client_extension_results: Value,
) -> String {
    json!({
        "id": "bW9ja19jcmVkX2lkXzEyMw",
        "rawId": "bW9ja19jcmVkX2lkXzEyMw",
        "type": "public-key",
        "response": {
            "clientDataJSON": general_purpose::URL_SAFE_NO_PAD.encode(client_data_json),
            "attestationObject": attestation_object,
        },
        "clientExtensionResults": client_extension_results,
    })
    .to_string()
}
