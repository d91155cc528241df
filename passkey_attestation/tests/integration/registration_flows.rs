use ciborium::value::{Integer, Value as CborValue};
use passkey_attestation::{
    AttestationError, AttestationFormat, AttestationType, ClientDataHash,
    CredentialProtectionPolicy, ExtensionValue, RegistrationCredential, ValidationOrchestrator,
    verify_attestation,
};
use serde_json::json;

use crate::common::{
    TestKeyPair, attestation_object, auth_data, client_data_json, registration_credential,
};

fn packed_self_statement(
    key: &TestKeyPair,
    auth_data: &[u8],
    client_data_json: &[u8],
) -> CborValue {
    let client_data_hash = ring::digest::digest(&ring::digest::SHA256, client_data_json);
    let mut signed = auth_data.to_vec();
    signed.extend_from_slice(client_data_hash.as_ref());

    CborValue::Map(vec![
        (
            CborValue::Text("alg".to_string()),
            CborValue::Integer(Integer::from(-7)),
        ),
        (
            CborValue::Text("sig".to_string()),
            CborValue::Bytes(key.sign(&signed)),
        ),
    ])
}

#[test]
fn test_registration_none_attestation() {
    let key = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let att_obj = attestation_object("none", CborValue::Map(vec![]), &auth_data);
    let client_data = client_data_json("Y2hhbGxlbmdl");
    let json = registration_credential(&att_obj, &client_data, json!({}));

    let credential = RegistrationCredential::from_json(&json).unwrap();
    let object = credential.attestation_object().unwrap();
    let client_data_hash = credential.client_data_hash().unwrap();
    assert_eq!(object.format(), AttestationFormat::None);

    let orchestrator = ValidationOrchestrator::with_formats(&AttestationFormat::ALL);
    let result = orchestrator.validate(&object.registration(&client_data_hash));
    assert_eq!(result.unwrap(), AttestationType::None);

    let authenticator_data = object.authenticator_data();
    let acd = authenticator_data.attested_credential_data().unwrap();
    assert_eq!(acd.credential_id(), b"mock_cred_id_123");
}

#[test]
fn test_registration_packed_self_attestation() {
    let key = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let client_data = client_data_json("cGFja2VkLXNlbGY");
    let statement = packed_self_statement(&key, &auth_data, &client_data);
    let att_obj = attestation_object("packed", statement, &auth_data);

    let (object, attestation_type) = verify_attestation(&att_obj, &client_data).unwrap();
    assert_eq!(attestation_type, AttestationType::SelfAttestation);
    assert_eq!(object.format(), AttestationFormat::Packed);
    assert!(object.authenticator_data().is_user_present());
    assert!(object.authenticator_data().is_user_verified());
}

#[test]
fn test_registration_packed_self_attestation_other_client_data() {
    let key = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let signed_client_data = client_data_json("b3JpZ2luYWw");
    let statement = packed_self_statement(&key, &auth_data, &signed_client_data);
    let att_obj = attestation_object("packed", statement, &auth_data);

    let result = verify_attestation(&att_obj, &client_data_json("cmVwbGF5ZWQ"));
    assert!(matches!(result, Err(AttestationError::BadSignature(_))));
}

#[test]
fn test_registration_packed_signed_by_other_key() {
    let key = TestKeyPair::generate();
    let other = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let client_data = client_data_json("b3RoZXIta2V5");
    let statement = packed_self_statement(&other, &auth_data, &client_data);
    let att_obj = attestation_object("packed", statement, &auth_data);

    let result = verify_attestation(&att_obj, &client_data);
    assert!(matches!(result, Err(AttestationError::BadSignature(_))));
}

#[test]
fn test_registration_client_extension_results() {
    let key = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let att_obj = attestation_object("none", CborValue::Map(vec![]), &auth_data);
    let client_data = client_data_json("ZXh0ZW5zaW9ucw");
    let json = registration_credential(
        &att_obj,
        &client_data,
        json!({ "credProps": { "rk": true }, "appid": false }),
    );

    let credential = RegistrationCredential::from_json(&json).unwrap();
    let outputs = credential.client_extension_outputs().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs.get("appid"), Some(ExtensionValue::Bool(false)));

    let cred_props = outputs
        .iter()
        .find_map(|output| output.credential_properties())
        .unwrap();
    assert_eq!(cred_props.rk, Some(true));
}

#[test]
fn test_registration_authenticator_extensions() {
    let key = TestKeyPair::generate();
    let extensions = CborValue::Map(vec![
        (
            CborValue::Text("credProtect".to_string()),
            CborValue::Integer(Integer::from(2)),
        ),
        (
            CborValue::Text("hmac-secret".to_string()),
            CborValue::Bool(true),
        ),
    ]);
    let auth_data = auth_data(&key.cose_key(), Some(&extensions));
    let client_data = client_data_json("aG1hYy1zZWNyZXQ");
    let statement = packed_self_statement(&key, &auth_data, &client_data);
    let att_obj = attestation_object("packed", statement, &auth_data);

    let (object, attestation_type) = verify_attestation(&att_obj, &client_data).unwrap();
    assert_eq!(attestation_type, AttestationType::SelfAttestation);
    assert!(object.authenticator_data().has_extension_data());

    let registry = object.authenticator_data().extensions().unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.get("credProtect"),
        Some(ExtensionValue::CredentialProtectionPolicy(
            CredentialProtectionPolicy::UserVerificationOptionalWithCredentialIdList
        ))
    );
    let hmac_secret = registry.get("hmacCreateSecret");
    assert_eq!(hmac_secret, Some(ExtensionValue::Bool(true)));
}

#[test]
fn test_registration_unknown_format() {
    let key = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let att_obj = attestation_object("unknown-fmt", CborValue::Map(vec![]), &auth_data);

    let result = verify_attestation(&att_obj, &client_data_json("dW5rbm93bg"));
    if let Err(AttestationError::BadAttestationStatement(msg)) = result {
        assert!(msg.contains("unknown-fmt"));
    } else {
        panic!("Expected AttestationError::BadAttestationStatement");
    }
}

#[test]
fn test_registration_malformed_attestation_object() {
    let result = verify_attestation("!!not base64!!", b"{}");
    assert!(matches!(result, Err(AttestationError::Decode(_))));

    // valid base64url, but not CBOR
    let result = verify_attestation("_w", b"{}");
    assert!(matches!(result, Err(AttestationError::Decode(_))));
}

#[test]
fn test_registration_format_not_enabled() {
    let key = TestKeyPair::generate();
    let auth_data = auth_data(&key.cose_key(), None);
    let att_obj = attestation_object("none", CborValue::Map(vec![]), &auth_data);
    let client_data = client_data_json("bm90LWVuYWJsZWQ");
    let json = registration_credential(&att_obj, &client_data, json!({}));

    let credential = RegistrationCredential::from_json(&json).unwrap();
    let object = credential.attestation_object().unwrap();
    let client_data_hash = credential.client_data_hash().unwrap();

    let orchestrator = ValidationOrchestrator::with_formats(&[AttestationFormat::Packed]);
    let result = orchestrator.validate(&object.registration(&client_data_hash));
    if let Err(AttestationError::Config(msg)) = result {
        assert!(msg.contains("none"));
    } else {
        panic!("Expected AttestationError::Config");
    }
}

#[test]
fn test_registration_credential_rejects_wrong_type() {
    let json = json!({
        "id": "abc",
        "rawId": "abc",
        "type": "password",
        "response": { "clientDataJSON": "e30", "attestationObject": "oA" },
    })
    .to_string();

    let result = RegistrationCredential::from_json(&json);
    assert!(matches!(result, Err(AttestationError::Decode(_))));
}

#[test]
fn test_registration_client_data_hash_matches_sha256() {
    let client_data = client_data_json("aGFzaA");
    let hash = ClientDataHash::from_client_data_json(&client_data);
    let expected = ring::digest::digest(&ring::digest::SHA256, &client_data);
    assert_eq!(hash.as_bytes().as_slice(), expected.as_ref());
}
