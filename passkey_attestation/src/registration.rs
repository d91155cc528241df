use ciborium::value::Value as CborValue;
use serde::{Deserialize, Serialize};

use crate::authenticator::{AttestedCredentialData, AuthenticatorData};
use crate::errors::{AttestationError, DecodeError};
use crate::extension::{ClientExtensionOutput, ExtensionRegistry};
use crate::statement::{AttestationFormat, AttestationStatement};
use crate::utils::{base64url_decode, sha256};

/// SHA-256 of the client data JSON of one ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientDataHash([u8; 32]);

impl ClientDataHash {
    pub const fn new(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Hash the raw `clientDataJSON` bytes.
    pub fn from_client_data_json(client_data_json: &[u8]) -> Self {
        Self(sha256(&[client_data_json]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<&[u8]> for ClientDataHash {
    type Error = AttestationError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let hash: [u8; 32] = bytes.try_into().map_err(|_| {
            AttestationError::Argument(format!(
                "Client data hash must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(hash))
    }
}

impl AsRef<[u8]> for ClientDataHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Decoded `attestationObject`: format, statement and authenticator data.
///
/// The raw authenticator data bytes are kept because every statement signs
/// or hashes them verbatim.
#[derive(Debug, Clone)]
pub struct AttestationObject {
    statement: AttestationStatement,
    authenticator_data_bytes: Vec<u8>,
    authenticator_data: AuthenticatorData,
}

impl AttestationObject {
    /// Decode the CBOR `{fmt, attStmt, authData}` document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AttestationError> {
        let value: CborValue = ciborium::de::from_reader(bytes)
            .map_err(|e| DecodeError::Cbor(format!("Invalid attestation object CBOR: {e}")))?;

        let CborValue::Map(entries) = value else {
            let msg = "Attestation object is not a CBOR map".to_string();
            return Err(DecodeError::Cbor(msg).into());
        };

        let mut fmt = None;
        let mut att_stmt = None;
        let mut auth_data = None;
        for (k, v) in entries {
            match (k, v) {
                (CborValue::Text(k), CborValue::Text(v)) if k == "fmt" => fmt = Some(v),
                (CborValue::Text(k), v @ CborValue::Map(_)) if k == "attStmt" => att_stmt = Some(v),
                (CborValue::Text(k), CborValue::Bytes(v)) if k == "authData" => auth_data = Some(v),
                (k, _) => tracing::debug!("Ignoring attestation object entry: {:?}", k),
            }
        }

        let fmt = fmt.ok_or_else(|| {
            AttestationError::BadAttestationStatement(
                "Missing fmt in attestation object".to_string(),
            )
        })?;
        let att_stmt = att_stmt.ok_or_else(|| {
            AttestationError::BadAttestationStatement(
                "Missing attStmt in attestation object".to_string(),
            )
        })?;
        let authenticator_data_bytes = auth_data.ok_or_else(|| {
            AttestationError::BadAttestationStatement(
                "Missing authData in attestation object".to_string(),
            )
        })?;

        let format: AttestationFormat = fmt.parse()?;
        let statement = AttestationStatement::from_cbor(format, &att_stmt)?;
        let authenticator_data = AuthenticatorData::from_bytes(&authenticator_data_bytes)?;

        tracing::debug!(
            "Decoded attestation object: fmt={}, authData={} bytes",
            format,
            authenticator_data_bytes.len()
        );

        Ok(Self {
            statement,
            authenticator_data_bytes,
            authenticator_data,
        })
    }

    /// Decode the base64url `attestationObject` string sent by the browser.
    pub fn from_base64url(encoded: &str) -> Result<Self, AttestationError> {
        let bytes = base64url_decode(encoded)?;
        Self::from_bytes(&bytes)
    }

    pub fn format(&self) -> AttestationFormat {
        self.statement.format()
    }

    pub fn statement(&self) -> &AttestationStatement {
        &self.statement
    }

    pub fn authenticator_data_bytes(&self) -> &[u8] {
        &self.authenticator_data_bytes
    }

    pub fn authenticator_data(&self) -> &AuthenticatorData {
        &self.authenticator_data
    }

    /// Pair this object with the ceremony's client data hash.
    pub fn registration<'a>(
        &'a self,
        client_data_hash: &'a ClientDataHash,
    ) -> RegistrationObject<'a> {
        RegistrationObject::new(
            &self.statement,
            &self.authenticator_data_bytes,
            &self.authenticator_data,
            client_data_hash,
        )
    }
}

/// Inputs of one statement validation, borrowed for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationObject<'a> {
    statement: &'a AttestationStatement,
    authenticator_data_bytes: &'a [u8],
    authenticator_data: &'a AuthenticatorData,
    client_data_hash: &'a ClientDataHash,
}

impl<'a> RegistrationObject<'a> {
    pub fn new(
        statement: &'a AttestationStatement,
        authenticator_data_bytes: &'a [u8],
        authenticator_data: &'a AuthenticatorData,
        client_data_hash: &'a ClientDataHash,
    ) -> Self {
        Self {
            statement,
            authenticator_data_bytes,
            authenticator_data,
            client_data_hash,
        }
    }

    pub fn statement(&self) -> &'a AttestationStatement {
        self.statement
    }

    pub fn format(&self) -> AttestationFormat {
        self.statement.format()
    }

    pub fn authenticator_data_bytes(&self) -> &'a [u8] {
        self.authenticator_data_bytes
    }

    pub fn authenticator_data(&self) -> &'a AuthenticatorData {
        self.authenticator_data
    }

    pub fn client_data_hash(&self) -> &'a ClientDataHash {
        self.client_data_hash
    }

    /// Attested credential data, required by every statement format.
    pub fn attested_credential_data(&self) -> Result<&'a AttestedCredentialData, AttestationError> {
        self.authenticator_data
            .attested_credential_data()
            .ok_or_else(|| {
                AttestationError::BadAttestationStatement(format!(
                    "{} attestation requires attested credential data",
                    self.format()
                ))
            })
    }

    /// `authenticatorData || clientDataHash`, the payload most formats sign.
    pub fn signed_data(&self) -> Vec<u8> {
        let len = self.authenticator_data_bytes.len() + self.client_data_hash.0.len();
        let mut data = Vec::with_capacity(len);
        data.extend_from_slice(self.authenticator_data_bytes);
        data.extend_from_slice(&self.client_data_hash.0);
        data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKeyCredentialType {
    #[serde(rename = "public-key")]
    PublicKey,
}

/// Attestation response members of a registration credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
}

/// `PublicKeyCredential` JSON posted by the browser after
/// `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCredential {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: PublicKeyCredentialType,
    pub response: AuthenticatorAttestationResponse,
    #[serde(default)]
    pub client_extension_results: serde_json::Value,
}

impl RegistrationCredential {
    pub fn from_json(json: &str) -> Result<Self, AttestationError> {
        Ok(serde_json::from_str(json).map_err(DecodeError::from)?)
    }

    pub fn client_data_hash(&self) -> Result<ClientDataHash, AttestationError> {
        let client_data = base64url_decode(&self.response.client_data_json)?;
        Ok(ClientDataHash::from_client_data_json(&client_data))
    }

    pub fn attestation_object(&self) -> Result<AttestationObject, AttestationError> {
        AttestationObject::from_base64url(&self.response.attestation_object)
    }

    pub fn client_extension_outputs(
        &self,
    ) -> Result<ExtensionRegistry<ClientExtensionOutput>, AttestationError> {
        match &self.client_extension_results {
            serde_json::Value::Null => Ok(ExtensionRegistry::new()),
            value => ExtensionRegistry::from_json(value),
        }
    }
}
