use ciborium::value::Value as CborValue;

use super::aaguid::Aaguid;
use super::cose::CredentialPublicKey;
use crate::errors::{AttestationError, DecodeError};
use crate::extension::{AuthenticatorExtensionOutput, ExtensionRegistry};

/// Authenticator data flag bits
pub mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub const BS: u8 = 1 << 4;
    /// Attested Credential Data Present - Bit 6
    pub const AT: u8 = 1 << 6;
    /// Extension Data Present - Bit 7
    pub const ED: u8 = 1 << 7;
}

const RP_ID_HASH_LEN: usize = 32;
const MIN_AUTH_DATA_LEN: usize = 37;

/// Credential block present when the AT flag is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    aaguid: Aaguid,
    credential_id: Vec<u8>,
    credential_public_key: CredentialPublicKey,
}

impl AttestedCredentialData {
    pub fn new(
        aaguid: Aaguid,
        credential_id: Vec<u8>,
        credential_public_key: CredentialPublicKey,
    ) -> Self {
        Self {
            aaguid,
            credential_id,
            credential_public_key,
        }
    }

    pub fn aaguid(&self) -> &Aaguid {
        &self.aaguid
    }

    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    pub fn credential_public_key(&self) -> &CredentialPublicKey {
        &self.credential_public_key
    }
}

/// Typed view over the authenticator data of one ceremony.
///
/// Invariant: the AT flag is set iff attested credential data is present, and
/// the ED flag is set iff extension outputs are present.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData<E = AuthenticatorExtensionOutput> {
    rp_id_hash: [u8; 32],
    flags: u8,
    sign_count: u32,
    attested_credential_data: Option<AttestedCredentialData>,
    extensions: Option<ExtensionRegistry<E>>,
}

impl<E> AuthenticatorData<E> {
    pub fn new(
        rp_id_hash: [u8; 32],
        flags: u8,
        sign_count: u32,
        attested_credential_data: Option<AttestedCredentialData>,
        extensions: Option<ExtensionRegistry<E>>,
    ) -> Result<Self, AttestationError> {
        let at = flags & auth_data_flags::AT != 0;
        if at != attested_credential_data.is_some() {
            return Err(AttestationError::AuthenticatorData(format!(
                "AT flag is {} but attested credential data is {}",
                if at { "set" } else { "unset" },
                if attested_credential_data.is_some() { "present" } else { "absent" }
            )));
        }

        let ed = flags & auth_data_flags::ED != 0;
        if ed != extensions.is_some() {
            return Err(AttestationError::AuthenticatorData(format!(
                "ED flag is {} but extension data is {}",
                if ed { "set" } else { "unset" },
                if extensions.is_some() { "present" } else { "absent" }
            )));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }

    pub fn rp_id_hash(&self) -> &[u8; 32] {
        &self.rp_id_hash
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn sign_count(&self) -> u32 {
        self.sign_count
    }

    pub fn attested_credential_data(&self) -> Option<&AttestedCredentialData> {
        self.attested_credential_data.as_ref()
    }

    pub fn extensions(&self) -> Option<&ExtensionRegistry<E>> {
        self.extensions.as_ref()
    }

    pub fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    pub fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub fn is_backup_eligible(&self) -> bool {
        (self.flags & auth_data_flags::BE) != 0
    }

    pub fn is_backed_up(&self) -> bool {
        (self.flags & auth_data_flags::BS) != 0
    }

    pub fn has_attested_credential_data(&self) -> bool {
        (self.flags & auth_data_flags::AT) != 0
    }

    pub fn has_extension_data(&self) -> bool {
        (self.flags & auth_data_flags::ED) != 0
    }
}

impl AuthenticatorData<AuthenticatorExtensionOutput> {
    /// Parse raw authenticator data.
    /// Format (minimum 37 bytes):
    /// - RP ID Hash (32 bytes)
    /// - Flags (1 byte)
    /// - Counter (4 bytes, big-endian)
    /// - Optional: Attested Credential Data (AAGUID, id length, id, COSE key)
    /// - Optional: Extensions (CBOR map)
    pub fn from_bytes(data: &[u8]) -> Result<Self, AttestationError> {
        if data.len() < MIN_AUTH_DATA_LEN {
            return Err(AttestationError::AuthenticatorData(format!(
                "Authenticator data too short: {} bytes",
                data.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&data[..RP_ID_HASH_LEN]);
        let flags = data[32];
        let sign_count = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

        tracing::debug!(
            "Authenticator data flags: {:#04x}, sign count: {}",
            flags,
            sign_count
        );

        let mut rest = &data[MIN_AUTH_DATA_LEN..];

        let attested_credential_data = if flags & auth_data_flags::AT != 0 {
            Some(parse_attested_credential_data(&mut rest)?)
        } else {
            None
        };

        let extensions = if flags & auth_data_flags::ED != 0 {
            let value: CborValue = ciborium::de::from_reader(&mut rest).map_err(|e| {
                DecodeError::Cbor(format!("Invalid extension data CBOR: {e}"))
            })?;
            let registry = ExtensionRegistry::<AuthenticatorExtensionOutput>::from_cbor(&value)?;
            Some(registry)
        } else {
            None
        };

        if !rest.is_empty() {
            return Err(AttestationError::AuthenticatorData(format!(
                "{} unexpected trailing bytes in authenticator data",
                rest.len()
            )));
        }

        Self::new(
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        )
    }
}

fn parse_attested_credential_data(
    rest: &mut &[u8],
) -> Result<AttestedCredentialData, AttestationError> {
    if rest.len() < 18 {
        return Err(AttestationError::AuthenticatorData(
            "Authenticator data too short for attested credential data".to_string(),
        ));
    }

    let aaguid = Aaguid::try_from(&rest[..16])?;
    let cred_id_len = u16::from_be_bytes([rest[16], rest[17]]) as usize;
    *rest = &rest[18..];

    if rest.len() < cred_id_len {
        return Err(AttestationError::AuthenticatorData(format!(
            "Credential id length {} exceeds remaining {} bytes",
            cred_id_len,
            rest.len()
        )));
    }
    let credential_id = rest[..cred_id_len].to_vec();
    *rest = &rest[cred_id_len..];

    let key_value: CborValue = ciborium::de::from_reader(&mut *rest)
        .map_err(|e| DecodeError::Cbor(format!("Invalid credential public key CBOR: {e}")))?;
    let credential_public_key = CredentialPublicKey::from_cbor(&key_value)?;

    tracing::debug!("Attested credential AAGUID: {}", aaguid);

    Ok(AttestedCredentialData::new(
        aaguid,
        credential_id,
        credential_public_key,
    ))
}
