use std::fmt;

use uuid::Uuid;

use crate::errors::AttestationError;

/// Authenticator Attestation GUID: a 16-byte model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aaguid([u8; 16]);

impl Aaguid {
    /// All-zero AAGUID reported by authenticators that do not disclose their model.
    pub const ZERO: Aaguid = Aaguid([0; 16]);

    /// App Attest key generated in the development environment.
    pub const APP_ATTEST_DEVELOPMENT: Aaguid = Aaguid(*b"appattestdevelop");

    /// App Attest key generated in the production environment.
    pub const APP_ATTEST_PRODUCTION: Aaguid = Aaguid(*b"appattest\0\0\0\0\0\0\0");

    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Aaguid {
    type Error = AttestationError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| {
            AttestationError::AuthenticatorData(format!(
                "AAGUID must be 16 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).hyphenated())
    }
}
