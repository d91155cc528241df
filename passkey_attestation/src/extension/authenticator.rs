use ciborium::value::Value as CborValue;

use super::{Extension, ExtensionRegistry, ExtensionValue, keyed_value, require_present};
use crate::errors::ExtensionError;

const HMAC_SECRET_ID: &str = "hmac-secret";
const HMAC_CREATE_SECRET_KEY: &str = "hmacCreateSecret";
const CRED_PROTECT_ID: &str = "credProtect";

/// `credProtect` policy values (CTAP 2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialProtectionPolicy {
    UserVerificationOptional,
    UserVerificationOptionalWithCredentialIdList,
    UserVerificationRequired,
}

impl CredentialProtectionPolicy {
    pub fn value(self) -> u8 {
        match self {
            CredentialProtectionPolicy::UserVerificationOptional => 0x01,
            CredentialProtectionPolicy::UserVerificationOptionalWithCredentialIdList => 0x02,
            CredentialProtectionPolicy::UserVerificationRequired => 0x03,
        }
    }
}

impl TryFrom<i64> for CredentialProtectionPolicy {
    type Error = ExtensionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(CredentialProtectionPolicy::UserVerificationOptional),
            0x02 => Ok(CredentialProtectionPolicy::UserVerificationOptionalWithCredentialIdList),
            0x03 => Ok(CredentialProtectionPolicy::UserVerificationRequired),
            other => Err(ExtensionError::ConstraintViolation(format!(
                "Unknown credential protection policy: {other}"
            ))),
        }
    }
}

/// Extension inputs sent to the authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorExtensionInput {
    HmacCreateSecret(Option<bool>),
    CredentialProtection(Option<CredentialProtectionPolicy>),
}

impl Extension for AuthenticatorExtensionInput {
    fn identifier(&self) -> &'static str {
        match self {
            AuthenticatorExtensionInput::HmacCreateSecret(_) => HMAC_SECRET_ID,
            AuthenticatorExtensionInput::CredentialProtection(_) => CRED_PROTECT_ID,
        }
    }

    fn value(&self, key: &str) -> Result<Option<ExtensionValue>, ExtensionError> {
        match self {
            AuthenticatorExtensionInput::HmacCreateSecret(v) => {
                keyed_value(key, HMAC_CREATE_SECRET_KEY, v.map(ExtensionValue::Bool))
            }
            AuthenticatorExtensionInput::CredentialProtection(v) => keyed_value(
                key,
                CRED_PROTECT_ID,
                v.map(ExtensionValue::CredentialProtectionPolicy),
            ),
        }
    }

    fn validate(&self) -> Result<(), ExtensionError> {
        match self {
            Self::HmacCreateSecret(v) => require_present(self.identifier(), v),
            Self::CredentialProtection(v) => require_present(self.identifier(), v),
        }
    }
}

/// Extension outputs reported in authenticator data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorExtensionOutput {
    HmacCreateSecret(Option<bool>),
    CredentialProtection(Option<CredentialProtectionPolicy>),
}

impl AuthenticatorExtensionOutput {
    pub fn hmac_create_secret(&self) -> Option<bool> {
        match self {
            AuthenticatorExtensionOutput::HmacCreateSecret(v) => *v,
            _ => None,
        }
    }

    pub fn credential_protection_policy(&self) -> Option<CredentialProtectionPolicy> {
        match self {
            AuthenticatorExtensionOutput::CredentialProtection(v) => *v,
            _ => None,
        }
    }

    /// Decode one entry of the authenticator data extension map.
    ///
    /// Returns `Ok(None)` for identifiers this crate does not model.
    fn from_cbor_entry(
        identifier: &str,
        value: &CborValue,
    ) -> Result<Option<Self>, ExtensionError> {
        match identifier {
            HMAC_SECRET_ID => match value {
                CborValue::Bool(b) => Ok(Some(Self::HmacCreateSecret(Some(*b)))),
                _ => Err(ExtensionError::ConstraintViolation(
                    "hmac-secret output must be a boolean".to_string(),
                )),
            },
            CRED_PROTECT_ID => {
                let policy = match value {
                    CborValue::Integer(i) => i64::try_from(*i).ok(),
                    _ => None,
                }
                .ok_or_else(|| {
                    ExtensionError::ConstraintViolation(
                        "credProtect output must be an integer".to_string(),
                    )
                })?;
                let policy = CredentialProtectionPolicy::try_from(policy)?;
                Ok(Some(Self::CredentialProtection(Some(policy))))
            }
            other => {
                tracing::debug!("Ignoring unsupported authenticator extension: {}", other);
                Ok(None)
            }
        }
    }
}

impl Extension for AuthenticatorExtensionOutput {
    fn identifier(&self) -> &'static str {
        match self {
            AuthenticatorExtensionOutput::HmacCreateSecret(_) => HMAC_SECRET_ID,
            AuthenticatorExtensionOutput::CredentialProtection(_) => CRED_PROTECT_ID,
        }
    }

    fn value(&self, key: &str) -> Result<Option<ExtensionValue>, ExtensionError> {
        match self {
            AuthenticatorExtensionOutput::HmacCreateSecret(v) => {
                keyed_value(key, HMAC_CREATE_SECRET_KEY, v.map(ExtensionValue::Bool))
            }
            AuthenticatorExtensionOutput::CredentialProtection(v) => keyed_value(
                key,
                CRED_PROTECT_ID,
                v.map(ExtensionValue::CredentialProtectionPolicy),
            ),
        }
    }

    fn validate(&self) -> Result<(), ExtensionError> {
        match self {
            Self::HmacCreateSecret(v) => require_present(self.identifier(), v),
            Self::CredentialProtection(v) => require_present(self.identifier(), v),
        }
    }
}

impl ExtensionRegistry<AuthenticatorExtensionOutput> {
    /// Build the registry from the CBOR extension map that trails the
    /// attested credential data.
    pub fn from_cbor(value: &CborValue) -> Result<Self, ExtensionError> {
        let CborValue::Map(entries) = value else {
            return Err(ExtensionError::ConstraintViolation(
                "Authenticator extension outputs must be a CBOR map".to_string(),
            ));
        };

        let mut registry = Self::new();
        for (k, v) in entries {
            let CborValue::Text(identifier) = k else {
                return Err(ExtensionError::ConstraintViolation(
                    "Authenticator extension identifier must be a text string".to_string(),
                ));
            };
            if let Some(output) = AuthenticatorExtensionOutput::from_cbor_entry(identifier, v)? {
                registry.insert(output)?;
            }
        }
        Ok(registry)
    }
}
