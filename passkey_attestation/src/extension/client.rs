use serde::{Deserialize, Serialize};

use super::{Extension, ExtensionRegistry, ExtensionValue, keyed_value, require_present};
use crate::errors::{AttestationError, DecodeError, ExtensionError};

const APPID_ID: &str = "appid";
const CRED_PROPS_ID: &str = "credProps";
const HMAC_CREATE_SECRET_ID: &str = "hmacCreateSecret";

/// Output of the `credProps` client extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPropertiesOutput {
    /// Whether the credential is client-side discoverable, if known
    pub rk: Option<bool>,
}

/// Client extension inputs passed in the credential creation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientExtensionInput {
    FidoAppId(Option<String>),
    CredentialProperties(Option<bool>),
    HmacCreateSecret(Option<bool>),
}

impl Extension for ClientExtensionInput {
    fn identifier(&self) -> &'static str {
        match self {
            ClientExtensionInput::FidoAppId(_) => APPID_ID,
            ClientExtensionInput::CredentialProperties(_) => CRED_PROPS_ID,
            ClientExtensionInput::HmacCreateSecret(_) => HMAC_CREATE_SECRET_ID,
        }
    }

    fn value(&self, key: &str) -> Result<Option<ExtensionValue>, ExtensionError> {
        match self {
            ClientExtensionInput::FidoAppId(v) => {
                keyed_value(key, APPID_ID, v.clone().map(ExtensionValue::Text))
            }
            ClientExtensionInput::CredentialProperties(v) => {
                keyed_value(key, CRED_PROPS_ID, v.map(ExtensionValue::Bool))
            }
            ClientExtensionInput::HmacCreateSecret(v) => {
                keyed_value(key, HMAC_CREATE_SECRET_ID, v.map(ExtensionValue::Bool))
            }
        }
    }

    fn validate(&self) -> Result<(), ExtensionError> {
        match self {
            ClientExtensionInput::FidoAppId(v) => {
                require_present(self.identifier(), v)?;
                if v.as_deref().is_some_and(str::is_empty) {
                    return Err(ExtensionError::ConstraintViolation(
                        "appid must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            ClientExtensionInput::CredentialProperties(v) => require_present(self.identifier(), v),
            ClientExtensionInput::HmacCreateSecret(v) => require_present(self.identifier(), v),
        }
    }
}

/// Client extension outputs returned by `getClientExtensionResults()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientExtensionOutput {
    FidoAppId(Option<bool>),
    CredentialProperties(Option<CredentialPropertiesOutput>),
    HmacCreateSecret(Option<bool>),
}

impl ClientExtensionOutput {
    pub fn appid(&self) -> Option<bool> {
        match self {
            ClientExtensionOutput::FidoAppId(v) => *v,
            _ => None,
        }
    }

    pub fn credential_properties(&self) -> Option<CredentialPropertiesOutput> {
        match self {
            ClientExtensionOutput::CredentialProperties(v) => *v,
            _ => None,
        }
    }

    pub fn hmac_create_secret(&self) -> Option<bool> {
        match self {
            ClientExtensionOutput::HmacCreateSecret(v) => *v,
            _ => None,
        }
    }
}

impl Extension for ClientExtensionOutput {
    fn identifier(&self) -> &'static str {
        match self {
            ClientExtensionOutput::FidoAppId(_) => APPID_ID,
            ClientExtensionOutput::CredentialProperties(_) => CRED_PROPS_ID,
            ClientExtensionOutput::HmacCreateSecret(_) => HMAC_CREATE_SECRET_ID,
        }
    }

    fn value(&self, key: &str) -> Result<Option<ExtensionValue>, ExtensionError> {
        match self {
            ClientExtensionOutput::FidoAppId(v) => {
                keyed_value(key, APPID_ID, v.map(ExtensionValue::Bool))
            }
            ClientExtensionOutput::CredentialProperties(v) => keyed_value(
                key,
                CRED_PROPS_ID,
                v.map(ExtensionValue::CredentialProperties),
            ),
            ClientExtensionOutput::HmacCreateSecret(v) => {
                keyed_value(key, HMAC_CREATE_SECRET_ID, v.map(ExtensionValue::Bool))
            }
        }
    }

    fn validate(&self) -> Result<(), ExtensionError> {
        match self {
            ClientExtensionOutput::FidoAppId(v) => require_present(self.identifier(), v),
            ClientExtensionOutput::CredentialProperties(v) => require_present(self.identifier(), v),
            ClientExtensionOutput::HmacCreateSecret(v) => require_present(self.identifier(), v),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientExtensionResults {
    appid: Option<bool>,
    cred_props: Option<CredentialPropertiesOutput>,
    hmac_create_secret: Option<bool>,
}

impl ExtensionRegistry<ClientExtensionOutput> {
    /// Build the registry from the client's JSON extension results.
    ///
    /// Unknown members are ignored; members that are `null` are treated as
    /// absent.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, AttestationError> {
        let results = ClientExtensionResults::deserialize(value).map_err(DecodeError::from)?;
        tracing::debug!("Client extension results: {:?}", results);

        let mut registry = Self::new();
        if let Some(appid) = results.appid {
            registry.insert(ClientExtensionOutput::FidoAppId(Some(appid)))?;
        }
        if let Some(props) = results.cred_props {
            registry.insert(ClientExtensionOutput::CredentialProperties(Some(props)))?;
        }
        if let Some(hmac) = results.hmac_create_secret {
            registry.insert(ClientExtensionOutput::HmacCreateSecret(Some(hmac)))?;
        }
        Ok(registry)
    }
}
