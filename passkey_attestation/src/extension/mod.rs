//! WebAuthn extension inputs and outputs.
//!
//! Each category is a closed enum implementing [`Extension`]. Instances are
//! collected in an [`ExtensionRegistry`] keyed by their identifier; the
//! registry validates every extension once, on insertion.

mod authenticator;
mod client;

use std::collections::BTreeMap;

use crate::errors::ExtensionError;

pub use authenticator::{
    AuthenticatorExtensionInput, AuthenticatorExtensionOutput, CredentialProtectionPolicy,
};
pub use client::{ClientExtensionInput, ClientExtensionOutput, CredentialPropertiesOutput};

/// Value held by an extension, as returned by the generic accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionValue {
    Bool(bool),
    Text(String),
    CredentialProtectionPolicy(CredentialProtectionPolicy),
    CredentialProperties(CredentialPropertiesOutput),
}

/// Capabilities shared by every extension input and output.
pub trait Extension {
    /// Stable identifier, used as the registry key.
    fn identifier(&self) -> &'static str;

    /// Value stored under `key`.
    ///
    /// Fails with [`ExtensionError::Argument`] when `key` is not the
    /// extension's own key. Returns `Ok(None)` when the value is absent.
    fn value(&self, key: &str) -> Result<Option<ExtensionValue>, ExtensionError>;

    /// Check internal consistency. Fails with
    /// [`ExtensionError::ConstraintViolation`] when a required value is absent.
    fn validate(&self) -> Result<(), ExtensionError>;
}

/// Identifier-keyed set of validated extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRegistry<E> {
    entries: BTreeMap<&'static str, E>,
}

impl<E> Default for ExtensionRegistry<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<E: Extension> ExtensionRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `extensions`, validating each one.
    pub fn from_extensions<I>(extensions: I) -> Result<Self, ExtensionError>
    where
        I: IntoIterator<Item = E>,
    {
        let mut registry = Self::new();
        for extension in extensions {
            registry.insert(extension)?;
        }
        Ok(registry)
    }

    /// Validate and insert `extension`.
    ///
    /// Fails if the extension is invalid or its identifier is already present.
    pub fn insert(&mut self, extension: E) -> Result<(), ExtensionError> {
        extension.validate()?;
        let identifier = extension.identifier();
        if self.entries.contains_key(identifier) {
            return Err(ExtensionError::Argument(format!(
                "Duplicate extension: {identifier}"
            )));
        }
        tracing::debug!("Registered extension: {}", identifier);
        self.entries.insert(identifier, extension);
        Ok(())
    }

    /// Extension registered under `identifier`.
    pub fn extension(&self, identifier: &str) -> Option<&E> {
        self.entries.get(identifier)
    }

    /// Value stored under `key` by whichever extension owns that key.
    pub fn get(&self, key: &str) -> Option<ExtensionValue> {
        self.entries
            .values()
            .find_map(|extension| extension.value(key).ok().flatten())
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared `value(key)` implementation: `key` must equal `expected`.
pub(crate) fn keyed_value(
    key: &str,
    expected: &str,
    value: Option<ExtensionValue>,
) -> Result<Option<ExtensionValue>, ExtensionError> {
    if key != expected {
        return Err(ExtensionError::Argument(format!(
            "Invalid key '{key}', expected '{expected}'"
        )));
    }
    Ok(value)
}

/// Shared `validate()` implementation: the value must be present.
pub(crate) fn require_present<T>(
    identifier: &str,
    value: &Option<T>,
) -> Result<(), ExtensionError> {
    match value {
        Some(_) => Ok(()),
        None => Err(ExtensionError::ConstraintViolation(format!(
            "Value of extension '{identifier}' must not be absent"
        ))),
    }
}
