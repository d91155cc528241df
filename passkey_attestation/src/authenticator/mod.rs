//! Authenticator data model: flags, counter, attested credential data and
//! extension outputs.

mod aaguid;
mod cose;
mod data;

pub use aaguid::Aaguid;
pub use cose::{
    CURVE_ED25519, CURVE_P256, CURVE_P384, CoseAlgorithm, CoseKey, CredentialPublicKey,
};
pub use data::{AttestedCredentialData, AuthenticatorData, auth_data_flags};

pub(crate) use cose::integer_value;
