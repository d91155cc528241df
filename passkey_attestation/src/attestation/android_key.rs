use x509_parser::der_parser::ber::{BerObject, BerObjectContent};
use x509_parser::der_parser::der::parse_der;

use super::utils::{constant_time_eq, end_entity_certificate, ensure_supported, required};
use super::{AttestationStatementValidator, AttestationType};
use crate::certificate::{AttestationCertificate, ParsedCertificate};
use crate::config::PASSKEY_ANDROID_KEY_TEE_ENFORCED_ONLY;
use crate::errors::{AttestationError, DecodeError};
use crate::registration::RegistrationObject;
use crate::statement::{AttestationFormat, AttestationStatement};

/// Android Keystore key description extension.
pub const ANDROID_KEY_DESCRIPTION_OID: &str = "1.3.6.1.4.1.11129.2.1.17";

// AuthorizationList tags
const KM_TAG_PURPOSE: u32 = 1;
const KM_TAG_ALL_APPLICATIONS: u32 = 600;
const KM_TAG_ORIGIN: u32 = 702;

const KM_PURPOSE_SIGN: u32 = 2;
const KM_ORIGIN_GENERATED: u32 = 0;

/// Validator for `android-key` statements backed by the Android Keystore.
#[derive(Debug, Clone, Copy)]
pub struct AndroidKeyValidator {
    tee_enforced_only: bool,
}

impl Default for AndroidKeyValidator {
    fn default() -> Self {
        Self::new(*PASSKEY_ANDROID_KEY_TEE_ENFORCED_ONLY)
    }
}

impl AndroidKeyValidator {
    /// With `tee_enforced_only` the origin and purpose must be found in the
    /// TEE-enforced list; otherwise the software-enforced list counts too.
    pub fn new(tee_enforced_only: bool) -> Self {
        Self { tee_enforced_only }
    }

    fn validate_key_description(
        &self,
        description: &KeyDescription<'_>,
        registration: &RegistrationObject<'_>,
    ) -> Result<(), AttestationError> {
        if !constant_time_eq(
            description.attestation_challenge,
            registration.client_data_hash().as_bytes(),
        ) {
            return Err(AttestationError::KeyDescriptionValidation(
                "Attestation challenge does not match client data hash".to_string(),
            ));
        }

        if description.software_enforced.all_applications
            || description.tee_enforced.all_applications
        {
            return Err(AttestationError::KeyDescriptionValidation(
                "Key is scoped to all applications".to_string(),
            ));
        }

        let tee = &description.tee_enforced;
        let software = &description.software_enforced;
        let (origin, has_sign_purpose) = if self.tee_enforced_only {
            (tee.origin, tee.purposes.contains(&KM_PURPOSE_SIGN))
        } else {
            (
                tee.origin.or(software.origin),
                tee.purposes.contains(&KM_PURPOSE_SIGN)
                    || software.purposes.contains(&KM_PURPOSE_SIGN),
            )
        };

        if origin != Some(KM_ORIGIN_GENERATED) {
            return Err(AttestationError::KeyDescriptionValidation(format!(
                "Key origin must be GENERATED, got {origin:?}"
            )));
        }
        if !has_sign_purpose {
            return Err(AttestationError::KeyDescriptionValidation(
                "Key purpose does not include SIGN".to_string(),
            ));
        }
        Ok(())
    }
}

impl AttestationStatementValidator for AndroidKeyValidator {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::AndroidKey
    }

    fn validate(
        &self,
        registration: &RegistrationObject<'_>,
    ) -> Result<AttestationType, AttestationError> {
        ensure_supported(self, registration)?;
        let AttestationStatement::AndroidKey(statement) = registration.statement() else {
            return Err(AttestationError::Argument(
                "Expected an android-key statement".to_string(),
            ));
        };

        let alg = *required(&statement.alg, "alg", self.format())?;
        let sig = required(&statement.sig, "sig", self.format())?;
        let leaf = end_entity_certificate(&statement.x5c, self.format())?;
        let leaf = ParsedCertificate::from_der(leaf)?;

        leaf.verify_signature(alg, &registration.signed_data(), sig)?;

        let credential_key = registration
            .attested_credential_data()?
            .credential_public_key();
        if !credential_key.matches_subject_public_key(leaf.subject_public_key()) {
            return Err(AttestationError::PublicKeyMismatch(
                "Credential public key does not match the attestation certificate".to_string(),
            ));
        }

        let extension = leaf.raw_extension(ANDROID_KEY_DESCRIPTION_OID).ok_or_else(|| {
            AttestationError::BadAttestationStatement(
                "Attestation certificate has no key description extension".to_string(),
            )
        })?;
        let description = KeyDescription::from_der(extension)?;
        tracing::debug!(
            "Key description: software {:?}, tee {:?}",
            description.software_enforced,
            description.tee_enforced
        );
        self.validate_key_description(&description, registration)?;

        Ok(AttestationType::Basic)
    }
}

/// The parts of a Keystore `KeyDescription` that attestation relies on.
#[derive(Debug)]
struct KeyDescription<'a> {
    attestation_challenge: &'a [u8],
    software_enforced: AuthorizationList,
    tee_enforced: AuthorizationList,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct AuthorizationList {
    purposes: Vec<u32>,
    all_applications: bool,
    origin: Option<u32>,
}

impl<'a> KeyDescription<'a> {
    fn from_der(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let (_, obj) = parse_der(bytes)
            .map_err(|e| DecodeError::Asn1(format!("Failed to parse key description: {e}")))?;
        let BerObjectContent::Sequence(items) = obj.content else {
            return Err(DecodeError::Asn1(
                "Key description is not a sequence".to_string(),
            ));
        };
        if items.len() < 8 {
            return Err(DecodeError::Asn1(format!(
                "Key description has {} fields, expected 8",
                items.len()
            )));
        }

        let attestation_challenge = match items[4].content {
            BerObjectContent::OctetString(challenge) => challenge,
            _ => {
                return Err(DecodeError::Asn1(
                    "Attestation challenge is not an octet string".to_string(),
                ));
            }
        };

        Ok(Self {
            attestation_challenge,
            software_enforced: AuthorizationList::from_ber(&items[6])?,
            tee_enforced: AuthorizationList::from_ber(&items[7])?,
        })
    }
}

impl AuthorizationList {
    fn from_ber(obj: &BerObject<'_>) -> Result<Self, DecodeError> {
        let BerObjectContent::Sequence(entries) = &obj.content else {
            return Err(DecodeError::Asn1(
                "Authorization list is not a sequence".to_string(),
            ));
        };

        let mut list = Self::default();
        for entry in entries {
            if !matches!(entry.content, BerObjectContent::Unknown(_)) {
                continue;
            }
            match entry.header.tag().0 {
                KM_TAG_PURPOSE => {
                    let inner = explicit_inner(entry)?;
                    let BerObjectContent::Set(values) = inner.content else {
                        return Err(DecodeError::Asn1("Purpose is not a set".to_string()));
                    };
                    for value in values {
                        list.purposes.push(value.as_u32().map_err(|e| {
                            DecodeError::Asn1(format!("Invalid purpose value: {e:?}"))
                        })?);
                    }
                }
                KM_TAG_ALL_APPLICATIONS => list.all_applications = true,
                KM_TAG_ORIGIN => {
                    let inner = explicit_inner(entry)?;
                    list.origin = Some(inner.as_u32().map_err(|e| {
                        DecodeError::Asn1(format!("Invalid origin value: {e:?}"))
                    })?);
                }
                _ => {}
            }
        }
        Ok(list)
    }
}

/// Object wrapped by an explicit context tag.
fn explicit_inner<'a>(entry: &BerObject<'a>) -> Result<BerObject<'a>, DecodeError> {
    let content = entry
        .as_slice()
        .map_err(|e| DecodeError::Asn1(format!("Failed to read tagged entry: {e:?}")))?;
    let (_, inner) = parse_der(content)
        .map_err(|e| DecodeError::Asn1(format!("Failed to parse tagged entry: {e}")))?;
    Ok(inner)
}
