use std::fmt;
use std::str::FromStr;

use ciborium::value::Value as CborValue;

use crate::authenticator::{CoseAlgorithm, integer_value};
use crate::certificate::CertificatePath;
use crate::errors::AttestationError;

/// Attestation statement format identifiers (`fmt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttestationFormat {
    Packed,
    Tpm,
    AndroidKey,
    AndroidSafetyNet,
    FidoU2f,
    Apple,
    AppleAppAttest,
    None,
}

impl AttestationFormat {
    pub const ALL: [AttestationFormat; 8] = [
        AttestationFormat::Packed,
        AttestationFormat::Tpm,
        AttestationFormat::AndroidKey,
        AttestationFormat::AndroidSafetyNet,
        AttestationFormat::FidoU2f,
        AttestationFormat::Apple,
        AttestationFormat::AppleAppAttest,
        AttestationFormat::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationFormat::Packed => "packed",
            AttestationFormat::Tpm => "tpm",
            AttestationFormat::AndroidKey => "android-key",
            AttestationFormat::AndroidSafetyNet => "android-safetynet",
            AttestationFormat::FidoU2f => "fido-u2f",
            AttestationFormat::Apple => "apple",
            AttestationFormat::AppleAppAttest => "apple-appattest",
            AttestationFormat::None => "none",
        }
    }
}

impl fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttestationFormat {
    type Err = AttestationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttestationFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                AttestationError::BadAttestationStatement(format!(
                    "Unsupported attestation format: {s}"
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedStatement {
    pub alg: Option<CoseAlgorithm>,
    pub sig: Option<Vec<u8>>,
    pub x5c: Option<CertificatePath>,
    pub ecdaa_key_id: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TpmStatement {
    pub ver: Option<String>,
    pub alg: Option<CoseAlgorithm>,
    pub sig: Option<Vec<u8>>,
    pub x5c: Option<CertificatePath>,
    pub cert_info: Option<Vec<u8>>,
    pub pub_area: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AndroidKeyStatement {
    pub alg: Option<CoseAlgorithm>,
    pub sig: Option<Vec<u8>>,
    pub x5c: Option<CertificatePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AndroidSafetyNetStatement {
    pub ver: Option<String>,
    /// Compact JWS returned by the SafetyNet API, as UTF-8 bytes
    pub response: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FidoU2fStatement {
    pub sig: Option<Vec<u8>>,
    pub x5c: Option<CertificatePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleAnonymousStatement {
    pub x5c: Option<CertificatePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleAppAttestStatement {
    pub x5c: Option<CertificatePath>,
    pub receipt: Option<Vec<u8>>,
}

/// Format-specific attestation evidence (`attStmt`), tagged by format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatement {
    Packed(PackedStatement),
    Tpm(TpmStatement),
    AndroidKey(AndroidKeyStatement),
    AndroidSafetyNet(AndroidSafetyNetStatement),
    FidoU2f(FidoU2fStatement),
    Apple(AppleAnonymousStatement),
    AppleAppAttest(AppleAppAttestStatement),
    None,
}

impl AttestationStatement {
    pub fn format(&self) -> AttestationFormat {
        match self {
            AttestationStatement::Packed(_) => AttestationFormat::Packed,
            AttestationStatement::Tpm(_) => AttestationFormat::Tpm,
            AttestationStatement::AndroidKey(_) => AttestationFormat::AndroidKey,
            AttestationStatement::AndroidSafetyNet(_) => AttestationFormat::AndroidSafetyNet,
            AttestationStatement::FidoU2f(_) => AttestationFormat::FidoU2f,
            AttestationStatement::Apple(_) => AttestationFormat::Apple,
            AttestationStatement::AppleAppAttest(_) => AttestationFormat::AppleAppAttest,
            AttestationStatement::None => AttestationFormat::None,
        }
    }

    /// Map a decoded `attStmt` CBOR map onto the variant for `format`.
    ///
    /// Fields are optional here; each validator decides which are required.
    /// A field present with the wrong CBOR type is rejected.
    pub fn from_cbor(
        format: AttestationFormat,
        value: &CborValue,
    ) -> Result<Self, AttestationError> {
        let fields = StatementFields::new(value)?;

        let statement = match format {
            AttestationFormat::Packed => AttestationStatement::Packed(PackedStatement {
                alg: fields.alg()?,
                sig: fields.bytes("sig")?,
                x5c: fields.x5c()?,
                ecdaa_key_id: fields.bytes("ecdaaKeyId")?,
            }),
            AttestationFormat::Tpm => AttestationStatement::Tpm(TpmStatement {
                ver: fields.text("ver")?,
                alg: fields.alg()?,
                sig: fields.bytes("sig")?,
                x5c: fields.x5c()?,
                cert_info: fields.bytes("certInfo")?,
                pub_area: fields.bytes("pubArea")?,
            }),
            AttestationFormat::AndroidKey => AttestationStatement::AndroidKey(AndroidKeyStatement {
                alg: fields.alg()?,
                sig: fields.bytes("sig")?,
                x5c: fields.x5c()?,
            }),
            AttestationFormat::AndroidSafetyNet => {
                AttestationStatement::AndroidSafetyNet(AndroidSafetyNetStatement {
                    ver: fields.text("ver")?,
                    response: fields.bytes("response")?,
                })
            }
            AttestationFormat::FidoU2f => AttestationStatement::FidoU2f(FidoU2fStatement {
                sig: fields.bytes("sig")?,
                x5c: fields.x5c()?,
            }),
            AttestationFormat::Apple => AttestationStatement::Apple(AppleAnonymousStatement {
                x5c: fields.x5c()?,
            }),
            AttestationFormat::AppleAppAttest => {
                AttestationStatement::AppleAppAttest(AppleAppAttestStatement {
                    x5c: fields.x5c()?,
                    receipt: fields.bytes("receipt")?,
                })
            }
            AttestationFormat::None => {
                if !fields.is_empty() {
                    return Err(AttestationError::BadAttestationStatement(
                        "attStmt must be empty for none attestation".to_string(),
                    ));
                }
                AttestationStatement::None
            }
        };

        tracing::debug!("Decoded {} attestation statement", format);
        Ok(statement)
    }
}

/// Text-keyed view over an `attStmt` map.
struct StatementFields<'a> {
    entries: Vec<(&'a str, &'a CborValue)>,
}

impl<'a> StatementFields<'a> {
    fn new(value: &'a CborValue) -> Result<Self, AttestationError> {
        let CborValue::Map(map) = value else {
            return Err(AttestationError::BadAttestationStatement(
                "attStmt is not a CBOR map".to_string(),
            ));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (k, v) in map {
            match k {
                CborValue::Text(key) => entries.push((key.as_str(), v)),
                other => {
                    return Err(AttestationError::BadAttestationStatement(format!(
                        "attStmt key is not a text string: {other:?}"
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, key: &str) -> Option<&'a CborValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn bytes(&self, key: &str) -> Result<Option<Vec<u8>>, AttestationError> {
        match self.get(key) {
            None => Ok(None),
            Some(CborValue::Bytes(b)) => Ok(Some(b.clone())),
            Some(_) => Err(wrong_type(key, "a byte string")),
        }
    }

    fn text(&self, key: &str) -> Result<Option<String>, AttestationError> {
        match self.get(key) {
            None => Ok(None),
            Some(CborValue::Text(t)) => Ok(Some(t.clone())),
            Some(_) => Err(wrong_type(key, "a text string")),
        }
    }

    fn alg(&self) -> Result<Option<CoseAlgorithm>, AttestationError> {
        match self.get("alg") {
            None => Ok(None),
            Some(value) => {
                let alg = integer_value(value).ok_or_else(|| wrong_type("alg", "an integer"))?;
                CoseAlgorithm::try_from(alg).map(Some)
            }
        }
    }

    fn x5c(&self) -> Result<Option<CertificatePath>, AttestationError> {
        match self.get("x5c") {
            None => Ok(None),
            Some(CborValue::Array(items)) => {
                let mut certificates = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        CborValue::Bytes(der) => certificates.push(der.clone()),
                        _ => return Err(wrong_type("x5c entry", "a byte string")),
                    }
                }
                tracing::debug!("Found x5c with {} certificates", certificates.len());
                Ok(Some(CertificatePath::new(certificates)))
            }
            Some(_) => Err(wrong_type("x5c", "an array")),
        }
    }
}

fn wrong_type(key: &str, expected: &str) -> AttestationError {
    AttestationError::BadAttestationStatement(format!("attStmt field '{key}' must be {expected}"))
}
