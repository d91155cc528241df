//! Decoder for the nested DER envelopes vendors smuggle into certificate
//! extensions.
//!
//! The envelope is an `OCTET STRING` whose payload is a constructed container
//! (`SEQUENCE` or `SET`) with one or more children. Apple anonymous and App
//! Attest certificates use it to carry the attestation nonce:
//!
//! ```text
//! OCTET STRING {
//!     SEQUENCE {
//!         [1] EXPLICIT OCTET STRING (nonce)
//!     }
//! }
//! ```

use x509_parser::der_parser::ber::{BerObject, BerObjectContent};
use x509_parser::der_parser::der::parse_der;

use crate::errors::DecodeError;

/// Decoded envelope: the children of the container inside the outer
/// `OCTET STRING`. Borrows from the input bytes.
#[derive(Debug)]
pub struct Asn1Envelope<'a> {
    children: Vec<BerObject<'a>>,
}

impl<'a> Asn1Envelope<'a> {
    /// Decode `bytes` as `OCTET STRING { container }`.
    ///
    /// Fails with [`DecodeError::Asn1`] if the outer wrapper is not an
    /// `OCTET STRING`, its payload is not a container, or the container is
    /// empty.
    pub fn from_der(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let (_, outer) = parse_der(bytes)
            .map_err(|e| DecodeError::Asn1(format!("Failed to parse outer wrapper: {e}")))?;

        let payload = match outer.content {
            BerObjectContent::OctetString(payload) => payload,
            _ => {
                return Err(DecodeError::Asn1(format!(
                    "Outer wrapper is not an octet string: {:?}",
                    outer.header.tag()
                )));
            }
        };

        let (_, container) = parse_der(payload)
            .map_err(|e| DecodeError::Asn1(format!("Failed to parse container: {e}")))?;

        let children = match container.content {
            BerObjectContent::Sequence(items) | BerObjectContent::Set(items) => items,
            _ => {
                return Err(DecodeError::Asn1(format!(
                    "Envelope payload is not a container: {:?}",
                    container.header.tag()
                )));
            }
        };

        if children.is_empty() {
            return Err(DecodeError::Asn1(
                "Envelope container has no children".to_string(),
            ));
        }

        tracing::debug!("Decoded envelope with {} children", children.len());
        Ok(Self { children })
    }

    /// Number of children in the container. Never zero.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Payload bytes of the child at `index`, read as an `OCTET STRING`.
    ///
    /// A context-tagged child is treated as an explicit tag around an
    /// `OCTET STRING` and unwrapped once.
    pub fn inner_octet_string(&self, index: usize) -> Result<&'a [u8], DecodeError> {
        let child = self.children.get(index).ok_or_else(|| {
            DecodeError::Asn1(format!(
                "Envelope has no child at index {index} (children: {})",
                self.children.len()
            ))
        })?;

        match &child.content {
            BerObjectContent::OctetString(bytes) => Ok(*bytes),
            BerObjectContent::Unknown(_) => {
                let tagged = child.as_slice().map_err(|e| {
                    DecodeError::Asn1(format!("Failed to read tagged child: {e:?}"))
                })?;
                let (_, inner) = parse_der(tagged)
                    .map_err(|e| DecodeError::Asn1(format!("Failed to parse tagged child: {e}")))?;
                match inner.content {
                    BerObjectContent::OctetString(bytes) => Ok(bytes),
                    _ => Err(DecodeError::Asn1(format!(
                        "Tagged child does not wrap an octet string: {:?}",
                        inner.header.tag()
                    ))),
                }
            }
            _ => Err(DecodeError::Asn1(format!(
                "Child {index} is not an octet string: {:?}",
                child.header.tag()
            ))),
        }
    }
}

/// DER-encode `payload` as an `OCTET STRING`.
///
/// Used to present a certificate extension value in the same wrapped form the
/// certificate carries it (`extnValue`).
pub fn encode_octet_string(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 6);
    out.push(0x04);
    encode_length(payload.len(), &mut out);
    out.extend_from_slice(payload);
    out
}

pub(crate) fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}
