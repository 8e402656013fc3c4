//! EdDSA signature algorithm configuration.

use super::SignatureAlgorithm;
use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use signature::SignatureEncoding;

/// Byte length of an Ed25519 signature.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// The Ed25519 signature algorithm (EdDSA over edwards25519).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ed25519;

impl SignatureAlgorithm for Ed25519 {
    fn prefix(&self) -> u64 {
        0xed
    }

    fn config_tags(&self) -> Vec<u64> {
        vec![]
    }

    fn try_from_tags(tags: &[u64]) -> Option<(Self, &[u64])> {
        if *tags.first()? == 0xed {
            Some((Ed25519, tags.get(1..)?))
        } else {
            None
        }
    }
}

/// Ed25519 signature bytes.
///
/// A platform-agnostic representation of an Ed25519 signature that can be
/// converted to/from `ed25519_dalek::Signature` for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature([u8; ED25519_SIGNATURE_LENGTH]);

impl Ed25519Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; ED25519_SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    #[must_use]
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Ed25519Signature {
    type Error = signature::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; ED25519_SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| signature::Error::new())?;
        Ok(Self(bytes))
    }
}

impl SignatureEncoding for Ed25519Signature {
    type Repr = [u8; ED25519_SIGNATURE_LENGTH];
}

impl From<Ed25519Signature> for [u8; ED25519_SIGNATURE_LENGTH] {
    fn from(sig: Ed25519Signature) -> Self {
        sig.0
    }
}

impl From<ed25519_dalek::Signature> for Ed25519Signature {
    fn from(sig: ed25519_dalek::Signature) -> Self {
        Self(sig.to_bytes())
    }
}

impl From<Ed25519Signature> for ed25519_dalek::Signature {
    fn from(sig: Ed25519Signature) -> Self {
        ed25519_dalek::Signature::from_bytes(&sig.0)
    }
}

impl Signature for Ed25519Signature {
    type Algorithm = Ed25519;
}

impl Serialize for Ed25519Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Ed25519Signature::try_from(bytes.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!(
                "expected {ED25519_SIGNATURE_LENGTH} signature bytes, found {}",
                bytes.len()
            ))
        })
    }
}
