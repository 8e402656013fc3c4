//! Error types for Ed25519 key operations.

use thiserror::Error;

/// Error type for [`super::Ed25519Signer`] operations.
#[derive(Debug, Clone)]
#[allow(missing_copy_implementations)]
pub enum Ed25519SignerError {
    /// Random number generation failed (from `generate`).
    Rng(getrandom::Error),

    /// The seed bytes have the wrong length (expected 32).
    InvalidSeedLength(usize),
}

impl std::fmt::Display for Ed25519SignerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rng(e) => write!(f, "RNG error: {e}"),
            Self::InvalidSeedLength(n) => write!(f, "expected 32 seed bytes, got {n}"),
        }
    }
}

impl std::error::Error for Ed25519SignerError {}

impl From<getrandom::Error> for Ed25519SignerError {
    fn from(e: getrandom::Error) -> Self {
        Self::Rng(e)
    }
}

/// Errors that can occur when parsing an Ed25519 `did:key` from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Ed25519DidFromStrError {
    /// The DID header is invalid.
    #[error("invalid did header")]
    InvalidDidHeader,

    /// The base58 prefix 'z' is missing.
    #[error("missing base58 prefix 'z'")]
    MissingBase58Prefix,

    /// The base58 encoding is invalid.
    #[error("invalid base58 encoding")]
    InvalidBase58,

    /// The key bytes are invalid.
    #[error("invalid key bytes")]
    InvalidKey,
}

/// Error type for Ed25519 DID resolution.
#[derive(Debug, Clone, Copy, Error)]
pub enum Ed25519ResolveError {
    /// The DID could not be parsed as an Ed25519 did:key.
    #[error("invalid ed25519 did:key: {0}")]
    InvalidDid(#[from] Ed25519DidFromStrError),
}
