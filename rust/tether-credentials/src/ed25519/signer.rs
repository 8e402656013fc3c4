//! Ed25519 signer implementation.

use super::{error::Ed25519SignerError, verifier::Ed25519Verifier};
use tether_varsig::{Did, Principal, Signer, eddsa::Ed25519Signature};

/// An `Ed25519` `did:key` signer.
///
/// Holds the signing key exclusively; the derived verifier (and its DID)
/// is computed once at construction.
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    did: Ed25519Verifier,
    signer: ed25519_dalek::SigningKey,
}

impl From<ed25519_dalek::SigningKey> for Ed25519Signer {
    fn from(signer: ed25519_dalek::SigningKey) -> Self {
        let did = Ed25519Verifier::from(signer.verifying_key());
        Self { did, signer }
    }
}

impl Ed25519Signer {
    /// Generate a new Ed25519 keypair with random bytes from `getrandom`.
    ///
    /// # Errors
    ///
    /// Returns an error if the RNG fails.
    pub async fn generate() -> Result<Self, Ed25519SignerError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)?;
        Ok(ed25519_dalek::SigningKey::from_bytes(&seed).into())
    }

    /// Import a keypair from raw seed bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed has the wrong length.
    pub async fn import(seed: &[u8]) -> Result<Self, Ed25519SignerError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| Ed25519SignerError::InvalidSeedLength(seed.len()))?;
        Ok(ed25519_dalek::SigningKey::from_bytes(&seed).into())
    }

    /// Export the raw seed bytes.
    pub async fn export(&self) -> Vec<u8> {
        self.signer.to_bytes().to_vec()
    }

    /// Get the associated Ed25519 DID (verifier).
    #[must_use]
    pub const fn ed25519_did(&self) -> &Ed25519Verifier {
        &self.did
    }

    /// Get the inner signing key.
    #[must_use]
    pub const fn signing_key(&self) -> &ed25519_dalek::SigningKey {
        &self.signer
    }
}

impl Signer<Ed25519Signature> for Ed25519Signer {
    async fn sign(&self, payload: &[u8]) -> Result<Ed25519Signature, signature::Error> {
        use signature::Signer as _;
        let sig = self.signer.try_sign(payload)?;
        Ok(Ed25519Signature::from(sig))
    }
}

impl Principal for Ed25519Signer {
    fn did(&self) -> Did {
        self.did.did()
    }
}
