//! Ed25519 DID key resolver.

use super::{error::Ed25519ResolveError, verifier::Ed25519Verifier};
use tether_varsig::{Did, Verifier, eddsa::Ed25519Signature};

/// Resolves `did:key` strings to Ed25519 verifiers.
///
/// A `did:key` embeds the public key in the identifier itself, so
/// resolution is a local parse with no lookup.
#[derive(Debug, Clone, Copy)]
pub struct Ed25519KeyResolver;

impl tether_varsig::resolver::Resolver<Ed25519Signature> for Ed25519KeyResolver {
    type Error = Ed25519ResolveError;

    async fn resolve(&self, did: &Did) -> Result<impl Verifier<Ed25519Signature>, Self::Error> {
        let ed_did: Ed25519Verifier = did.as_str().parse()?;
        Ok(ed_did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_varsig::{Principal, Resolver as _};

    #[tokio::test]
    async fn resolves_did_key_locally() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[3u8; 32]);
        let verifier = Ed25519Verifier::from(signing_key);
        assert!(Ed25519KeyResolver.resolve(&verifier.did()).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_non_key_did() {
        let did = Did::new("did:web:example.com");
        let result = Ed25519KeyResolver.resolve(&did).await;
        assert!(result.is_err());
    }
}
