//! DID-to-verifier resolution.

use std::future::Future;

use crate::{
    did::Did,
    signature::{Signature, Verifier},
};

/// Resolves a DID to a [`Verifier`] for signature type `S`.
///
/// Given a DID, looks up or derives the public key material needed to
/// verify signatures. Async to support network-based DID methods
/// (e.g. did:web, did:plc); key-embedding methods resolve locally.
pub trait Resolver<S: Signature> {
    /// Error type for resolution failures.
    type Error: std::error::Error;

    /// Resolve a DID to a verifier for signature type `S`.
    fn resolve(&self, did: &Did) -> impl Future<Output = Result<impl Verifier<S>, Self::Error>>;
}

/// A DID could not be resolved to key material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve keys for DID method {method:?}: {did}")]
pub struct DidKeyResolutionError {
    /// The DID that failed to resolve.
    pub did: Did,
    /// Its DID method.
    pub method: String,
}

/// A resolver for DID methods with no supported resolution path.
///
/// Used as the default for anything that is not a key-embedding method;
/// every resolution fails with [`DidKeyResolutionError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedDidResolver;

/// The verifier type [`UnsupportedDidResolver`] never produces.
#[derive(Debug, Clone, Copy)]
pub struct NeverVerifier;

impl<S: Signature> Verifier<S> for NeverVerifier {
    async fn verify(&self, _payload: &[u8], _signature: &S) -> Result<(), signature::Error> {
        Err(signature::Error::new())
    }
}

impl<S: Signature> Resolver<S> for UnsupportedDidResolver {
    type Error = DidKeyResolutionError;

    async fn resolve(&self, did: &Did) -> Result<NeverVerifier, Self::Error> {
        Err(DidKeyResolutionError {
            did: did.clone(),
            method: did.method().unwrap_or_default().to_string(),
        })
    }
}
