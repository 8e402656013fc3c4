//! Token issuers.

use tether_varsig::{Signature, principal::Principal, signature::signer::Signer};

/// Anything that can both sign a payload and name itself with a DID.
///
/// Blanket-implemented, so any `Signer + Principal` (such as
/// `Ed25519Signer`) is an issuer.
pub trait Issuer<S: Signature>: Signer<S> + Principal {}

impl<S: Signature, T: Signer<S> + Principal> Issuer<S> for T {}
