//! Ed25519 key types, DID, and signer implementations.

mod error;
mod resolver;
mod signer;
mod verifier;

pub use error::{Ed25519DidFromStrError, Ed25519ResolveError, Ed25519SignerError};
pub use resolver::Ed25519KeyResolver;
pub use signer::Ed25519Signer;
pub use verifier::Ed25519Verifier;
