//! Cryptographic helpers for tokens.

pub mod nonce;

pub use nonce::*;
