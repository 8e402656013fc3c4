//! Concrete key and signing types for tether-ucan.
//!
//! This crate provides credential implementations that satisfy the
//! [`Principal`], [`Signer`], and [`Resolver`] traits from `tether-varsig`.
//!
//! [`Principal`]: tether_varsig::Principal
//! [`Signer`]: tether_varsig::Signer
//! [`Resolver`]: tether_varsig::Resolver

pub mod ed25519;
pub use ed25519::*;
