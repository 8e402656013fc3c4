//! Delegation construction and signing.

use super::{Delegation, DelegationPayload};
use crate::{
    command::Command,
    crypto::nonce::Nonce,
    envelope::{Envelope, EnvelopePayload},
    issuer::Issuer,
    policy::Predicate,
    subject::Subject,
    time::Timestamp,
};
use ipld_core::ipld::Ipld;
use serde_ipld_dagcbor::error::CodecError;
use std::{collections::BTreeMap, marker::PhantomData};
use tether_varsig::Signature;
use thiserror::Error;

/// Assembles a [`Delegation`] payload and signs it.
///
/// Audience, subject and command are required; everything else defaults
/// to empty or unbounded. A fresh 16-byte nonce is generated at signing
/// time unless one is supplied.
#[derive(Debug, Clone)]
pub struct DelegationBuilder<S: Signature> {
    audience: Option<tether_varsig::did::Did>,
    subject: Option<Subject>,
    command: Option<Command>,
    policy: Vec<Predicate>,
    expiration: Option<Timestamp>,
    not_before: Option<Timestamp>,
    meta: Option<BTreeMap<String, Ipld>>,
    nonce: Option<Nonce>,
    signature: PhantomData<S>,
}

impl<S: Signature> Default for DelegationBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Signature> DelegationBuilder<S> {
    /// A builder with nothing set.
    #[must_use]
    pub const fn new() -> Self {
        DelegationBuilder {
            audience: None,
            subject: None,
            command: None,
            policy: Vec::new(),
            expiration: None,
            not_before: None,
            meta: None,
            nonce: None,
            signature: PhantomData,
        }
    }

    /// The principal receiving authority.
    #[must_use]
    pub fn audience(mut self, audience: tether_varsig::did::Did) -> Self {
        self.audience = Some(audience);
        self
    }

    /// The resource owner this delegation speaks for.
    #[must_use]
    pub fn subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// The command prefix being delegated.
    #[must_use]
    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// The policy constraining eventual invocation arguments.
    #[must_use]
    pub fn policy(mut self, policy: Vec<Predicate>) -> Self {
        self.policy = policy;
        self
    }

    /// When the delegation stops being valid.
    #[must_use]
    pub fn expiration(mut self, expiration: Timestamp) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// When the delegation starts being valid.
    #[must_use]
    pub fn not_before(mut self, not_before: Timestamp) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// Free-form metadata.
    #[must_use]
    pub fn meta(mut self, meta: BTreeMap<String, Ipld>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Use a caller-chosen nonce instead of generating one.
    #[must_use]
    pub fn nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Assemble the payload and sign it as `issuer`.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] when a required field is missing, nonce
    /// generation fails, the payload does not encode, or signing fails.
    pub async fn try_sign<I: Issuer<S>>(self, issuer: &I) -> Result<Delegation<S>, BuildError> {
        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => Nonce::generate_16().map_err(BuildError::Nonce)?,
        };

        let payload = DelegationPayload {
            issuer: issuer.did(),
            audience: self.audience.ok_or(BuildError::Missing("audience"))?,
            subject: self.subject.ok_or(BuildError::Missing("subject"))?,
            command: self.command.ok_or(BuildError::Missing("command"))?,
            policy: self.policy,
            expiration: self.expiration,
            not_before: self.not_before,
            meta: self.meta,
            nonce,
        };

        let envelope_payload = EnvelopePayload::<S, DelegationPayload>::from(payload);
        let bytes = envelope_payload.encode()?;
        let signature = issuer.sign(&bytes).await?;

        Ok(Delegation(Envelope(signature, envelope_payload)))
    }
}

/// A delegation could not be assembled or signed.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required field was never set.
    #[error("missing required field: {0}")]
    Missing(&'static str),

    /// The system RNG failed while generating a nonce.
    #[error("nonce generation failed: {0}")]
    Nonce(getrandom::Error),

    /// The payload did not encode to DAG-CBOR.
    #[error(transparent)]
    Encoding(#[from] CodecError),

    /// The issuer failed to sign the payload.
    #[error(transparent)]
    Signing(#[from] signature::Error),
}
