//! Invocation construction and signing.

use super::{Invocation, InvocationPayload};
use crate::{
    command::Command,
    crypto::nonce::Nonce,
    delegation::builder::BuildError,
    envelope::{Envelope, EnvelopePayload},
    issuer::Issuer,
    time::Timestamp,
};
use ipld_core::{cid::Cid, ipld::Ipld};
use std::{collections::BTreeMap, marker::PhantomData};
use tether_varsig::{Signature, did::Did};

/// Assembles an [`Invocation`] payload and signs it.
///
/// Subject and command are required. Arguments and proofs default to
/// empty, and a fresh 16-byte nonce is generated at signing time unless
/// one is supplied.
#[derive(Debug, Clone)]
pub struct InvocationBuilder<S: Signature> {
    audience: Option<Did>,
    subject: Option<Did>,
    command: Option<Command>,
    arguments: BTreeMap<String, Ipld>,
    proofs: Vec<Cid>,
    cause: Option<Cid>,
    issued_at: Option<Timestamp>,
    expiration: Option<Timestamp>,
    meta: Option<BTreeMap<String, Ipld>>,
    nonce: Option<Nonce>,
    signature: PhantomData<S>,
}

impl<S: Signature> Default for InvocationBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Signature> InvocationBuilder<S> {
    /// A builder with nothing set.
    #[must_use]
    pub const fn new() -> Self {
        InvocationBuilder {
            audience: None,
            subject: None,
            command: None,
            arguments: BTreeMap::new(),
            proofs: Vec::new(),
            cause: None,
            issued_at: None,
            expiration: None,
            meta: None,
            nonce: None,
            signature: PhantomData,
        }
    }

    /// Name an explicit executor instead of the subject.
    #[must_use]
    pub fn audience(mut self, audience: Did) -> Self {
        self.audience = Some(audience);
        self
    }

    /// The resource owner the request targets.
    #[must_use]
    pub fn subject(mut self, subject: Did) -> Self {
        self.subject = Some(subject);
        self
    }

    /// The command being invoked.
    #[must_use]
    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// The request arguments.
    #[must_use]
    pub fn arguments(mut self, arguments: BTreeMap<String, Ipld>) -> Self {
        self.arguments = arguments;
        self
    }

    /// CIDs of the delegations backing this request.
    #[must_use]
    pub fn proofs(mut self, proofs: Vec<Cid>) -> Self {
        self.proofs = proofs;
        self
    }

    /// The invocation this one responds to.
    #[must_use]
    pub fn cause(mut self, cause: Cid) -> Self {
        self.cause = Some(cause);
        self
    }

    /// When the request was issued.
    #[must_use]
    pub fn issued_at(mut self, issued_at: Timestamp) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// When the request stops being valid.
    #[must_use]
    pub fn expiration(mut self, expiration: Timestamp) -> Self {
        self.expiration = Some(expiration);
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
    pub async fn try_sign<I: Issuer<S>>(self, issuer: &I) -> Result<Invocation<S>, BuildError> {
        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => Nonce::generate_16().map_err(BuildError::Nonce)?,
        };

        let payload = InvocationPayload {
            issuer: issuer.did(),
            audience: self.audience,
            subject: self.subject.ok_or(BuildError::Missing("subject"))?,
            command: self.command.ok_or(BuildError::Missing("command"))?,
            arguments: self.arguments,
            proofs: self.proofs,
            cause: self.cause,
            issued_at: self.issued_at,
            expiration: self.expiration,
            meta: self.meta,
            nonce,
        };

        let envelope_payload = EnvelopePayload::<S, InvocationPayload>::from(payload);
        let bytes = envelope_payload.encode()?;
        let signature = issuer.sign(&bytes).await?;

        Ok(Invocation(Envelope(signature, envelope_payload)))
    }
}
