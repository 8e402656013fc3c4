//! Invocation tokens.

pub mod builder;

use crate::{
    cid::to_dagcbor_cid,
    command::Command,
    crypto::nonce::Nonce,
    delegation::SignatureVerificationError,
    envelope::{Envelope, EnvelopePayload, payload_tag::PayloadTag},
    time::{TimeRange, Timestamp},
};
use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, MapAccess, Visitor},
};
use std::{borrow::Cow, collections::BTreeMap, fmt::Debug};
use tether_varsig::{Signature, Verifier, did::Did};

/// A signed request to exercise a capability: who is asking, on whose
/// resource, which command, with which arguments, backed by which proof
/// delegations.
#[derive(Clone)]
pub struct Invocation<S: Signature>(Envelope<S, InvocationPayload>);

impl<S: Signature> Invocation<S> {
    /// Start building an invocation.
    #[must_use]
    pub fn builder() -> builder::InvocationBuilder<S> {
        builder::InvocationBuilder::new()
    }

    /// The principal making the request.
    #[must_use]
    pub const fn issuer(&self) -> &Did {
        &self.payload().issuer
    }

    /// The principal expected to execute the request. Falls back to the
    /// subject when no explicit audience was named.
    #[must_use]
    pub fn audience(&self) -> &Did {
        self.payload().audience.as_ref().unwrap_or(self.subject())
    }

    /// The resource owner the request targets.
    #[must_use]
    pub const fn subject(&self) -> &Did {
        &self.payload().subject
    }

    /// The command being invoked.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.payload().command
    }

    /// The request arguments.
    #[must_use]
    pub const fn arguments(&self) -> &BTreeMap<String, Ipld> {
        &self.payload().arguments
    }

    /// CIDs of the delegations offered as the proof chain.
    #[must_use]
    pub const fn proofs(&self) -> &Vec<Cid> {
        &self.payload().proofs
    }

    /// The invocation this one is a response to, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<Cid> {
        self.payload().cause
    }

    /// When the request was issued, if recorded.
    #[must_use]
    pub const fn issued_at(&self) -> Option<Timestamp> {
        self.payload().issued_at
    }

    /// When the request stops being valid.
    #[must_use]
    pub const fn expiration(&self) -> Option<Timestamp> {
        self.payload().expiration
    }

    /// Free-form metadata, empty when absent.
    #[must_use]
    pub fn meta(&self) -> &BTreeMap<String, Ipld> {
        static EMPTY: BTreeMap<String, Ipld> = BTreeMap::new();
        self.payload().meta.as_ref().unwrap_or(&EMPTY)
    }

    /// The token nonce.
    #[must_use]
    pub const fn nonce(&self) -> &Nonce {
        &self.payload().nonce
    }

    /// The CID identifying this invocation.
    #[must_use]
    pub fn to_cid(&self) -> Cid {
        to_dagcbor_cid(&self)
    }

    const fn signature(&self) -> &S {
        &self.0.0
    }

    const fn envelope(&self) -> &EnvelopePayload<S, InvocationPayload> {
        &self.0.1
    }

    const fn payload(&self) -> &InvocationPayload {
        &self.envelope().payload
    }

    /// Check the signature against the issuer's key, resolved through
    /// `resolver`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureVerificationError`] naming which step failed.
    pub async fn verify_signature<R>(
        &self,
        resolver: &R,
    ) -> Result<(), SignatureVerificationError<R::Error>>
    where
        R: tether_varsig::resolver::Resolver<S>,
    {
        let payload = self
            .envelope()
            .encode()
            .map_err(SignatureVerificationError::EncodingError)?;
        let verifier = resolver
            .resolve(self.issuer())
            .await
            .map_err(SignatureVerificationError::ResolutionError)?;
        Verifier::verify(&verifier, &payload, self.signature())
            .await
            .map_err(SignatureVerificationError::VerificationError)
    }
}

impl<S: Signature> Debug for Invocation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Invocation").field(&self.0).finish()
    }
}

impl<S: Signature> Serialize for Invocation<S> {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, S: Signature + for<'ze> Deserialize<'ze>> Deserialize<'de> for Invocation<S> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = Envelope::<S, InvocationPayload>::deserialize(deserializer)?;
        Ok(Invocation(envelope))
    }
}

/// The unsigned content of an [`Invocation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationPayload {
    #[serde(rename = "iss")]
    pub(crate) issuer: Did,

    #[serde(rename = "aud", skip_serializing_if = "Option::is_none")]
    pub(crate) audience: Option<Did>,

    #[serde(rename = "sub")]
    pub(crate) subject: Did,

    #[serde(rename = "cmd")]
    pub(crate) command: Command,

    #[serde(rename = "args")]
    pub(crate) arguments: BTreeMap<String, Ipld>,

    #[serde(rename = "prf")]
    pub(crate) proofs: Vec<Cid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cause: Option<Cid>,

    #[serde(rename = "iat", skip_serializing_if = "Option::is_none")]
    pub(crate) issued_at: Option<Timestamp>,

    // `exp` is always present on the wire, null when unbounded.
    #[serde(rename = "exp")]
    pub(crate) expiration: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) meta: Option<BTreeMap<String, Ipld>>,

    pub(crate) nonce: Nonce,
}

impl<'de> Deserialize<'de> for InvocationPayload {
    fn deserialize<T>(deserializer: T) -> Result<Self, T::Error>
    where
        T: Deserializer<'de>,
    {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = InvocationPayload;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map with keys iss,aud,sub,cmd,args,prf,cause,iat,exp,meta,nonce")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut issuer: Option<Did> = None;
                let mut audience: Option<Option<Did>> = None;
                let mut subject: Option<Did> = None;
                let mut command: Option<Command> = None;
                let mut arguments: Option<BTreeMap<String, Ipld>> = None;
                let mut proofs: Option<Vec<Cid>> = None;
                let mut cause: Option<Option<Cid>> = None;
                let mut issued_at: Option<Option<Timestamp>> = None;
                let mut expiration: Option<Option<Timestamp>> = None;
                let mut meta: Option<BTreeMap<String, Ipld>> = None;
                let mut nonce: Option<Nonce> = None;

                fn duplicate<E: de::Error, V>(
                    slot: &Option<V>,
                    field: &'static str,
                ) -> Result<(), E> {
                    if slot.is_some() {
                        Err(de::Error::duplicate_field(field))
                    } else {
                        Ok(())
                    }
                }

                while let Some(key) = map.next_key::<Cow<'de, str>>()? {
                    match key.as_ref() {
                        "iss" => {
                            duplicate(&issuer, "iss")?;
                            issuer = Some(map.next_value()?);
                        }
                        "aud" => {
                            duplicate(&audience, "aud")?;
                            audience = Some(map.next_value()?);
                        }
                        "sub" => {
                            duplicate(&subject, "sub")?;
                            subject = Some(map.next_value()?);
                        }
                        "cmd" => {
                            duplicate(&command, "cmd")?;
                            command = Some(map.next_value()?);
                        }
                        "args" => {
                            duplicate(&arguments, "args")?;
                            arguments = Some(map.next_value()?);
                        }
                        "prf" => {
                            duplicate(&proofs, "prf")?;
                            proofs = Some(map.next_value()?);
                        }
                        "cause" => {
                            duplicate(&cause, "cause")?;
                            cause = Some(map.next_value()?);
                        }
                        "iat" => {
                            duplicate(&issued_at, "iat")?;
                            issued_at = Some(map.next_value()?);
                        }
                        "exp" => {
                            duplicate(&expiration, "exp")?;
                            expiration = Some(map.next_value()?);
                        }
                        "meta" => {
                            duplicate(&meta, "meta")?;
                            meta = Some(map.next_value()?);
                        }
                        "nonce" => {
                            duplicate(&nonce, "nonce")?;
                            let ipld: Ipld = map.next_value()?;
                            nonce = Some(Nonce::try_from(ipld).map_err(|_| {
                                de::Error::custom("expected nonce to be bytes")
                            })?);
                        }
                        other => {
                            return Err(de::Error::unknown_field(
                                other,
                                &[
                                    "iss", "aud", "sub", "cmd", "args", "prf", "cause", "iat",
                                    "exp", "meta", "nonce",
                                ],
                            ));
                        }
                    }
                }

                Ok(InvocationPayload {
                    issuer: issuer.ok_or_else(|| de::Error::missing_field("iss"))?,
                    subject: subject.ok_or_else(|| de::Error::missing_field("sub"))?,
                    command: command.ok_or_else(|| de::Error::missing_field("cmd"))?,
                    arguments: arguments.ok_or_else(|| de::Error::missing_field("args"))?,
                    proofs: proofs.ok_or_else(|| de::Error::missing_field("prf"))?,
                    nonce: nonce.ok_or_else(|| de::Error::missing_field("nonce"))?,
                    audience: audience.unwrap_or(None),
                    cause: cause.unwrap_or(None),
                    issued_at: issued_at.unwrap_or(None),
                    expiration: expiration.unwrap_or(None),
                    meta,
                })
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

impl<S: Signature> From<&Invocation<S>> for TimeRange {
    fn from(invocation: &Invocation<S>) -> Self {
        Self::new(None, invocation.expiration())
    }
}

impl PayloadTag for InvocationPayload {
    fn spec_id() -> &'static str {
        "inv"
    }

    fn version() -> &'static str {
        "1.0.0-rc.1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;
    use tether_credentials::ed25519::{Ed25519KeyResolver, Ed25519Signer};
    use tether_varsig::{eddsa::Ed25519Signature, principal::Principal};

    async fn test_signer(seed: u8) -> Ed25519Signer {
        Ed25519Signer::import(&[seed; 32]).await.unwrap()
    }

    #[tokio::test]
    async fn audience_falls_back_to_subject() -> TestResult {
        let issuer = test_signer(1).await;
        let subject = test_signer(2).await.did();

        let invocation = Invocation::<Ed25519Signature>::builder()
            .subject(subject.clone())
            .command("/test".parse::<Command>()?)
            .try_sign(&issuer)
            .await?;
        assert_eq!(invocation.audience(), &subject);

        let service = test_signer(3).await.did();
        let invocation = Invocation::<Ed25519Signature>::builder()
            .subject(subject)
            .audience(service.clone())
            .command("/test".parse::<Command>()?)
            .try_sign(&issuer)
            .await?;
        assert_eq!(invocation.audience(), &service);
        Ok(())
    }

    #[tokio::test]
    async fn signature_verifies_and_roundtrips() -> TestResult {
        let issuer = test_signer(7).await;
        let mut arguments = BTreeMap::new();
        arguments.insert("path".to_string(), Ipld::String("/tmp/x".into()));

        let invocation = Invocation::<Ed25519Signature>::builder()
            .subject(issuer.did())
            .command("/storage/read".parse::<Command>()?)
            .arguments(arguments.clone())
            .expiration(Timestamp::from_unix(2_000_000_000))
            .try_sign(&issuer)
            .await?;

        invocation.verify_signature(&Ed25519KeyResolver).await?;

        let bytes = serde_ipld_dagcbor::to_vec(&invocation)?;
        let roundtripped: Invocation<Ed25519Signature> = serde_ipld_dagcbor::from_slice(&bytes)?;
        assert_eq!(roundtripped.issuer(), invocation.issuer());
        assert_eq!(roundtripped.arguments(), &arguments);
        assert_eq!(roundtripped.expiration(), invocation.expiration());
        assert_eq!(roundtripped.to_cid(), invocation.to_cid());
        roundtripped.verify_signature(&Ed25519KeyResolver).await?;
        Ok(())
    }

    #[tokio::test]
    async fn proof_links_survive_the_wire() -> TestResult {
        use crate::{delegation::Delegation, subject::Subject};

        let issuer = test_signer(11).await;
        let proof = Delegation::<Ed25519Signature>::builder()
            .audience(issuer.did())
            .subject(Subject::Specific(issuer.did()))
            .command(Command::top())
            .try_sign(&issuer)
            .await?;

        let invocation = Invocation::<Ed25519Signature>::builder()
            .subject(issuer.did())
            .command("/test".parse::<Command>()?)
            .proofs(vec![proof.to_cid()])
            .try_sign(&issuer)
            .await?;

        let bytes = serde_ipld_dagcbor::to_vec(&invocation)?;
        let roundtripped: Invocation<Ed25519Signature> = serde_ipld_dagcbor::from_slice(&bytes)?;
        assert_eq!(roundtripped.proofs(), &vec![proof.to_cid()]);
        Ok(())
    }
}
