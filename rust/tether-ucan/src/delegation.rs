//! Delegation tokens.

pub mod builder;
pub mod store;

use crate::{
    cid::to_dagcbor_cid,
    command::Command,
    crypto::nonce::Nonce,
    envelope::{Envelope, EnvelopePayload, payload_tag::PayloadTag},
    policy::Predicate,
    subject::Subject,
    time::{TimeRange, Timestamp},
};
use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, MapAccess, Visitor},
};
use serde_ipld_dagcbor::error::CodecError;
use std::{borrow::Cow, collections::BTreeMap, fmt::Debug};
use tether_varsig::{Signature, Verifier, did::Did};

/// A signed grant of authority from an issuer to an audience over a
/// subject's command, constrained by a policy and a validity window.
///
/// Delegations are immutable once signed and are referred to by the CID
/// of their encoded envelope.
#[derive(Clone)]
pub struct Delegation<S: Signature>(Envelope<S, DelegationPayload>);

impl<S: Signature> Delegation<S> {
    /// Start building a delegation.
    #[must_use]
    pub fn builder() -> builder::DelegationBuilder<S> {
        builder::DelegationBuilder::new()
    }

    /// The principal granting authority.
    #[must_use]
    pub const fn issuer(&self) -> &Did {
        &self.payload().issuer
    }

    /// The principal receiving authority.
    #[must_use]
    pub const fn audience(&self) -> &Did {
        &self.payload().audience
    }

    /// The resource owner this delegation speaks for, or `Any` for a
    /// powerline delegation.
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        &self.payload().subject
    }

    /// The command prefix being delegated.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.payload().command
    }

    /// The policy constraining eventual invocation arguments.
    #[must_use]
    pub const fn policy(&self) -> &Vec<Predicate> {
        &self.payload().policy
    }

    /// When this delegation stops being valid.
    #[must_use]
    pub const fn expiration(&self) -> Option<Timestamp> {
        self.payload().expiration
    }

    /// When this delegation starts being valid.
    #[must_use]
    pub const fn not_before(&self) -> Option<Timestamp> {
        self.payload().not_before
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

    /// The CID identifying this delegation.
    #[must_use]
    pub fn to_cid(&self) -> Cid {
        to_dagcbor_cid(&self)
    }

    const fn signature(&self) -> &S {
        &self.0.0
    }

    const fn envelope(&self) -> &EnvelopePayload<S, DelegationPayload> {
        &self.0.1
    }

    const fn payload(&self) -> &DelegationPayload {
        &self.envelope().payload
    }

    /// Check the signature against the issuer's key, resolved through
    /// `resolver`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureVerificationError`] naming which step failed:
    /// payload encoding, DID resolution, or the verification itself.
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

impl<S: Signature> Debug for Delegation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Delegation").field(&self.0).finish()
    }
}

impl<S: Signature> Serialize for Delegation<S> {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, S: Signature + for<'ze> Deserialize<'ze>> Deserialize<'de> for Delegation<S> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = Envelope::<S, DelegationPayload>::deserialize(deserializer)?;
        Ok(Delegation(envelope))
    }
}

/// The unsigned content of a [`Delegation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelegationPayload {
    #[serde(rename = "iss")]
    pub(crate) issuer: Did,

    #[serde(rename = "aud")]
    pub(crate) audience: Did,

    #[serde(rename = "sub")]
    pub(crate) subject: Subject,

    #[serde(rename = "cmd")]
    pub(crate) command: Command,

    #[serde(rename = "pol")]
    pub(crate) policy: Vec<Predicate>,

    // `exp` is always present on the wire, null when unbounded.
    #[serde(rename = "exp")]
    pub(crate) expiration: Option<Timestamp>,

    #[serde(rename = "nbf", skip_serializing_if = "Option::is_none")]
    pub(crate) not_before: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) meta: Option<BTreeMap<String, Ipld>>,

    pub(crate) nonce: Nonce,
}

impl<'de> Deserialize<'de> for DelegationPayload {
    fn deserialize<T>(deserializer: T) -> Result<Self, T::Error>
    where
        T: Deserializer<'de>,
    {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = DelegationPayload;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map with keys iss,aud,sub,cmd,pol,exp,nbf,meta,nonce")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut issuer: Option<Did> = None;
                let mut audience: Option<Did> = None;
                let mut subject: Option<Subject> = None;
                let mut command: Option<Command> = None;
                let mut policy: Option<Vec<Predicate>> = None;
                let mut expiration: Option<Option<Timestamp>> = None;
                let mut not_before: Option<Option<Timestamp>> = None;
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
                        "pol" => {
                            duplicate(&policy, "pol")?;
                            policy = Some(map.next_value()?);
                        }
                        "exp" => {
                            duplicate(&expiration, "exp")?;
                            expiration = Some(map.next_value()?);
                        }
                        "nbf" => {
                            duplicate(&not_before, "nbf")?;
                            not_before = Some(map.next_value()?);
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
                                    "iss", "aud", "sub", "cmd", "pol", "exp", "nbf", "meta",
                                    "nonce",
                                ],
                            ));
                        }
                    }
                }

                Ok(DelegationPayload {
                    issuer: issuer.ok_or_else(|| de::Error::missing_field("iss"))?,
                    audience: audience.ok_or_else(|| de::Error::missing_field("aud"))?,
                    subject: subject.ok_or_else(|| de::Error::missing_field("sub"))?,
                    command: command.ok_or_else(|| de::Error::missing_field("cmd"))?,
                    policy: policy.ok_or_else(|| de::Error::missing_field("pol"))?,
                    nonce: nonce.ok_or_else(|| de::Error::missing_field("nonce"))?,
                    expiration: expiration.unwrap_or(None),
                    not_before: not_before.unwrap_or(None),
                    meta,
                })
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

/// Signature verification failure for a single token.
#[derive(Debug, thiserror::Error)]
pub enum SignatureVerificationError<E: std::error::Error = signature::Error> {
    /// Payload encoding failed.
    #[error("encoding error: {0}")]
    EncodingError(CodecError),

    /// The issuer's DID could not be resolved to a key.
    #[error("resolution error: {0}")]
    ResolutionError(E),

    /// The signature did not verify against the resolved key.
    #[error("verification error: {0}")]
    VerificationError(signature::Error),
}

impl<S: Signature> From<&Delegation<S>> for TimeRange {
    fn from(delegation: &Delegation<S>) -> Self {
        Self::new(delegation.not_before(), delegation.expiration())
    }
}

impl PayloadTag for DelegationPayload {
    fn spec_id() -> &'static str {
        "dlg"
    }

    fn version() -> &'static str {
        "1.0.0-rc.1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::nonce::Nonce, subject::Subject};
    use testresult::TestResult;
    use tether_credentials::ed25519::{Ed25519KeyResolver, Ed25519Signer};
    use tether_varsig::{did::Did, eddsa::Ed25519Signature, principal::Principal};

    async fn test_signer(seed: u8) -> Ed25519Signer {
        Ed25519Signer::import(&[seed; 32]).await.unwrap()
    }

    async fn test_did(seed: u8) -> Did {
        test_signer(seed).await.did()
    }

    #[tokio::test]
    async fn delegation_carries_its_fields() -> TestResult {
        let issuer = test_signer(10).await;
        let audience = test_did(20).await;
        let subject = test_did(30).await;
        let command: Command = "/storage/read".parse()?;

        let delegation = Delegation::<Ed25519Signature>::builder()
            .audience(audience.clone())
            .subject(Subject::Specific(subject.clone()))
            .command(command.clone())
            .try_sign(&issuer)
            .await?;

        assert_eq!(delegation.issuer(), &issuer.did());
        assert_eq!(delegation.audience(), &audience);
        assert_eq!(delegation.subject(), &Subject::Specific(subject));
        assert_eq!(delegation.command(), &command);
        assert!(delegation.policy().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delegation_signature_verifies() -> TestResult {
        let issuer = test_signer(42).await;

        let delegation = Delegation::<Ed25519Signature>::builder()
            .audience(test_did(43).await)
            .subject(Subject::Specific(test_did(44).await))
            .command("/test".parse::<Command>()?)
            .try_sign(&issuer)
            .await?;

        delegation.verify_signature(&Ed25519KeyResolver).await?;
        Ok(())
    }

    #[tokio::test]
    async fn serialization_roundtrip() -> TestResult {
        let issuer = test_signer(50).await;

        let delegation = Delegation::<Ed25519Signature>::builder()
            .audience(test_did(51).await)
            .subject(Subject::Specific(test_did(52).await))
            .command("/roundtrip".parse::<Command>()?)
            .expiration(Timestamp::from_unix(2_000_000_000))
            .not_before(Timestamp::from_unix(1_000_000_000))
            .try_sign(&issuer)
            .await?;

        let bytes = serde_ipld_dagcbor::to_vec(&delegation)?;
        let roundtripped: Delegation<Ed25519Signature> = serde_ipld_dagcbor::from_slice(&bytes)?;

        assert_eq!(roundtripped.issuer(), delegation.issuer());
        assert_eq!(roundtripped.audience(), delegation.audience());
        assert_eq!(roundtripped.subject(), delegation.subject());
        assert_eq!(roundtripped.command(), delegation.command());
        assert_eq!(roundtripped.expiration(), delegation.expiration());
        assert_eq!(roundtripped.not_before(), delegation.not_before());
        assert_eq!(roundtripped.nonce(), delegation.nonce());
        assert_eq!(roundtripped.to_cid(), delegation.to_cid());
        Ok(())
    }

    #[tokio::test]
    async fn any_subject_roundtrips() -> TestResult {
        let issuer = test_signer(1).await;

        let delegation = Delegation::<Ed25519Signature>::builder()
            .audience(test_did(2).await)
            .subject(Subject::Any)
            .command("/test".parse::<Command>()?)
            .try_sign(&issuer)
            .await?;

        assert_eq!(delegation.subject(), &Subject::Any);

        let bytes = serde_ipld_dagcbor::to_vec(&delegation)?;
        let roundtripped: Delegation<Ed25519Signature> = serde_ipld_dagcbor::from_slice(&bytes)?;
        assert_eq!(roundtripped.subject(), &Subject::Any);
        Ok(())
    }

    #[tokio::test]
    async fn same_nonce_and_signer_encode_identically() -> TestResult {
        let issuer = test_signer(70).await;
        let audience = test_did(71).await;
        let subject = test_did(72).await;
        let nonce = Nonce::generate_16()?;

        let build = |nonce: Nonce| {
            Delegation::<Ed25519Signature>::builder()
                .audience(audience.clone())
                .subject(Subject::Specific(subject.clone()))
                .command("/compare".parse::<Command>().unwrap())
                .nonce(nonce)
        };

        let first = build(nonce.clone()).try_sign(&issuer).await?;
        let second = build(nonce).try_sign(&issuer).await?;

        // Ed25519 is deterministic, so identical payloads sign identically.
        assert_eq!(
            serde_ipld_dagcbor::to_vec(&first)?,
            serde_ipld_dagcbor::to_vec(&second)?
        );
        assert_eq!(first.to_cid(), second.to_cid());
        Ok(())
    }

    #[tokio::test]
    async fn policy_survives_the_wire() -> TestResult {
        use crate::policy::Predicate;
        use ipld_core::ipld::Ipld;

        let issuer = test_signer(80).await;
        let policy = vec![Predicate::Equal(
            ".status".parse()?,
            Ipld::String("draft".into()),
        )];

        let delegation = Delegation::<Ed25519Signature>::builder()
            .audience(test_did(81).await)
            .subject(Subject::Specific(test_did(82).await))
            .command("/message".parse::<Command>()?)
            .policy(policy.clone())
            .try_sign(&issuer)
            .await?;

        let bytes = serde_ipld_dagcbor::to_vec(&delegation)?;
        let roundtripped: Delegation<Ed25519Signature> = serde_ipld_dagcbor::from_slice(&bytes)?;
        assert_eq!(roundtripped.policy(), &policy);
        Ok(())
    }
}
