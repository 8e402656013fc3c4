//! Delegation subjects.

use serde::{Serialize, de::Deserialize, ser::Serializer};
use std::fmt::Display;
use tether_varsig::did::Did;

/// The subject of a delegation: the principal whose resource is being
/// delegated.
///
/// A powerline delegation names no subject at all and instead forwards
/// whatever its issuer is later granted. On the wire `Any` is the CBOR
/// `null`. A powerline link can sit anywhere in a proof chain except at
/// the root, where the subject itself must be the issuer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum Subject {
    /// A named subject.
    Specific(Did),

    /// A powerline wildcard.
    Any,
}

impl Subject {
    /// Whether this subject covers `did`. `Any` covers everything.
    #[must_use]
    pub fn allows(&self, did: &Did) -> bool {
        match self {
            Subject::Specific(specific) => specific == did,
            Subject::Any => true,
        }
    }
}

impl From<Did> for Subject {
    fn from(did: Did) -> Self {
        Subject::Specific(did)
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Specific(did) => Display::fmt(did, f),
            Subject::Any => "Null".fmt(f),
        }
    }
}

impl Serialize for Subject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Subject::Specific(did) => did.serialize(serializer),
            Subject::Any => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Subject {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_value::Value::deserialize(deserializer)?;

        if value == serde_value::Value::Option(None) {
            return Ok(Subject::Any);
        }

        if let Ok(did) = Did::deserialize(value.clone()) {
            return Ok(Subject::Specific(did));
        }

        Err(serde::de::Error::custom("invalid subject format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_ipld_dagcbor::{from_slice, to_vec};
    use tether_credentials::ed25519::Ed25519Signer;
    use tether_varsig::{did::Did, principal::Principal};

    #[test]
    fn any_serializes_to_cbor_null() {
        let bytes = to_vec(&Subject::Any).unwrap();
        assert_eq!(bytes, vec![0xf6]);
        let decoded: Subject = from_slice(&bytes).unwrap();
        assert_eq!(decoded, Subject::Any);
    }

    #[tokio::test]
    async fn specific_roundtrip() {
        let signer = Ed25519Signer::import(&[55u8; 32]).await.unwrap();
        let did: Did = signer.did();
        let bytes = to_vec(&Subject::Specific(did.clone())).unwrap();
        let decoded: Subject = from_slice(&bytes).unwrap();
        assert_eq!(decoded, Subject::Specific(did));
    }

    #[test]
    fn any_allows_every_did() {
        let did = Did::from("did:key:zExample");
        assert!(Subject::Any.allows(&did));
        assert!(Subject::Specific(did.clone()).allows(&did));
        assert!(!Subject::Specific(did).allows(&Did::from("did:key:zOther")));
    }
}
