//! Decentralized identifier newtype.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A [DID] naming a principal.
///
/// The string is kept verbatim; method-specific validation and key
/// extraction are left to resolvers, which parse the DID into the
/// concrete verifier type for their method.
///
/// [DID]: https://www.w3.org/TR/did-core/
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Wrap a DID string.
    pub fn new(did: impl Into<String>) -> Self {
        Did(did.into())
    }

    /// The DID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method name, if the string has the `did:<method>:` shape.
    pub fn method(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("did:")?;
        let end = rest.find(':')?;
        Some(&rest[..end])
    }
}

impl Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Did {
    fn from(value: String) -> Self {
        Did(value)
    }
}

impl From<&str> for Did {
    fn from(value: &str) -> Self {
        Did(value.to_string())
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_extraction() {
        let did = Did::new("did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK");
        assert_eq!(did.method(), Some("key"));
        assert_eq!(Did::new("not-a-did").method(), None);
    }

    #[test]
    fn test_display_round_trips() {
        let did = Did::new("did:web:example.com");
        assert_eq!(did.to_string(), "did:web:example.com");
        assert_eq!(did.as_str(), "did:web:example.com");
    }
}
