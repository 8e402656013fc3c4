use ipld_core::ipld::Ipld;
use serde::{Serialize, Serializer};

/// A token nonce, distinguishing otherwise-identical tokens.
///
/// Freshly minted tokens use 16 random bytes. Tokens decoded off the wire
/// may carry a nonce of any length, preserved verbatim so the token's CID
/// survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Nonce {
    /// A 16-byte nonce, the default for locally built tokens.
    Nonce16([u8; 16]),
    /// A nonce of arbitrary length, as found on decoded tokens.
    Custom(Vec<u8>),
}

impl Nonce {
    /// Generate a fresh 16-byte nonce from the system RNG.
    pub fn generate_16() -> Result<Self, getrandom::Error> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes)?;
        Ok(Nonce::Nonce16(bytes))
    }

    /// The raw nonce bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Nonce::Nonce16(bytes) => bytes,
            Nonce::Custom(bytes) => bytes,
        }
    }
}

impl From<Vec<u8>> for Nonce {
    fn from(bytes: Vec<u8>) -> Self {
        match <[u8; 16]>::try_from(bytes.as_slice()) {
            Ok(bytes) => Nonce::Nonce16(bytes),
            Err(_) => Nonce::Custom(bytes),
        }
    }
}

impl TryFrom<Ipld> for Nonce {
    type Error = Ipld;

    fn try_from(ipld: Ipld) -> Result<Self, Self::Error> {
        match ipld {
            Ipld::Bytes(bytes) => Ok(Nonce::from(bytes)),
            other => Err(other),
        }
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}
