//! Varsig header and the signature trait.

pub mod signer;
pub mod verifier;

use super::{Codec, Format, SignatureAlgorithm};
use ::signature::SignatureEncoding;
use serde::{Deserialize, Serialize};
pub use signer::Signer;
use std::fmt::Debug;
use thiserror::Error;
pub use verifier::Verifier;

/// Cryptographic signature produced by a [`Signer`] and checked by a
/// [`Verifier`].
pub trait Signature: SignatureEncoding + Debug {
    /// The algorithm that produces this signature type.
    type Algorithm: SignatureAlgorithm + Debug + Clone;
}

const VARSIG_PREFIX: u64 = 0x34;
const VARSIG_VERSION: u64 = 0x01;

/// A [varsig] header: which signature algorithm and which payload codec
/// produced a token's signed bytes.
///
/// On the wire the header is a byte string holding a LEB128 tag sequence:
/// the varsig prefix, a version, the algorithm's tags, and the codec's
/// multicodec code. The header travels inside the signed payload, so a
/// verifier always re-encodes with the codec the signer actually used.
///
/// [varsig]: https://github.com/ChainAgnostic/varsig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Varsig<A: SignatureAlgorithm, C: Format> {
    algorithm: A,
    codec: C,
}

/// A varsig header byte sequence could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The leading tag was not the varsig prefix.
    #[error("varsig header does not start with the 0x34 prefix")]
    MissingPrefix,

    /// The version tag is not one this implementation speaks.
    #[error("unsupported varsig version {0:#x}")]
    UnsupportedVersion(u64),

    /// A tag was truncated or not valid LEB128.
    #[error("malformed tag in varsig header")]
    MalformedTag,

    /// The tags after the version do not name a known algorithm.
    #[error("varsig tags do not describe a known signature algorithm")]
    UnknownAlgorithm,

    /// The trailing tags do not name a known payload codec.
    #[error("varsig tags do not describe a known payload codec")]
    UnknownCodec,
}

impl<A: SignatureAlgorithm, C: Format> Varsig<A, C> {
    /// A header for `codec`, with the algorithm built via `Default`.
    pub fn new(codec: C) -> Self {
        Varsig {
            algorithm: A::default(),
            codec,
        }
    }

    /// The signature algorithm this header names.
    pub const fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// The payload codec this header names.
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    /// Encode `payload` with this header's codec, producing the exact
    /// bytes that get signed and verified.
    ///
    /// # Errors
    ///
    /// Returns the codec's encoding error if encoding fails.
    pub fn encode<T>(&self, payload: &T) -> Result<Vec<u8>, C::EncodingError>
    where
        C: Codec<T>,
    {
        let mut buffer = Vec::new();
        self.codec.encode_payload(payload, &mut buffer)?;
        Ok(buffer)
    }

    /// The full tag sequence: prefix, version, algorithm, codec.
    fn tags(&self) -> Vec<u64> {
        let mut tags = vec![VARSIG_PREFIX, VARSIG_VERSION, self.algorithm.prefix()];
        tags.extend(self.algorithm.config_tags());
        tags.push(self.codec.multicodec_code());
        tags
    }

    fn to_tag_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        for tag in self.tags() {
            leb128::write::unsigned(&mut bytes, tag)?;
        }
        Ok(bytes)
    }

    fn from_tag_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let mut tags = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            let tag = leb128::read::unsigned(&mut cursor)
                .map_err(|_| HeaderError::MalformedTag)?;
            tags.push(tag);
        }

        match tags.first() {
            Some(&VARSIG_PREFIX) => {}
            _ => return Err(HeaderError::MissingPrefix),
        }
        match tags.get(1) {
            Some(&VARSIG_VERSION) => {}
            Some(&other) => return Err(HeaderError::UnsupportedVersion(other)),
            None => return Err(HeaderError::MalformedTag),
        }

        let (algorithm, rest) =
            A::try_from_tags(&tags[2..]).ok_or(HeaderError::UnknownAlgorithm)?;
        let codec = C::try_from_tags(rest).ok_or(HeaderError::UnknownCodec)?;

        Ok(Varsig { algorithm, codec })
    }
}

impl<A: SignatureAlgorithm, C: Format> Serialize for Varsig<A, C> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_tag_bytes().map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de, A: SignatureAlgorithm, C: Format> Deserialize<'de> for Varsig<A, C> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Varsig::from_tag_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::eddsa::{Ed25519, Ed25519Signature};
    use std::io::{BufRead, Write};
    use testresult::TestResult;

    /// Identity codec over raw bytes (multicodec 0x55).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct RawCodec;

    impl Format for RawCodec {
        fn multicodec_code(&self) -> u64 {
            0x55
        }

        fn try_from_tags(code: &[u64]) -> Option<Self> {
            if code == [0x55] { Some(RawCodec) } else { None }
        }
    }

    impl Codec<Vec<u8>> for RawCodec {
        type EncodingError = std::io::Error;
        type DecodingError = std::io::Error;

        fn encode_payload<W: Write>(
            &self,
            payload: &Vec<u8>,
            buffer: &mut W,
        ) -> Result<(), Self::EncodingError> {
            buffer.write_all(payload)
        }

        fn decode_payload<R: BufRead>(&self, reader: &mut R) -> Result<Vec<u8>, Self::DecodingError> {
            let mut payload = Vec::new();
            reader.read_to_end(&mut payload)?;
            Ok(payload)
        }
    }

    #[test]
    fn header_tag_bytes_round_trip() -> TestResult {
        let header: Varsig<Ed25519, RawCodec> = Varsig::new(RawCodec);
        let bytes = header.to_tag_bytes()?;
        // 0x34, 0x01, 0xed (two LEB128 bytes), 0x55
        assert_eq!(bytes, vec![0x34, 0x01, 0xed, 0x01, 0x55]);
        assert_eq!(Varsig::from_tag_bytes(&bytes)?, header);
        Ok(())
    }

    #[test]
    fn malformed_headers_are_named() -> TestResult {
        let good = Varsig::<Ed25519, RawCodec>::new(RawCodec).to_tag_bytes()?;

        let mut wrong_prefix = good.clone();
        wrong_prefix[0] = 0x35;
        assert_eq!(
            Varsig::<Ed25519, RawCodec>::from_tag_bytes(&wrong_prefix),
            Err(HeaderError::MissingPrefix)
        );

        let mut wrong_version = good.clone();
        wrong_version[1] = 0x02;
        assert_eq!(
            Varsig::<Ed25519, RawCodec>::from_tag_bytes(&wrong_version),
            Err(HeaderError::UnsupportedVersion(0x02))
        );

        // RSA prefix where Ed25519 is expected.
        assert_eq!(
            Varsig::<Ed25519, RawCodec>::from_tag_bytes(&[0x34, 0x01, 0x85, 0x24, 0x55]),
            Err(HeaderError::UnknownAlgorithm)
        );

        // Truncated before the codec tag.
        assert_eq!(
            Varsig::<Ed25519, RawCodec>::from_tag_bytes(&good[..4]),
            Err(HeaderError::UnknownCodec)
        );
        Ok(())
    }

    #[tokio::test]
    async fn encoded_payload_signs_and_verifies() -> TestResult {
        struct KeySigner(ed25519_dalek::SigningKey);
        struct KeyVerifier(ed25519_dalek::VerifyingKey);

        impl Signer<Ed25519Signature> for KeySigner {
            async fn sign(&self, payload: &[u8]) -> Result<Ed25519Signature, signature::Error> {
                use signature::Signer as _;
                Ok(Ed25519Signature::from(self.0.try_sign(payload)?))
            }
        }

        impl Verifier<Ed25519Signature> for KeyVerifier {
            async fn verify(
                &self,
                payload: &[u8],
                signature: &Ed25519Signature,
            ) -> Result<(), signature::Error> {
                use signature::Verifier as _;
                self.0.verify(payload, &(*signature).into())
            }
        }

        let key = ed25519_dalek::SigningKey::from_bytes(&[9u8; 32]);
        let signer = KeySigner(key.clone());
        let verifier = KeyVerifier(key.verifying_key());

        let header: Varsig<Ed25519, RawCodec> = Varsig::new(RawCodec);
        let payload = header.encode(&b"tagged bytes".to_vec())?;
        let signature = signer.sign(&payload).await?;
        verifier.verify(&payload, &signature).await?;
        assert!(verifier.verify(b"other bytes", &signature).await.is_err());
        Ok(())
    }
}
