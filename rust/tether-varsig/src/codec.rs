//! Codec traits for encoding and decoding varsig payloads.

use std::{
    error::Error,
    io::{BufRead, Write},
};

/// Codec identity: multicodec code and tag-based construction.
///
/// Captures the payload-independent parts of a codec, which is what the
/// varsig header needs for serialization and deserialization.
pub trait Format: Sized {
    /// Multicodec code.
    ///
    /// Not a `const` because an implementation may support more
    /// than one codec, so it is runtime dependent.
    fn multicodec_code(&self) -> u64;

    /// Try to create a codec from a series of tags.
    fn try_from_tags(code: &[u64]) -> Option<Self>;
}

/// Encoding and decoding of a payload type `T`.
///
/// The varsig header encodes through its configured codec to produce the
/// exact byte sequence that gets signed, so verification re-encodes the
/// payload with the same codec.
pub trait Codec<T>: Format {
    /// Encoding error type.
    type EncodingError: Error;

    /// Decoding error type.
    type DecodingError: Error;

    /// Encode the payload into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns `Self::EncodingError` if encoding fails.
    fn encode_payload<W: Write>(
        &self,
        payload: &T,
        buffer: &mut W,
    ) -> Result<(), Self::EncodingError>;

    /// Decode a payload from the given reader.
    ///
    /// # Errors
    ///
    /// Returns `Self::DecodingError` if decoding fails.
    fn decode_payload<R: BufRead>(&self, reader: &mut R) -> Result<T, Self::DecodingError>;
}
