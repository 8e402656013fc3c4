//! Signed token envelopes.

pub mod payload_tag;

use crate::codec::CborCodec;
use ipld_core::ipld::Ipld;
use payload_tag::PayloadTag;
use serde::{
    Deserialize, Serialize,
    de::{self, Deserializer, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeTuple},
};
use std::{fmt, marker::PhantomData};
use tether_varsig::{Signature, Varsig};

/// A signed token: a 2-tuple of signature bytes and tagged payload.
///
/// `S` is the signature type and `T` the payload type. The signature
/// covers the DAG-CBOR encoding of the [`EnvelopePayload`], so the
/// varsig header travels under the signature and cannot be swapped.
#[derive(Debug, Clone)]
pub struct Envelope<S: Signature, T: Serialize + for<'ze> Deserialize<'ze>>(
    /// Signature over the encoded payload.
    pub S,
    /// Header and payload, as signed.
    pub EnvelopePayload<S, T>,
);

impl<S: Signature, T: Serialize + PayloadTag + for<'ze> Deserialize<'ze>> Serialize
    for Envelope<S, T>
{
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut seq = serializer.serialize_tuple(2)?;
        // serde_bytes::Bytes forces a CBOR byte string, not an array
        seq.serialize_element(&serde_bytes::Bytes::new(self.0.to_bytes().as_ref()))?;
        seq.serialize_element(&self.1)?;
        seq.end()
    }
}

impl<'de, S, T> Deserialize<'de> for Envelope<S, T>
where
    S: Signature + for<'ze> Deserialize<'ze>,
    T: Serialize + for<'ze> Deserialize<'ze>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvelopeVisitor<S, T>
        where
            S: Signature,
            T: Serialize + for<'ze> Deserialize<'ze>,
        {
            marker: PhantomData<(S, T)>,
        }

        impl<'de, S, T> Visitor<'de> for EnvelopeVisitor<S, T>
        where
            S: Signature + Deserialize<'de>,
            T: Serialize + for<'ze> Deserialize<'ze>,
        {
            type Value = Envelope<S, T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 2-element sequence [signature, payload]")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let sig_ipld: Ipld = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;

                let Ipld::Bytes(sig_bytes) = sig_ipld else {
                    return Err(de::Error::custom("expected signature to be bytes"));
                };

                let signature = S::try_from(sig_bytes.as_slice())
                    .map_err(|_| de::Error::custom("invalid signature bytes"))?;

                let payload: EnvelopePayload<S, T> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;

                Ok(Envelope(signature, payload))
            }
        }

        deserializer.deserialize_tuple(
            2,
            EnvelopeVisitor {
                marker: PhantomData,
            },
        )
    }
}

/// The signed half of an [`Envelope`]: varsig header plus payload.
#[derive(Debug, Clone)]
pub struct EnvelopePayload<S: Signature, T: Serialize + for<'de> Deserialize<'de>> {
    /// Varsig header describing the signature algorithm and payload codec.
    pub header: Varsig<S::Algorithm, CborCodec>,

    /// The token payload.
    pub payload: T,
}

impl<S: Signature, T: Serialize + for<'de> Deserialize<'de>> From<T> for EnvelopePayload<S, T> {
    fn from(payload: T) -> Self {
        EnvelopePayload {
            header: Varsig::new(CborCodec),
            payload,
        }
    }
}

impl<S: Signature, T: PayloadTag + Serialize + for<'de> Deserialize<'de>> EnvelopePayload<S, T> {
    /// Produce the byte string that gets signed and verified, using the
    /// codec named in the header.
    ///
    /// # Errors
    ///
    /// Returns the codec's encoding error if encoding fails.
    pub fn encode(
        &self,
    ) -> Result<Vec<u8>, <CborCodec as tether_varsig::Codec<Self>>::EncodingError>
    where
        CborCodec: tether_varsig::Codec<Self>,
    {
        self.header.encode(self)
    }
}

impl<S: Signature, T: PayloadTag + Serialize + for<'de> Deserialize<'de>> Serialize
    for EnvelopePayload<S, T>
{
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        // {"h": <varsig bytes>, "<tag>": <payload>}
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("h", &self.header)?;
        map.serialize_entry(&T::tag(), &self.payload)?;
        map.end()
    }
}

impl<'de, S, T> Deserialize<'de> for EnvelopePayload<S, T>
where
    S: Signature,
    T: Serialize + for<'any> Deserialize<'any>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct InnerVisitor<S, T>(PhantomData<(S, T)>);

        impl<'vde, S, T> Visitor<'vde> for InnerVisitor<S, T>
        where
            S: Signature,
            T: Serialize + for<'any> Deserialize<'any>,
        {
            type Value = EnvelopePayload<S, T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(r#"a map with "h" and a payload tag"#)
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'vde>,
            {
                let mut header: Option<Varsig<S::Algorithm, CborCodec>> = None;
                let mut payload: Option<T> = None;

                while let Some(key) = map.next_key::<&str>()? {
                    if key == "h" {
                        if header.is_some() {
                            return Err(de::Error::duplicate_field("h"));
                        }
                        let header_ipld: Ipld = map.next_value()?;
                        let Ipld::Bytes(header_bytes) = header_ipld else {
                            return Err(de::Error::custom("expected varsig header to be bytes"));
                        };
                        let bytes_de =
                            serde::de::value::BytesDeserializer::<M::Error>::new(&header_bytes);

                        header =
                            Some(Varsig::<S::Algorithm, CborCodec>::deserialize(bytes_de)?);
                    } else {
                        if payload.is_some() {
                            return Err(de::Error::custom("multiple payload fields"));
                        }
                        let value: serde_value::Value = map.next_value()?;
                        payload = Some(T::deserialize(value).map_err(de::Error::custom)?);
                    }
                }

                let header = header.ok_or_else(|| de::Error::missing_field("h"))?;
                let payload = payload.ok_or_else(|| de::Error::custom("missing payload"))?;

                Ok(EnvelopePayload { header, payload })
            }
        }

        deserializer.deserialize_map(InnerVisitor::<S, T>(PhantomData))
    }
}
