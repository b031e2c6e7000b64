//! Decoded byte fields of credential options.
//!
//! The platform credential API rejects text where it expects a buffer, so
//! every decoded field is held as [`Bytes`]. The type serializes through
//! `serialize_bytes`, which `serde-wasm-bindgen` turns into a `Uint8Array`
//! when the options are handed to the browser and DAG-CBOR writes as a byte
//! string.

use std::{fmt, ops::Deref};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, SeqAccess, Visitor},
};

/// Owned bytes that serialize as a byte string, never as a list of numbers.
///
/// Reading back accepts a byte string or a sequence of integers, so JSON
/// written by formats without native bytes still round-trips.
///
/// ```rust
/// use passkey_bridge::Bytes;
///
/// let challenge = Bytes::from(b"Hello".to_vec());
/// assert_eq!(challenge.as_slice(), b"Hello");
/// assert_eq!(Vec::from(challenge), b"Hello");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    /// The raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Give up the wrapper.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(bytes: Bytes) -> Self {
        bytes.0
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_byte_buf(BytesVisitor)
    }
}

struct BytesVisitor;

impl<'de> Visitor<'de> for BytesVisitor {
    type Value = Bytes;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a byte string or a list of bytes")
    }

    fn visit_bytes<E: de::Error>(self, bytes: &[u8]) -> Result<Bytes, E> {
        Ok(Bytes(bytes.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, bytes: Vec<u8>) -> Result<Bytes, E> {
        Ok(Bytes(bytes))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bytes, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(Bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_derefs_to_the_inner_slice() {
        let bytes = Bytes::from(vec![1, 2, 3]);

        assert_eq!(&*bytes, &[1, 2, 3]);
        assert_eq!(bytes.len(), 3);
        assert_eq!(bytes.as_ref(), bytes.as_slice());
    }

    #[test]
    fn it_serializes_as_a_cbor_byte_string() {
        let encoded = serde_ipld_dagcbor::to_vec(&Bytes::from(vec![0xde, 0xad])).unwrap();
        // major type 2, length 2
        assert_eq!(encoded, vec![0x42, 0xde, 0xad]);

        let decoded: Bytes = serde_ipld_dagcbor::from_slice(&encoded).unwrap();
        assert_eq!(decoded.into_vec(), vec![0xde, 0xad]);
    }

    #[test]
    fn it_reads_integer_lists_from_json() {
        let json = serde_json::to_string(&Bytes::from(vec![7, 8])).unwrap();
        assert_eq!(json, "[7,8]");

        let bytes: Bytes = serde_json::from_str(&json).unwrap();
        assert_eq!(bytes.as_slice(), &[7, 8]);
        assert!(serde_json::from_str::<Bytes>("[256]").is_err());
    }
}
