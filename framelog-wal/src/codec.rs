//! Payload codecs.
//!
//! The WAL stores opaque bytes. A `PayloadCodec` turns caller values into
//! those bytes and back; it is injected at open time so the log itself never
//! depends on a serialization scheme.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Converts caller values to and from record payloads.
pub trait PayloadCodec {
    type Value;
    type Error: std::error::Error + Send + Sync + 'static;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, Self::Error>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, Self::Error>;
}

/// Identity codec: values are the payload bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl PayloadCodec for RawCodec {
    type Value = Vec<u8>;
    type Error = std::convert::Infallible;

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, Self::Error> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Ok(bytes.to_vec())
    }
}

/// JSON codec for any serde type.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> PayloadCodec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;
    type Error = serde_json::Error;

    fn encode(&self, value: &T) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        a: String,
        iter: u32,
    }

    #[test]
    fn test_raw_codec_is_identity() {
        let codec = RawCodec;
        let bytes = codec.encode(&vec![0, 1, 255]).unwrap();
        assert_eq!(bytes, vec![0, 1, 255]);
        assert_eq!(codec.decode(&bytes).unwrap(), vec![0, 1, 255]);
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec::<Entry>::new();
        let entry = Entry {
            a: "b".to_string(),
            iter: 3,
        };

        let bytes = codec.encode(&entry).unwrap();
        assert_eq!(bytes, br#"{"a":"b","iter":3}"#);
        assert_eq!(codec.decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let codec = JsonCodec::<Entry>::new();
        assert!(codec.decode(b"not json").is_err());
        assert!(codec.decode(br#"{"a":"b"}"#).is_err());
    }
}
