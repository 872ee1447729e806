//! Base64 text encoding for binary fields.
//!
//! Every binary value that appears in envelope metadata, identity files or
//! invites is written as standard base64 with padding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::CoreError;

/// Encode bytes as standard base64.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 into a byte vector.
pub fn from_base64(s: &str) -> Result<Vec<u8>, CoreError> {
    STANDARD
        .decode(s.trim())
        .map_err(|e| CoreError::DecodingError(format!("base64: {e}")))
}

/// Decode standard base64 into a fixed-size array.
pub fn array_from_base64<const N: usize>(s: &str) -> Result<[u8; N], CoreError> {
    let bytes = from_base64(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        CoreError::DecodingError(format!("expected {} bytes, got {}", N, bytes.len()))
    })
}

/// Implement `Serialize`/`Deserialize` as a base64 string for a type with
/// `to_base64(&self) -> String` and `from_base64(&str) -> Result<Self, CoreError>`.
macro_rules! base64_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_base64())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                <$ty>::from_base64(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use base64_serde;
