use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),
}

/// Serialize a value as JSON bytes.
///
/// JSON is the one codec in this crate: the backing store is a text
/// substrate and every webhook payload arrives as JSON already.
pub fn serialize<T>(ty: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    serde_json::to_vec(ty).map_err(|err| SerializeError::Serialize(err.to_string()))
}

/// Deserialize a value produced by [`serialize`].
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(|err| SerializeError::Deserialize(err.to_string()))
}
