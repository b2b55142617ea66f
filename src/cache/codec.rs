//! Payload codec
//!
//! Values are stored as JSON text in the payload column.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Serializes a value into its stored payload.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Restores a value from its stored payload.
pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_structured_value() {
        let profile = Profile {
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
        };
        let payload = encode(&profile).unwrap();
        assert_eq!(decode::<Profile>(&payload).unwrap(), profile);
    }

    #[test]
    fn test_decode_wrong_type() {
        let payload = encode("text").unwrap();
        let result = decode::<u32>(&payload);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
