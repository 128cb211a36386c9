//! Protocol identifiers

use crate::error::{NetworkError, NetworkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum protocol identifier length
const MAX_PROTOCOL_LEN: usize = 128;

/// Versioned protocol tag selecting the handler for a stream, e.g. `/p2p/1.0.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolId(String);

impl ProtocolId {
    /// Validate and wrap a protocol identifier
    pub fn new(id: impl Into<String>) -> NetworkResult<Self> {
        let id = id.into();
        if !id.starts_with('/') || id.len() < 2 {
            return Err(NetworkError::InvalidProtocol(format!(
                "must start with '/' and be non-empty: {:?}",
                id
            )));
        }
        if id.len() > MAX_PROTOCOL_LEN {
            return Err(NetworkError::InvalidProtocol(format!(
                "longer than {} bytes",
                MAX_PROTOCOL_LEN
            )));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(NetworkError::InvalidProtocol(format!(
                "contains whitespace: {:?}",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Get as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProtocolId {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProtocolId {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProtocolId> for String {
    fn from(id: ProtocolId) -> Self {
        id.0
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_protocol() {
        let id = ProtocolId::new("/p2p/1.0.0").unwrap();
        assert_eq!(id.as_str(), "/p2p/1.0.0");
        assert_eq!(id.to_string(), "/p2p/1.0.0");
    }

    #[test]
    fn test_invalid_protocols() {
        for bad in ["", "/", "p2p/1.0.0", "/chat 1.0", "/chat\n"] {
            assert!(ProtocolId::new(bad).is_err(), "{:?} should be rejected", bad);
        }
        assert!(ProtocolId::new(format!("/{}", "x".repeat(200))).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: ProtocolId = serde_json::from_str("\"/chat/2.0.0\"").unwrap();
        assert_eq!(id.as_str(), "/chat/2.0.0");
        assert!(serde_json::from_str::<ProtocolId>("\"chat\"").is_err());
    }
}
