//! Cryptographic errors

use crate::peer_id::PeerIdError;
use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Invalid signature encoding
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Invalid public key encoding
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid private key
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Peer ID error
    #[error("peer id error: {0}")]
    PeerId(#[from] PeerIdError),
}
