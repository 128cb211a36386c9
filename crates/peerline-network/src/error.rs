//! Network error types

use peerline_crypto::{CryptoError, PeerId};
use thiserror::Error;

/// Network errors
#[derive(Debug, Error)]
pub enum NetworkError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed multiaddr
    #[error("invalid multiaddr: {0}")]
    InvalidMultiaddr(String),

    /// Address without a trailing `/p2p/<id>` component
    #[error("address has no peer id component: {0}")]
    MissingPeerId(String),

    /// Address that cannot be used for TCP
    #[error("unsupported address: {0}")]
    UnsupportedAddress(String),

    /// Malformed protocol identifier
    #[error("invalid protocol id: {0}")]
    InvalidProtocol(String),

    /// No known addresses for a peer
    #[error("no addresses known for peer {0}")]
    NoAddresses(PeerId),

    /// Attempted to dial our own peer ID
    #[error("dial to self attempted")]
    DialSelf,

    /// Connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Handshake failed
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Remote identity differs from the dialed one
    #[error("peer id mismatch: expected {expected}, got {actual}")]
    PeerIdMismatch {
        /// Peer ID we dialed
        expected: PeerId,
        /// Peer ID the remote proved
        actual: PeerId,
    },

    /// No live connection to the peer
    #[error("no connection to peer {0}")]
    NotConnected(PeerId),

    /// Remote refused to open a stream
    #[error("protocol {protocol} rejected: {reason}")]
    ProtocolRejected {
        /// Requested protocol
        protocol: String,
        /// Reason given by the remote
        reason: String,
    },

    /// Framed message exceeded the size limit
    #[error("message too long: {len} bytes (max {max})")]
    MessageTooLong {
        /// Bytes buffered without a terminator
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// Timeout
    #[error("timeout: {0}")]
    Timeout(String),

    /// Cryptographic error
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Host is shut down
    #[error("host is shut down")]
    Shutdown,
}

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;
