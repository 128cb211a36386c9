//! Node error types

use thiserror::Error;

/// Node error types
///
/// Command errors (`connect`, `send`) are reported by the command loop,
/// which keeps running. `Startup` and `Config` are fatal.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Address string is not a valid multiaddr
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address carries no usable peer identity
    #[error("failed to resolve peer address: {0}")]
    AddressResolution(String),

    /// Dial failed or timed out
    #[error("failed to connect to peer: {0}")]
    Connection(String),

    /// Peer ID string could not be decoded
    #[error("invalid peer ID: {0}")]
    InvalidPeerId(String),

    /// Outbound stream could not be opened
    #[error("failed to open stream: {0}")]
    StreamOpen(String),

    /// Writing to a stream failed
    #[error("failed to send message: {0}")]
    Write(String),

    /// Reading from a stream failed
    #[error("error reading from stream: {0}")]
    Read(String),

    /// Host creation or listening failed
    #[error("failed to start node: {0}")]
    Startup(String),

    /// Bad configuration
    #[error("config error: {0}")]
    Config(String),

    /// Console I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
