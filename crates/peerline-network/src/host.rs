//! Host abstraction
//!
//! The capability surface the node core needs from a transport: identity,
//! listening, dialing, protocol-scoped streams and an address book. The
//! core is generic over this trait; `TcpHost` is the shipped implementation.

use crate::error::NetworkResult;
use crate::addr::Multiaddr;
use crate::protocol::ProtocolId;
use futures::future::BoxFuture;
use peerline_crypto::PeerId;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Callback invoked for every inbound stream of a registered protocol
///
/// Runs on a task owned by the host; one invocation per stream.
pub type StreamHandler<S> = Arc<dyn Fn(PeerId, S) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`StreamHandler`]
pub fn stream_handler<S, F, Fut>(handler: F) -> StreamHandler<S>
where
    F: Fn(PeerId, S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |peer, stream| Box::pin(handler(peer, stream)) as BoxFuture<'static, ()>)
}

/// Transport host capabilities
pub trait Host: Send + Sync + 'static {
    /// Bidirectional byte stream type
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Local peer identity
    fn peer_id(&self) -> PeerId;

    /// Start listening; returns the bound address (port 0 resolved)
    fn listen(&self, addr: &Multiaddr) -> impl Future<Output = NetworkResult<Multiaddr>> + Send;

    /// Addresses currently listened on
    fn listen_addrs(&self) -> Vec<Multiaddr>;

    /// Record addresses for a peer in the permanent address book
    ///
    /// Returns how many addresses were new.
    fn add_addresses(&self, peer: PeerId, addrs: &[Multiaddr]) -> usize;

    /// Known addresses for a peer
    fn addresses(&self, peer: &PeerId) -> Vec<Multiaddr>;

    /// Establish a live connection using the recorded addresses
    ///
    /// Succeeds immediately if already connected.
    fn dial(&self, peer: PeerId) -> impl Future<Output = NetworkResult<()>> + Send;

    /// Check for a live connection
    fn is_connected(&self, peer: &PeerId) -> bool;

    /// Peers with a live connection
    fn connected_peers(&self) -> Vec<PeerId>;

    /// Open an outbound stream; fails if there is no live connection
    fn new_stream(
        &self,
        peer: PeerId,
        protocol: &ProtocolId,
    ) -> impl Future<Output = NetworkResult<Self::Stream>> + Send;

    /// Register the handler for inbound streams of `protocol`
    ///
    /// Replaces any previous handler for the same protocol.
    fn set_stream_handler(&self, protocol: ProtocolId, handler: StreamHandler<Self::Stream>);
}
