//! TCP implementation of [`Host`]
//!
//! Every interaction is its own TCP connection that starts with the
//! authenticated handshake:
//!
//! - a `connect` connection stays open as the liveness channel for the
//!   peer; when it closes the peer counts as disconnected,
//! - a `stream` connection carries one protocol stream and is handed to the
//!   registered handler (inbound) or returned to the caller (outbound).

use crate::addr::{Multiaddr, MultiaddrExt};
use crate::address_book::AddressBook;
use crate::error::{NetworkError, NetworkResult};
use crate::handshake::{self, Outcome, Purpose};
use crate::host::{Host, StreamHandler};
use crate::protocol::ProtocolId;
use parking_lot::RwLock;
use peerline_crypto::{Keypair, PeerId};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// TCP host configuration
#[derive(Debug, Clone)]
pub struct TcpHostConfig {
    /// Timeout for a single TCP connect attempt
    pub dial_timeout: Duration,
    /// Timeout for the handshake on either side
    pub handshake_timeout: Duration,
}

impl Default for TcpHostConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Which side opened a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote dialed us
    Inbound,
    /// We dialed the remote
    Outbound,
}

/// Snapshot of a live connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Remote peer
    pub peer_id: PeerId,
    /// Remote socket address
    pub remote_addr: SocketAddr,
    /// Direction
    pub direction: Direction,
    /// Time the handshake completed
    pub established_at: Instant,
}

struct Connection {
    id: u64,
    info: ConnectionInfo,
    cancel: CancellationToken,
}

struct Inner {
    keypair: Keypair,
    config: TcpHostConfig,
    address_book: AddressBook,
    connections: RwLock<HashMap<PeerId, Connection>>,
    handlers: RwLock<HashMap<ProtocolId, StreamHandler<TcpStream>>>,
    listen_addrs: RwLock<Vec<Multiaddr>>,
    next_connection_id: AtomicU64,
    shutdown: CancellationToken,
}

/// Host over plain TCP
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TcpHost {
    inner: Arc<Inner>,
}

impl TcpHost {
    /// Create a host with the given identity
    pub fn new(keypair: Keypair, config: TcpHostConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                keypair,
                config,
                address_book: AddressBook::new(),
                connections: RwLock::new(HashMap::new()),
                handlers: RwLock::new(HashMap::new()),
                listen_addrs: RwLock::new(Vec::new()),
                next_connection_id: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Create a host with a fresh identity and default configuration
    pub fn generate() -> NetworkResult<Self> {
        Ok(Self::new(Keypair::generate()?, TcpHostConfig::default()))
    }

    /// Live connections
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.inner
            .connections
            .read()
            .values()
            .map(|conn| conn.info.clone())
            .collect()
    }

    /// Close the live connection to a peer; returns false if there was none
    pub fn disconnect(&self, peer: &PeerId) -> bool {
        let removed = self.inner.connections.write().remove(peer);
        match removed {
            Some(conn) => {
                conn.cancel.cancel();
                info!("Disconnected from peer {}", peer);
                true
            }
            None => false,
        }
    }

    /// Stop listeners and close every connection
    ///
    /// Inbound streams still inside their handler are dropped as well.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.connections.write().clear();
        self.inner.listen_addrs.write().clear();
        info!("Host {} shut down", self.inner.keypair.peer_id());
    }

    /// Check if shut down
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    fn ensure_running(&self) -> NetworkResult<()> {
        if self.is_shutdown() {
            return Err(NetworkError::Shutdown);
        }
        Ok(())
    }

    async fn listen_on(&self, addr: Multiaddr) -> NetworkResult<Multiaddr> {
        self.ensure_running()?;
        let socket_addr = addr
            .without_peer_id()
            .to_socket_addr()
            .ok_or_else(|| NetworkError::UnsupportedAddress(addr.to_string()))?;

        let listener = TcpListener::bind(socket_addr).await?;
        let bound = Multiaddr::from_socket_addr(listener.local_addr()?);
        self.inner.listen_addrs.write().push(bound.clone());
        info!("Listening on {}", bound);

        let host = self.clone();
        tokio::spawn(async move { host.accept_loop(listener).await });
        Ok(bound)
    }

    async fn accept_loop(self, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Incoming connection from {}", addr);
                        let host = self.clone();
                        tokio::spawn(async move {
                            if let Err(e) = host.handle_inbound(stream, addr).await {
                                debug!("Inbound connection from {} failed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }
        debug!("Accept loop stopped");
    }

    async fn handle_inbound(&self, mut stream: TcpStream, addr: SocketAddr) -> NetworkResult<()> {
        let decide = |hello: &handshake::Hello| match &hello.purpose {
            Purpose::Connect => Outcome::Accepted,
            Purpose::Stream { protocol } => {
                if self.inner.handlers.read().contains_key(protocol) {
                    Outcome::Accepted
                } else {
                    Outcome::Rejected {
                        reason: format!("protocol {} not supported", protocol),
                    }
                }
            }
        };

        let (established, purpose) = tokio::time::timeout(
            self.inner.config.handshake_timeout,
            handshake::respond(&mut stream, &self.inner.keypair, self.listen_addrs(), decide),
        )
        .await
        .map_err(|_| NetworkError::Timeout(format!("inbound handshake from {}", addr)))??;

        let peer = established.remote;
        self.record_advertised(peer, &established.listen_addrs, addr);

        match purpose {
            Purpose::Connect => {
                let id = self.register_connection(peer, addr, Direction::Inbound, stream);
                debug!("Accepted connection {} from {}", id, peer);
            }
            Purpose::Stream { protocol } => {
                let handler = self.inner.handlers.read().get(&protocol).cloned();
                match handler {
                    Some(handler) => {
                        debug!("Inbound stream {} from {}", protocol, peer);
                        tokio::select! {
                            _ = self.inner.shutdown.cancelled() => {
                                debug!("Dropped inbound stream {} from {} on shutdown", protocol, peer);
                            }
                            _ = handler(peer, stream) => {}
                        }
                    }
                    None => warn!("Handler for {} removed before stream from {}", protocol, peer),
                }
            }
        }
        Ok(())
    }

    /// Remember the remote's advertised listen addresses
    ///
    /// Unspecified IPs are replaced with the IP the connection came from.
    fn record_advertised(&self, peer: PeerId, advertised: &[Multiaddr], observed: SocketAddr) {
        let addrs: Vec<Multiaddr> = advertised
            .iter()
            .map(|addr| addr.replace_unspecified(observed.ip()))
            .collect();
        let added = self.inner.address_book.add_addresses(peer, &addrs);
        if added > 0 {
            debug!("Learned {} address(es) for {}", added, peer);
        }
    }

    /// Track a liveness connection and watch it until it closes
    ///
    /// Returns the connection id.
    fn register_connection(
        &self,
        peer: PeerId,
        remote_addr: SocketAddr,
        direction: Direction,
        stream: TcpStream,
    ) -> u64 {
        let id = self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.shutdown.child_token();
        let previous = self.inner.connections.write().insert(
            peer,
            Connection {
                id,
                info: ConnectionInfo {
                    peer_id: peer,
                    remote_addr,
                    direction,
                    established_at: Instant::now(),
                },
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!("Replacing connection {} to {}", previous.id, peer);
            previous.cancel.cancel();
        }

        let host = self.clone();
        tokio::spawn(async move { host.watch_connection(peer, id, stream, cancel).await });
        id
    }

    /// The liveness channel carries no data; any read result ends it
    async fn watch_connection(
        self,
        peer: PeerId,
        id: u64,
        mut stream: TcpStream,
        cancel: CancellationToken,
    ) {
        let mut buf = [0u8; 64];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                read = stream.read(&mut buf) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                },
            }
        }
        drop(stream);

        let removed = {
            let mut connections = self.inner.connections.write();
            if connections.get(&peer).map(|conn| conn.id) == Some(id) {
                connections.remove(&peer);
                true
            } else {
                false
            }
        };
        if removed {
            info!("Peer {} disconnected", peer);
        }
    }

    async fn dial_peer(&self, peer: PeerId) -> NetworkResult<()> {
        self.ensure_running()?;
        if peer == self.peer_id() {
            return Err(NetworkError::DialSelf);
        }
        if self.is_connected(&peer) {
            debug!("Already connected to {}", peer);
            return Ok(());
        }

        let (stream, remote_addr) = self.open_authenticated(peer, Purpose::Connect).await?;
        self.register_connection(peer, remote_addr, Direction::Outbound, stream);
        info!("Connected to peer {} at {}", peer, remote_addr);
        Ok(())
    }

    async fn open_stream(&self, peer: PeerId, protocol: ProtocolId) -> NetworkResult<TcpStream> {
        self.ensure_running()?;
        if peer == self.peer_id() {
            return Err(NetworkError::DialSelf);
        }
        if !self.is_connected(&peer) {
            return Err(NetworkError::NotConnected(peer));
        }

        let purpose = Purpose::Stream {
            protocol: protocol.clone(),
        };
        let (stream, remote_addr) = self.open_authenticated(peer, purpose).await?;
        debug!("Opened {} stream to {} at {}", protocol, peer, remote_addr);
        Ok(stream)
    }

    /// Try each known address until one completes the handshake
    async fn open_authenticated(
        &self,
        peer: PeerId,
        purpose: Purpose,
    ) -> NetworkResult<(TcpStream, SocketAddr)> {
        let addrs = self.inner.address_book.addresses(&peer);
        let mut last_error = NetworkError::NoAddresses(peer);

        for addr in addrs {
            match self.open_on(&addr, peer, purpose.clone()).await {
                Ok(opened) => return Ok(opened),
                // The peer answered; another address would give the same verdict.
                Err(e @ NetworkError::ProtocolRejected { .. }) => return Err(e),
                Err(e) => {
                    debug!("Dial {} via {} failed: {}", peer, addr, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn open_on(
        &self,
        addr: &Multiaddr,
        peer: PeerId,
        purpose: Purpose,
    ) -> NetworkResult<(TcpStream, SocketAddr)> {
        let (mut stream, remote_addr) = self.connect_socket(addr).await?;

        let established = tokio::time::timeout(
            self.inner.config.handshake_timeout,
            handshake::initiate(
                &mut stream,
                &self.inner.keypair,
                self.listen_addrs(),
                purpose,
                peer,
            ),
        )
        .await
        .map_err(|_| NetworkError::Timeout(format!("handshake with {}", peer)))??;

        self.record_advertised(peer, &established.listen_addrs, remote_addr);
        Ok((stream, remote_addr))
    }

    async fn connect_socket(&self, addr: &Multiaddr) -> NetworkResult<(TcpStream, SocketAddr)> {
        let mut last_error = NetworkError::UnsupportedAddress(addr.to_string());
        for socket_addr in crate::addr::resolve(addr).await? {
            match tokio::time::timeout(
                self.inner.config.dial_timeout,
                TcpStream::connect(socket_addr),
            )
            .await
            {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true)?;
                    return Ok((stream, socket_addr));
                }
                Ok(Err(e)) => {
                    last_error = NetworkError::ConnectionFailed(format!("{}: {}", socket_addr, e));
                }
                Err(_) => {
                    last_error = NetworkError::Timeout(format!("dial {}", socket_addr));
                }
            }
        }
        Err(last_error)
    }
}

impl std::fmt::Debug for TcpHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpHost")
            .field("peer_id", &self.inner.keypair.peer_id())
            .field("listen_addrs", &*self.inner.listen_addrs.read())
            .field("connections", &self.inner.connections.read().len())
            .finish()
    }
}

impl Host for TcpHost {
    type Stream = TcpStream;

    fn peer_id(&self) -> PeerId {
        self.inner.keypair.peer_id()
    }

    fn listen(&self, addr: &Multiaddr) -> impl Future<Output = NetworkResult<Multiaddr>> + Send {
        let host = self.clone();
        let addr = addr.clone();
        async move { host.listen_on(addr).await }
    }

    fn listen_addrs(&self) -> Vec<Multiaddr> {
        self.inner.listen_addrs.read().clone()
    }

    fn add_addresses(&self, peer: PeerId, addrs: &[Multiaddr]) -> usize {
        self.inner.address_book.add_addresses(peer, addrs)
    }

    fn addresses(&self, peer: &PeerId) -> Vec<Multiaddr> {
        self.inner.address_book.addresses(peer)
    }

    fn dial(&self, peer: PeerId) -> impl Future<Output = NetworkResult<()>> + Send {
        let host = self.clone();
        async move { host.dial_peer(peer).await }
    }

    fn is_connected(&self, peer: &PeerId) -> bool {
        self.inner.connections.read().contains_key(peer)
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        self.inner.connections.read().keys().copied().collect()
    }

    fn new_stream(
        &self,
        peer: PeerId,
        protocol: &ProtocolId,
    ) -> impl Future<Output = NetworkResult<Self::Stream>> + Send {
        let host = self.clone();
        let protocol = protocol.clone();
        async move { host.open_stream(peer, protocol).await }
    }

    fn set_stream_handler(&self, protocol: ProtocolId, handler: StreamHandler<Self::Stream>) {
        debug!("Registered handler for {}", protocol);
        self.inner.handlers.write().insert(protocol, handler);
    }
}
