//! Node lifecycle and identity

use crate::config::NodeConfig;
use crate::connector::PeerConnector;
use crate::error::{NodeError, NodeResult};
use crate::handler::{message_handler, MessageObserver};
use crate::sender::MessageSender;
use peerline_crypto::Keypair;
use peerline_network::{
    AddrInfo, Host, Multiaddr, MultiaddrExt, PeerId, Protocol, ProtocolId, TcpHost,
};
use std::sync::Arc;
use tracing::info;

/// A peerline node over an injected [`Host`]
pub struct Node<H: Host> {
    host: Arc<H>,
    config: NodeConfig,
    protocol: ProtocolId,
    connector: PeerConnector<H>,
    sender: MessageSender<H>,
}

impl Node<TcpHost> {
    /// Create a node over a TCP host with a fresh identity
    pub fn with_tcp_host(config: NodeConfig) -> NodeResult<Self> {
        let keypair = Keypair::generate().map_err(|e| NodeError::Startup(e.to_string()))?;
        let host = TcpHost::new(keypair, config.host_config());
        Self::new(host, config)
    }

    /// Stop listening and drop every connection
    pub fn shutdown(&self) {
        self.host.shutdown();
    }
}

impl<H: Host> Node<H> {
    /// Create a node; does not listen yet
    pub fn new(host: H, config: NodeConfig) -> NodeResult<Self> {
        config.validate()?;
        let protocol = config.protocol_id()?;
        let host = Arc::new(host);
        Ok(Self {
            connector: PeerConnector::new(Arc::clone(&host)),
            sender: MessageSender::new(Arc::clone(&host), protocol.clone()),
            host,
            config,
            protocol,
        })
    }

    /// Register the message handler and start listening
    ///
    /// Returns the dialable address of this node, `/.../tcp/<port>/p2p/<id>`,
    /// with an unspecified IP shown as loopback.
    pub async fn start<O>(&self, listen: &Multiaddr, observer: Arc<O>) -> NodeResult<Multiaddr>
    where
        O: MessageObserver + ?Sized,
    {
        self.host.set_stream_handler(
            self.protocol.clone(),
            message_handler(observer, self.config.max_message_len),
        );
        let bound = self
            .host
            .listen(listen)
            .await
            .map_err(|e| NodeError::Startup(e.to_string()))?;
        info!("Node {} listening on {}", self.peer_id(), bound);
        Ok(self.dialable(&bound))
    }

    /// Local identity
    pub fn peer_id(&self) -> PeerId {
        self.host.peer_id()
    }

    /// Underlying host
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Active configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Protocol identifier for message streams
    pub fn protocol(&self) -> &ProtocolId {
        &self.protocol
    }

    /// Dialable addresses for every listener
    pub fn dialable_addrs(&self) -> Vec<Multiaddr> {
        self.host
            .listen_addrs()
            .iter()
            .map(|addr| self.dialable(addr))
            .collect()
    }

    fn dialable(&self, addr: &Multiaddr) -> Multiaddr {
        addr.with_loopback().with(Protocol::P2p(self.peer_id()))
    }

    /// `connect <peer-addr>` with the configured deadline
    pub async fn connect(&self, addr: &str) -> NodeResult<AddrInfo> {
        self.connector
            .connect(addr, self.config.connect_timeout())
            .await
    }

    /// `send <peer-id> <message>` with the configured deadline
    pub async fn send(&self, peer: &str, body: &[u8]) -> NodeResult<PeerId> {
        self.sender
            .send(peer, body, self.config.send_timeout())
            .await
    }
}
