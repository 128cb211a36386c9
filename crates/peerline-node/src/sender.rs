//! Message sender: `send <peer-id> <message>`

use crate::error::{NodeError, NodeResult};
use bytes::Bytes;
use futures::SinkExt;
use peerline_crypto::PeerIdError;
use peerline_network::{Host, LineCodec, PeerId, ProtocolId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::codec::FramedWrite;
use tracing::debug;

/// Stand-in deadline for timeouts too large to add to the clock
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// `timeout` from now, saturating instead of overflowing
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Writes one framed message per outbound stream
pub struct MessageSender<H: Host> {
    host: Arc<H>,
    protocol: ProtocolId,
}

impl<H: Host> MessageSender<H> {
    /// Create a sender using `protocol` for its streams
    pub fn new(host: Arc<H>, protocol: ProtocolId) -> Self {
        Self { host, protocol }
    }

    /// Protocol used for outbound streams
    pub fn protocol(&self) -> &ProtocolId {
        &self.protocol
    }

    /// Decode `peer` and send `body` to it
    pub async fn send(&self, peer: &str, body: &[u8], timeout: Duration) -> NodeResult<PeerId> {
        let peer: PeerId = peer
            .parse()
            .map_err(|e: PeerIdError| NodeError::InvalidPeerId(e.to_string()))?;
        self.send_to(peer, body, timeout).await?;
        Ok(peer)
    }

    /// Open a stream to `peer`, write `body` plus a newline and close it
    ///
    /// `timeout` bounds the whole operation. Success means the bytes were
    /// handed to the local transport, not that the peer read them.
    pub async fn send_to(&self, peer: PeerId, body: &[u8], timeout: Duration) -> NodeResult<()> {
        let deadline = deadline_after(timeout);

        let stream = match tokio::time::timeout_at(
            deadline,
            self.host.new_stream(peer, &self.protocol),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(NodeError::StreamOpen(e.to_string())),
            Err(_) => {
                return Err(NodeError::StreamOpen(format!(
                    "timed out after {:?} opening stream to {}",
                    timeout, peer
                )))
            }
        };

        // Dropping the framed writer on any error path closes the stream.
        let mut framed = FramedWrite::new(stream, LineCodec::new());
        let written = tokio::time::timeout_at(deadline, async {
            framed.send(Bytes::copy_from_slice(body)).await?;
            framed.close().await
        })
        .await;

        match written {
            Ok(Ok(())) => {
                debug!("Sent {} bytes to {}", body.len(), peer);
                Ok(())
            }
            Ok(Err(e)) => Err(NodeError::Write(e.to_string())),
            Err(_) => Err(NodeError::Write(format!(
                "timed out after {:?} writing to {}",
                timeout, peer
            ))),
        }
    }
}
