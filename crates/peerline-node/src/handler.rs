//! Inbound stream handling
//!
//! Reads newline-delimited messages from an inbound stream and hands each
//! one to a [`MessageObserver`] until the stream ends or fails. Failures
//! stay local to the stream.

use crate::error::{NodeError, NodeResult};
use bytes::Bytes;
use futures::StreamExt;
use peerline_network::{stream_handler, LineCodec, PeerId, StreamHandler};
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, trace, warn};

/// Receives messages decoded from inbound streams
pub trait MessageObserver: Send + Sync + 'static {
    /// Called once per message, in stream order
    fn on_message(&self, peer: PeerId, message: Bytes);
}

/// Prints `Received message: <text>` to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl MessageObserver for ConsoleObserver {
    fn on_message(&self, _peer: PeerId, message: Bytes) {
        let mut stdout = std::io::stdout().lock();
        // stdout is the operator console; nothing useful to do if it is gone
        let _ = writeln!(stdout, "Received message: {}", String::from_utf8_lossy(&message));
        let _ = stdout.flush();
    }
}

/// Forwards messages into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<(PeerId, Bytes)>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(PeerId, Bytes)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageObserver for ChannelObserver {
    fn on_message(&self, peer: PeerId, message: Bytes) {
        if self.tx.send((peer, message)).is_err() {
            trace!("Message observer channel closed");
        }
    }
}

/// Deliver every message on `stream` to `observer`
///
/// Returns the number of messages delivered once the remote closes the
/// stream, or `NodeError::Read` if reading fails first. A partial message
/// at close is dropped.
pub async fn handle_stream<S, O>(
    peer: PeerId,
    stream: S,
    max_message_len: usize,
    observer: &O,
) -> NodeResult<usize>
where
    S: AsyncRead + Unpin,
    O: MessageObserver + ?Sized,
{
    let mut messages = FramedRead::new(stream, LineCodec::with_max_len(max_message_len));
    let mut delivered = 0;

    while let Some(frame) = messages.next().await {
        let message = frame.map_err(|e| NodeError::Read(e.to_string()))?;
        trace!("Message from {} ({} bytes)", peer, message.len());
        observer.on_message(peer, message);
        delivered += 1;
    }
    Ok(delivered)
}

/// Build the host-facing handler that runs [`handle_stream`] for each inbound stream
pub fn message_handler<S, O>(observer: Arc<O>, max_message_len: usize) -> StreamHandler<S>
where
    S: AsyncRead + Send + Unpin + 'static,
    O: MessageObserver + ?Sized,
{
    stream_handler(move |peer: PeerId, stream: S| {
        let observer = Arc::clone(&observer);
        async move {
            info!("Received a new stream from {}", peer);
            match handle_stream(peer, stream, max_message_len, observer.as_ref()).await {
                Ok(count) => debug!("Stream from {} closed after {} message(s)", peer, count),
                Err(e) => warn!("Stream from {} ended: {}", peer, e),
            }
        }
    })
}
