//! Newline-delimited message framing
//!
//! Wire format: `<message bytes> '\n'`. There is no escaping, so a message
//! containing `\n` arrives as two messages.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::NetworkError;

/// Default maximum message size (1 MiB), terminator excluded
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Codec for newline-terminated messages
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Bytes of `src` already scanned for a terminator
    next_index: usize,
    /// Maximum buffered message size
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default size limit
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_MESSAGE_LEN)
    }

    /// Create a codec with a custom size limit
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Maximum message size
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = NetworkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let scan_from = self.next_index.min(src.len());
        if let Some(offset) = src[scan_from..].iter().position(|b| *b == b'\n') {
            let end = scan_from + offset;
            self.next_index = 0;
            if end > self.max_len {
                return Err(NetworkError::MessageTooLong {
                    len: end,
                    max: self.max_len,
                });
            }
            let mut line = src.split_to(end + 1);
            line.truncate(end);
            return Ok(Some(line.freeze()));
        }

        if src.len() > self.max_len {
            return Err(NetworkError::MessageTooLong {
                len: src.len(),
                max: self.max_len,
            });
        }
        self.next_index = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if !src.is_empty() {
            debug!(bytes = src.len(), "Discarding truncated message at end of stream");
            src.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = NetworkError;

    fn encode(&mut self, message: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(message.len() + 1);
        dst.put_slice(&message);
        dst.put_u8(b'\n');
        Ok(())
    }
}
