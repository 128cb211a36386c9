//! Authenticated connection handshake
//!
//! Every TCP connection opens with three length-prefixed JSON frames:
//!
//! ```text
//! initiator                          responder
//!     | ---- Hello {nonce_i, purpose} ----> |
//!     | <--- HelloAck {nonce_r, sig(nonce_i), outcome}
//!     | ---- Proof {sig(nonce_r)} --------> |
//! ```
//!
//! Each side proves ownership of the key its `PeerId` is derived from by
//! signing the other side's nonce.

use crate::error::{NetworkError, NetworkResult};
use crate::addr::Multiaddr;
use crate::protocol::ProtocolId;
use peerline_crypto::{keccak256, Keypair, PeerId, PublicKey, Signature};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Handshake protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum handshake frame size (64 KiB)
const MAX_FRAME_LEN: usize = 64 * 1024;

/// Domain separator mixed into every signed challenge
const SIGNATURE_DOMAIN: &[u8] = b"peerline-handshake-v1";

/// What the initiator wants the connection for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Purpose {
    /// Long-lived liveness connection
    Connect,
    /// One application stream
    Stream {
        /// Protocol to dispatch the stream to
        protocol: ProtocolId,
    },
}

/// Responder's decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Connection accepted
    Accepted,
    /// Connection refused
    Rejected {
        /// Human-readable reason
        reason: String,
    },
}

/// First frame, initiator to responder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    /// Handshake version
    pub version: u32,
    /// Claimed peer ID
    pub peer_id: PeerId,
    /// Compressed public key, hex
    pub public_key: String,
    /// Addresses the initiator listens on
    pub listen_addrs: Vec<Multiaddr>,
    /// Challenge for the responder, hex
    pub nonce: String,
    /// Requested purpose
    pub purpose: Purpose,
}

/// Second frame, responder to initiator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloAck {
    /// Handshake version
    pub version: u32,
    /// Claimed peer ID
    pub peer_id: PeerId,
    /// Compressed public key, hex
    pub public_key: String,
    /// Addresses the responder listens on
    pub listen_addrs: Vec<Multiaddr>,
    /// Challenge for the initiator, hex
    pub nonce: String,
    /// Signature over the initiator's nonce, hex
    pub signature: String,
    /// Accept or reject
    pub outcome: Outcome,
}

/// Third frame, initiator to responder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    /// Signature over the responder's nonce, hex
    pub signature: String,
}

/// Verified remote identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Established {
    /// Authenticated remote peer ID
    pub remote: PeerId,
    /// Addresses the remote advertised
    pub listen_addrs: Vec<Multiaddr>,
}

/// Write a length-prefixed JSON frame
pub async fn write_frame<W, T>(stream: &mut W, frame: &T) -> NetworkResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload =
        serde_json::to_vec(frame).map_err(|e| NetworkError::Handshake(e.to_string()))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(NetworkError::Handshake(format!(
            "frame too large: {} bytes",
            payload.len()
        )));
    }
    stream.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Read a length-prefixed JSON frame
///
/// Reads exactly the frame, so bytes following it stay in the stream.
pub async fn read_frame<R, T>(stream: &mut R) -> NetworkResult<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len == 0 || len > MAX_FRAME_LEN {
        return Err(NetworkError::Handshake(format!("invalid frame length {}", len)));
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    serde_json::from_slice(&payload).map_err(|e| NetworkError::Handshake(e.to_string()))
}

/// Digest a peer signs to answer a challenge
fn challenge_digest(nonce: &[u8; 32], signer: &PeerId) -> [u8; 32] {
    let mut data = Vec::with_capacity(SIGNATURE_DOMAIN.len() + 64);
    data.extend_from_slice(SIGNATURE_DOMAIN);
    data.extend_from_slice(nonce);
    data.extend_from_slice(&signer.to_bytes());
    keccak256(&data)
}

fn decode_nonce(hex_nonce: &str) -> NetworkResult<[u8; 32]> {
    let bytes = hex::decode(hex_nonce)
        .map_err(|e| NetworkError::Handshake(format!("bad nonce: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| NetworkError::Handshake("nonce must be 32 bytes".into()))
}

/// Check that `public_key` parses and derives `peer_id`
fn verify_identity(peer_id: &PeerId, public_key: &str) -> NetworkResult<PublicKey> {
    let key = PublicKey::from_hex(public_key)?;
    if key.peer_id() != *peer_id {
        return Err(NetworkError::Handshake(format!(
            "public key does not match claimed peer id {}",
            peer_id
        )));
    }
    Ok(key)
}

fn verify_challenge(
    key: &PublicKey,
    signer: &PeerId,
    nonce: &[u8; 32],
    signature: &str,
) -> NetworkResult<()> {
    let signature = Signature::from_hex(signature)?;
    if !key.verify(&challenge_digest(nonce, signer), &signature) {
        return Err(NetworkError::Handshake(format!(
            "invalid challenge signature from {}",
            signer
        )));
    }
    Ok(())
}

/// Run the initiator side of the handshake
pub async fn initiate<S>(
    stream: &mut S,
    local: &Keypair,
    listen_addrs: Vec<Multiaddr>,
    purpose: Purpose,
    expected: PeerId,
) -> NetworkResult<Established>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let nonce: [u8; 32] = rand::random();
    let hello = Hello {
        version: PROTOCOL_VERSION,
        peer_id: local.peer_id(),
        public_key: local.public().to_hex(),
        listen_addrs,
        nonce: hex::encode(nonce),
        purpose: purpose.clone(),
    };
    write_frame(stream, &hello).await?;

    let ack: HelloAck = read_frame(stream).await?;
    if ack.version != PROTOCOL_VERSION {
        return Err(NetworkError::Handshake(format!(
            "unsupported version {}",
            ack.version
        )));
    }
    let key = verify_identity(&ack.peer_id, &ack.public_key)?;
    if ack.peer_id != expected {
        return Err(NetworkError::PeerIdMismatch {
            expected,
            actual: ack.peer_id,
        });
    }
    verify_challenge(&key, &ack.peer_id, &nonce, &ack.signature)?;

    if let Outcome::Rejected { reason } = ack.outcome {
        return Err(match purpose {
            Purpose::Stream { protocol } => NetworkError::ProtocolRejected {
                protocol: protocol.to_string(),
                reason,
            },
            Purpose::Connect => NetworkError::ConnectionFailed(reason),
        });
    }

    let their_nonce = decode_nonce(&ack.nonce)?;
    let signature = local.sign(&challenge_digest(&their_nonce, &local.peer_id()))?;
    write_frame(
        stream,
        &Proof {
            signature: signature.to_hex(),
        },
    )
    .await?;

    Ok(Established {
        remote: ack.peer_id,
        listen_addrs: ack.listen_addrs,
    })
}

/// Run the responder side of the handshake
///
/// `decide` sees the authenticated `Hello` and chooses the outcome. A
/// rejection is sent to the initiator and returned as an error.
pub async fn respond<S, F>(
    stream: &mut S,
    local: &Keypair,
    listen_addrs: Vec<Multiaddr>,
    decide: F,
) -> NetworkResult<(Established, Purpose)>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FnOnce(&Hello) -> Outcome,
{
    let hello: Hello = read_frame(stream).await?;
    let key = verify_identity(&hello.peer_id, &hello.public_key)?;
    let their_nonce = decode_nonce(&hello.nonce)?;

    let outcome = if hello.version != PROTOCOL_VERSION {
        Outcome::Rejected {
            reason: format!("unsupported version {}", hello.version),
        }
    } else if hello.peer_id == local.peer_id() {
        Outcome::Rejected {
            reason: "dial to self attempted".into(),
        }
    } else {
        decide(&hello)
    };

    let nonce: [u8; 32] = rand::random();
    let signature = local.sign(&challenge_digest(&their_nonce, &local.peer_id()))?;
    let ack = HelloAck {
        version: PROTOCOL_VERSION,
        peer_id: local.peer_id(),
        public_key: local.public().to_hex(),
        listen_addrs,
        nonce: hex::encode(nonce),
        signature: signature.to_hex(),
        outcome: outcome.clone(),
    };
    write_frame(stream, &ack).await?;

    if let Outcome::Rejected { reason } = outcome {
        return Err(NetworkError::Handshake(format!(
            "rejected {}: {}",
            hello.peer_id, reason
        )));
    }

    let proof: Proof = read_frame(stream).await?;
    verify_challenge(&key, &hello.peer_id, &nonce, &proof.signature)?;

    Ok((
        Established {
            remote: hello.peer_id,
            listen_addrs: hello.listen_addrs,
        },
        hello.purpose,
    ))
}
