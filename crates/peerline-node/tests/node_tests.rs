//! Two-node integration tests for peerline-node

use bytes::Bytes;
use peerline_network::{Host, Multiaddr, MultiaddrExt, PeerId, TcpHost};
use peerline_node::{ChannelObserver, CommandLoop, LoopState, Node, NodeConfig, NodeError, PROMPT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

type Inbox = UnboundedReceiver<(PeerId, Bytes)>;

async fn start_node() -> (Arc<Node<TcpHost>>, Multiaddr, Inbox) {
    let config = NodeConfig {
        connect_timeout_secs: 5,
        send_timeout_secs: 5,
        ..NodeConfig::default()
    };
    let node = Arc::new(Node::with_tcp_host(config).expect("node creation failed"));
    let (observer, inbox) = ChannelObserver::new();
    let addr = node
        .start(&"/ip4/127.0.0.1/tcp/0".parse().unwrap(), Arc::new(observer))
        .await
        .expect("start failed");
    (node, addr, inbox)
}

async fn next_message(inbox: &mut Inbox) -> (PeerId, String) {
    let (peer, bytes) = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
        .await
        .expect("no message within timeout")
        .expect("inbox closed");
    (peer, String::from_utf8_lossy(&bytes).into_owned())
}

async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// B connects to A and sends "hello"; A's handler sees exactly that message.
#[tokio::test]
async fn test_two_node_hello() {
    let (a, a_addr, mut a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;
    let mut console = CommandLoop::new(Arc::clone(&b));

    let reply = console.execute(&format!("connect {}", a_addr)).await.unwrap();
    assert_eq!(reply, format!("Connected to peer: {}", a.peer_id()));

    // connect alone opens no message stream
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(a_inbox.try_recv().is_err());

    let reply = console
        .execute(&format!("send {} hello", a.peer_id()))
        .await
        .unwrap();
    assert_eq!(reply, format!("Message sent to {}", a.peer_id()));

    let (from, text) = next_message(&mut a_inbox).await;
    assert_eq!(from, b.peer_id());
    assert_eq!(text, "hello");
    assert_eq!(console.state(), LoopState::Running);
}

/// Interior whitespace runs in a send command collapse to single spaces.
#[tokio::test]
async fn test_send_collapses_whitespace() {
    let (a, a_addr, mut a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;
    let mut console = CommandLoop::new(Arc::clone(&b));

    console.execute(&format!("connect {}", a_addr)).await.unwrap();
    console
        .execute(&format!("send {} hello   world", a.peer_id()))
        .await
        .unwrap();

    assert_eq!(next_message(&mut a_inbox).await.1, "hello world");
}

/// A body with an embedded newline is not escaped and arrives as two messages.
#[tokio::test]
async fn test_embedded_newline_splits_message() {
    let (a, a_addr, mut a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    b.connect(&a_addr.to_string()).await.unwrap();
    b.send(&a.peer_id().to_string(), b"line one\nline two")
        .await
        .unwrap();

    assert_eq!(next_message(&mut a_inbox).await.1, "line one");
    assert_eq!(next_message(&mut a_inbox).await.1, "line two");
}

/// Messages from several sends arrive in order on the receiving node.
#[tokio::test]
async fn test_sequential_sends_in_order() {
    let (a, a_addr, mut a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    b.connect(&a_addr.to_string()).await.unwrap();
    for i in 0..3 {
        b.send(&a.peer_id().to_string(), format!("msg {}", i).as_bytes())
            .await
            .unwrap();
        assert_eq!(next_message(&mut a_inbox).await.1, format!("msg {}", i));
    }
}

/// Connecting twice records the address once and keeps one connection.
#[tokio::test]
async fn test_connect_is_idempotent() {
    let (a, a_addr, _a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    let first = b.connect(&a_addr.to_string()).await.unwrap();
    let second = b.connect(&a_addr.to_string()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(b.host().addresses(&a.peer_id()).len(), 1);
    assert_eq!(b.host().connected_peers(), vec![a.peer_id()]);
}

/// The node that was connected to can send back without its own connect.
#[tokio::test]
async fn test_reply_over_inbound_connection() {
    let (a, a_addr, _a_inbox) = start_node().await;
    let (b, _, mut b_inbox) = start_node().await;

    b.connect(&a_addr.to_string()).await.unwrap();
    let host = Arc::clone(a.host());
    let b_id = b.peer_id();
    wait_until(move || host.is_connected(&b_id)).await;

    a.send(&b.peer_id().to_string(), b"pong").await.unwrap();
    let (from, text) = next_message(&mut b_inbox).await;
    assert_eq!(from, a.peer_id());
    assert_eq!(text, "pong");
}

/// Sending to a peer that was never connected fails with a stream-open error.
#[tokio::test]
async fn test_send_to_unknown_peer() {
    let (_a, _, _a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    let result = b.send(&PeerId::random().to_string(), b"hello").await;
    assert!(matches!(result, Err(NodeError::StreamOpen(_))));
}

/// A wrong /p2p/ id for a live address is a connection error.
#[tokio::test]
async fn test_connect_wrong_peer_id() {
    let (_a, a_addr, _a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    let forged = format!("{}/p2p/{}", a_addr.without_peer_id(), PeerId::random());
    assert!(matches!(
        b.connect(&forged).await,
        Err(NodeError::Connection(_))
    ));
}

/// Once the remote goes away, sends fail instead of hanging.
#[tokio::test]
async fn test_send_after_remote_shutdown() {
    let (a, a_addr, _a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    b.connect(&a_addr.to_string()).await.unwrap();
    a.shutdown();

    let host = Arc::clone(b.host());
    let a_id = a.peer_id();
    wait_until(move || !host.is_connected(&a_id)).await;

    let result = b.send(&a.peer_id().to_string(), b"anyone there?").await;
    assert!(matches!(result, Err(NodeError::StreamOpen(_))));
}

/// A scripted console session: connect, send, a bad command, exit.
#[tokio::test]
async fn test_scripted_session() {
    let (a, a_addr, mut a_inbox) = start_node().await;
    let (b, _, _b_inbox) = start_node().await;

    let script = format!(
        "connect {}\nconnect badaddress\nsend {} from the script\nexit\n",
        a_addr,
        a.peer_id()
    );
    let mut output = Vec::new();
    let state = CommandLoop::new(Arc::clone(&b))
        .run(script.as_bytes(), &mut output)
        .await
        .unwrap();
    assert_eq!(state, LoopState::Exiting);

    let output = String::from_utf8(output).unwrap();
    let replies: Vec<&str> = output
        .lines()
        .filter(|line| !line.is_empty() && *line != PROMPT)
        .collect();
    assert_eq!(replies.len(), 4, "{}", output);
    assert_eq!(replies[0], format!("Connected to peer: {}", a.peer_id()));
    assert!(replies[1].starts_with("Error: invalid address"));
    assert_eq!(replies[2], format!("Message sent to {}", a.peer_id()));
    assert_eq!(replies[3], "Exiting...");

    assert_eq!(next_message(&mut a_inbox).await.1, "from the script");
}
