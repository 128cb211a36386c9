//! Interactive command loop

use crate::command::{Command, ParseError};
use crate::error::NodeResult;
use crate::node::Node;
use peerline_network::Host;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Prompt printed before every command
pub const PROMPT: &str = "Enter command (connect <peer-addr>, send <peer-id> <message>, exit):";

/// Command loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Reading commands
    Running,
    /// `exit` seen or input closed
    Exiting,
}

/// Reads operator commands and runs them one at a time
pub struct CommandLoop<H: Host> {
    node: Arc<Node<H>>,
    state: LoopState,
}

impl<H: Host> CommandLoop<H> {
    /// Create a loop in the `Running` state
    pub fn new(node: Arc<Node<H>>) -> Self {
        Self {
            node,
            state: LoopState::Running,
        }
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Prompt, read and execute until `exit` or end of input
    ///
    /// Only console I/O errors end the loop early; command failures are
    /// printed and the loop carries on.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> NodeResult<LoopState>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        while self.state == LoopState::Running {
            output.write_all(format!("\n{}\n", PROMPT).as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("Input closed");
                self.state = LoopState::Exiting;
                break;
            };

            if let Some(reply) = self.execute(&line).await {
                output.write_all(reply.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
        }
        Ok(self.state)
    }

    /// Execute one input line; returns the line to print, if any
    pub async fn execute(&mut self, line: &str) -> Option<String> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(ParseError::Blank) => return None,
            Err(ParseError::Usage(usage)) => return Some(usage.to_string()),
            Err(ParseError::Unknown(name)) => {
                debug!("Unknown command {:?}", name);
                return Some("Unknown command".to_string());
            }
        };

        let reply = match command {
            Command::Connect { addr } => match self.node.connect(&addr).await {
                Ok(info) => format!("Connected to peer: {}", info.id),
                Err(e) => {
                    warn!("connect {} failed: {}", addr, e);
                    format!("Error: {}", e)
                }
            },
            Command::Send { peer, message } => {
                match self.node.send(&peer, message.as_bytes()).await {
                    Ok(id) => format!("Message sent to {}", id),
                    Err(e) => {
                        warn!("send to {} failed: {}", peer, e);
                        format!("Error: {}", e)
                    }
                }
            }
            Command::Exit => {
                self.state = LoopState::Exiting;
                "Exiting...".to_string()
            }
        };
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CONNECT_USAGE, SEND_USAGE};
    use crate::config::NodeConfig;
    use peerline_network::TcpHost;

    fn node() -> Arc<Node<TcpHost>> {
        Arc::new(Node::with_tcp_host(NodeConfig::default()).unwrap())
    }

    async fn run_script(script: &str) -> (LoopState, String) {
        let mut command_loop = CommandLoop::new(node());
        let mut output = Vec::new();
        let state = command_loop
            .run(script.as_bytes(), &mut output)
            .await
            .unwrap();
        (state, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_exit() {
        let (state, output) = run_script("exit\nunknown-after-exit\n").await;
        assert_eq!(state, LoopState::Exiting);
        assert!(output.contains(PROMPT));
        assert!(output.ends_with("Exiting...\n"));
        assert!(!output.contains("Unknown command"));
    }

    #[tokio::test]
    async fn test_end_of_input_exits() {
        let (state, output) = run_script("").await;
        assert_eq!(state, LoopState::Exiting);
        assert_eq!(output, format!("\n{}\n", PROMPT));
    }

    #[tokio::test]
    async fn test_usage_and_unknown_keep_running() {
        let (state, output) = run_script("connect\nsend peer\nfoo\n\nexit\n").await;
        assert_eq!(state, LoopState::Exiting);
        assert!(output.contains(CONNECT_USAGE));
        assert!(output.contains(SEND_USAGE));
        assert!(output.contains("Unknown command"));
        // five prompts: four commands then exit, blank line included
        assert_eq!(output.matches(PROMPT).count(), 5);
    }

    #[tokio::test]
    async fn test_bad_address_keeps_running() {
        let mut command_loop = CommandLoop::new(node());
        let reply = command_loop.execute("connect badaddress").await.unwrap();
        assert!(reply.starts_with("Error: invalid address"), "{}", reply);
        assert_eq!(command_loop.state(), LoopState::Running);
    }

    #[tokio::test]
    async fn test_send_unconnected_keeps_running() {
        let mut command_loop = CommandLoop::new(node());
        let line = format!("send {} hello", peerline_network::PeerId::random());
        let reply = command_loop.execute(&line).await.unwrap();
        assert!(reply.starts_with("Error: failed to open stream"), "{}", reply);
        assert_eq!(command_loop.state(), LoopState::Running);
    }

    #[tokio::test]
    async fn test_send_invalid_peer_id() {
        let mut command_loop = CommandLoop::new(node());
        let reply = command_loop.execute("send not-a-peer hi").await.unwrap();
        assert!(reply.starts_with("Error: invalid peer ID"), "{}", reply);
    }

    #[tokio::test]
    async fn test_blank_line_prints_nothing() {
        let mut command_loop = CommandLoop::new(node());
        assert_eq!(command_loop.execute("   ").await, None);
        assert_eq!(command_loop.state(), LoopState::Running);
    }
}
