//! Operator command parsing

/// Usage line for `connect`
pub const CONNECT_USAGE: &str = "Usage: connect <peer-addr>";

/// Usage line for `send`
pub const SEND_USAGE: &str = "Usage: send <peer-id> <message>";

/// A parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `connect <peer-addr>`
    Connect {
        /// Multiaddr ending in `/p2p/<id>`
        addr: String,
    },
    /// `send <peer-id> <message...>`
    Send {
        /// Textual peer ID
        peer: String,
        /// Message words joined by single spaces
        message: String,
    },
    /// `exit`
    Exit,
}

/// Why a line is not a runnable command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace
    Blank,
    /// Known command with wrong arguments; carries the usage line
    Usage(&'static str),
    /// Unrecognized command word
    Unknown(String),
}

impl Command {
    /// Parse one input line
    ///
    /// Arguments are split on whitespace, so runs of spaces inside a `send`
    /// message collapse to one.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ParseError::Blank);
        };
        let args: Vec<&str> = words.collect();

        match name {
            "connect" => match args.as_slice() {
                [addr] => Ok(Command::Connect {
                    addr: (*addr).to_string(),
                }),
                _ => Err(ParseError::Usage(CONNECT_USAGE)),
            },
            "send" => match args.split_first() {
                Some((peer, message)) if !message.is_empty() => Ok(Command::Send {
                    peer: (*peer).to_string(),
                    message: message.join(" "),
                }),
                _ => Err(ParseError::Usage(SEND_USAGE)),
            },
            "exit" => Ok(Command::Exit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect() {
        assert_eq!(
            Command::parse("connect /ip4/127.0.0.1/tcp/4001/p2p/abc"),
            Ok(Command::Connect {
                addr: "/ip4/127.0.0.1/tcp/4001/p2p/abc".into()
            })
        );
    }

    #[test]
    fn test_connect_arity() {
        assert_eq!(Command::parse("connect"), Err(ParseError::Usage(CONNECT_USAGE)));
        assert_eq!(Command::parse("connect a b"), Err(ParseError::Usage(CONNECT_USAGE)));
    }

    #[test]
    fn test_parse_send_collapses_whitespace() {
        assert_eq!(
            Command::parse("send QmPeer hello   world"),
            Ok(Command::Send {
                peer: "QmPeer".into(),
                message: "hello world".into()
            })
        );
        assert_eq!(
            Command::parse("  send\tpeer  a \t b  "),
            Ok(Command::Send {
                peer: "peer".into(),
                message: "a b".into()
            })
        );
    }

    #[test]
    fn test_send_arity() {
        assert_eq!(Command::parse("send"), Err(ParseError::Usage(SEND_USAGE)));
        assert_eq!(Command::parse("send peer"), Err(ParseError::Usage(SEND_USAGE)));
    }

    #[test]
    fn test_exit_and_unknown() {
        assert_eq!(Command::parse("exit"), Ok(Command::Exit));
        assert_eq!(Command::parse("exit now"), Ok(Command::Exit));
        assert_eq!(
            Command::parse("EXIT"),
            Err(ParseError::Unknown("EXIT".into()))
        );
        assert_eq!(
            Command::parse("foo bar"),
            Err(ParseError::Unknown("foo".into()))
        );
    }

    #[test]
    fn test_blank() {
        assert_eq!(Command::parse(""), Err(ParseError::Blank));
        assert_eq!(Command::parse(" \t "), Err(ParseError::Blank));
    }
}
