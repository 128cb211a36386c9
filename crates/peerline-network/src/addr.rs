//! Multiaddr helpers for the TCP transport
//!
//! Addresses are [`Multiaddr`] values such as
//! `/ip4/127.0.0.1/tcp/4001/p2p/<peer-id>`. The TCP host understands an
//! `/ip4`, `/ip6` or `/dns*` host followed by `/tcp`, optionally ending in
//! `/p2p/<peer-id>`.

use crate::error::{NetworkError, NetworkResult};
use peerline_crypto::PeerId;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

pub use multiaddr::{Multiaddr, Protocol};

/// Parse a textual multiaddr, rejecting the empty address
pub fn parse_multiaddr(input: &str) -> NetworkResult<Multiaddr> {
    let input = input.trim();
    let addr: Multiaddr = input
        .parse()
        .map_err(|e: multiaddr::Error| NetworkError::InvalidMultiaddr(format!("{:?}: {}", input, e)))?;
    if addr.is_empty() {
        return Err(NetworkError::InvalidMultiaddr("empty address".into()));
    }
    Ok(addr)
}

/// Resolve a TCP multiaddr to socket addresses, looking up `/dns*` hosts
pub async fn resolve(addr: &Multiaddr) -> NetworkResult<Vec<SocketAddr>> {
    if let Some(socket_addr) = addr.to_socket_addr() {
        return Ok(vec![socket_addr]);
    }

    let unsupported = || NetworkError::UnsupportedAddress(addr.to_string());
    let mut iter = addr.iter();
    let (host, ipv4_only) = match iter.next() {
        Some(Protocol::Dns(host)) => (host, None),
        Some(Protocol::Dns4(host)) => (host, Some(true)),
        Some(Protocol::Dns6(host)) => (host, Some(false)),
        _ => return Err(unsupported()),
    };
    let port = match iter.next() {
        Some(Protocol::Tcp(port)) => port,
        _ => return Err(unsupported()),
    };
    if !only_peer_id_left(iter) {
        return Err(unsupported());
    }

    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((&*host, port))
        .await?
        .filter(|socket_addr| ipv4_only.map_or(true, |v4| socket_addr.is_ipv4() == v4))
        .collect();
    if resolved.is_empty() {
        return Err(NetworkError::UnsupportedAddress(format!(
            "{} resolved to no usable address",
            addr
        )));
    }
    Ok(resolved)
}

fn only_peer_id_left<'a>(mut rest: impl Iterator<Item = Protocol<'a>>) -> bool {
    match rest.next() {
        None => true,
        Some(Protocol::P2p(_)) => rest.next().is_none(),
        Some(_) => false,
    }
}

fn ip_protocol(ip: IpAddr) -> Protocol<'static> {
    match ip {
        IpAddr::V4(ip) => Protocol::Ip4(ip),
        IpAddr::V6(ip) => Protocol::Ip6(ip),
    }
}

/// TCP-oriented views of a [`Multiaddr`]
pub trait MultiaddrExt: Sized {
    /// Build `/ip{4,6}/<ip>/tcp/<port>` from a socket address
    fn from_socket_addr(addr: SocketAddr) -> Self;

    /// Peer ID of a trailing `/p2p/` component
    fn peer_id(&self) -> Option<PeerId>;

    /// The address without a trailing `/p2p/` component
    fn without_peer_id(&self) -> Self;

    /// Socket address of an `/ip{4,6}/.../tcp/...` address, without DNS lookup
    fn to_socket_addr(&self) -> Option<SocketAddr>;

    /// Check if the leading IP component is the unspecified address
    fn is_unspecified(&self) -> bool;

    /// Replace an unspecified leading IP with `ip`; other addresses are returned unchanged
    fn replace_unspecified(&self, ip: IpAddr) -> Self;

    /// Replace an unspecified leading IP with the loopback address of the same family
    fn with_loopback(&self) -> Self;
}

impl MultiaddrExt for Multiaddr {
    fn from_socket_addr(addr: SocketAddr) -> Self {
        Multiaddr::empty()
            .with(ip_protocol(addr.ip()))
            .with(Protocol::Tcp(addr.port()))
    }

    fn peer_id(&self) -> Option<PeerId> {
        match self.iter().last() {
            Some(Protocol::P2p(id)) => Some(id),
            _ => None,
        }
    }

    fn without_peer_id(&self) -> Self {
        let mut addr = self.clone();
        if addr.peer_id().is_some() {
            addr.pop();
        }
        addr
    }

    fn to_socket_addr(&self) -> Option<SocketAddr> {
        let mut iter = self.iter();
        let ip = match iter.next()? {
            Protocol::Ip4(ip) => IpAddr::V4(ip),
            Protocol::Ip6(ip) => IpAddr::V6(ip),
            _ => return None,
        };
        let port = match iter.next()? {
            Protocol::Tcp(port) => port,
            _ => return None,
        };
        only_peer_id_left(iter).then(|| SocketAddr::new(ip, port))
    }

    fn is_unspecified(&self) -> bool {
        match self.iter().next() {
            Some(Protocol::Ip4(ip)) => ip.is_unspecified(),
            Some(Protocol::Ip6(ip)) => ip.is_unspecified(),
            _ => false,
        }
    }

    fn replace_unspecified(&self, ip: IpAddr) -> Self {
        if !self.is_unspecified() {
            return self.clone();
        }
        self.replace(0, |_| Some(ip_protocol(ip)))
            .unwrap_or_else(|| self.clone())
    }

    fn with_loopback(&self) -> Self {
        match self.iter().next() {
            Some(Protocol::Ip6(_)) => self.replace_unspecified(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            _ => self.replace_unspecified(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        }
    }
}
