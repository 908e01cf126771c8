//! Node descriptors and address normalization.
//!
//! A locate response lists the nodes holding a file as tokens of the form
//! `xy[address]:port`:
//!
//! - `x`: node role (`S`/`s` data server, `M`/`m` manager; lower case = pending)
//! - `y`: access mode (`r` read-only, `w` read/write)
//! - `address`: a full IPv6 address, or `::a.b.c.d` for IPv4
//! - `port`: decimal port
//!
//! Each accepted token is normalized into a canonical hostname by reverse
//! resolving its address. Tokens that fail any step are skipped; they never
//! fail the surrounding response.

use crate::base::locateerror::LocateError;
use crate::dns::ReverseResolve;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

/// Shortest token that can hold a role, access mode, brackets and a port.
const MIN_TOKEN_LEN: usize = 8;

/// Role of a node in a locate response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Server,
    PendingServer,
    Manager,
    PendingManager,
}

impl NodeRole {
    /// Map a role flag to a role; unknown flags are not accepted.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            b'S' => Some(NodeRole::Server),
            b's' => Some(NodeRole::PendingServer),
            b'M' => Some(NodeRole::Manager),
            b'm' => Some(NodeRole::PendingManager),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, NodeRole::PendingServer | NodeRole::PendingManager)
    }
}

/// A parsed locate response token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub role: NodeRole,
    pub writable: bool,
    pub addr: SocketAddr,
}

impl NodeDescriptor {
    /// Parse one token, validating its fixed-position delimiters.
    pub fn parse(token: &str) -> Result<Self, LocateError> {
        let malformed = || LocateError::MalformedDescriptor(token.to_string());

        if token.len() < MIN_TOKEN_LEN || !token.is_ascii() {
            return Err(malformed());
        }
        let bytes = token.as_bytes();
        if bytes[2] != b'[' {
            return Err(malformed());
        }
        let role = NodeRole::from_flag(bytes[0]).ok_or_else(malformed)?;
        let writable = bytes[1] == b'w';

        let rest = &token[3..];
        let close = rest.find(']').ok_or_else(malformed)?;
        let port = rest[close + 1..]
            .strip_prefix(':')
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(malformed)?;

        let ip = parse_embedded_ip(&rest[..close])?;
        Ok(Self {
            role,
            writable,
            addr: SocketAddr::new(ip, port),
        })
    }

    /// Resolve the node's address to its canonical hostname.
    pub async fn hostname(&self, resolver: &dyn ReverseResolve) -> Result<String, LocateError> {
        resolver.reverse(self.addr.ip()).await
    }
}

impl FromStr for NodeDescriptor {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            NodeRole::Server => 'S',
            NodeRole::PendingServer => 's',
            NodeRole::Manager => 'M',
            NodeRole::PendingManager => 'm',
        };
        let access = if self.writable { 'w' } else { 'r' };
        match self.addr.ip() {
            IpAddr::V4(v4) => write!(f, "{}{}[::{}]:{}", role, access, v4, self.addr.port()),
            IpAddr::V6(v6) => write!(f, "{}{}[{}]:{}", role, access, v6, self.addr.port()),
        }
    }
}

/// Extract the IP address between the brackets.
///
/// IPv4 addresses arrive embedded as `::a.b.c.d` (or the mapped form
/// `::ffff:a.b.c.d`) and are unwrapped; anything else is taken verbatim as
/// IPv6.
fn parse_embedded_ip(inner: &str) -> Result<IpAddr, LocateError> {
    let embedded = inner
        .strip_prefix("::ffff:")
        .or_else(|| inner.strip_prefix("::"))
        .filter(|rest| rest.contains('.'));

    if let Some(v4) = embedded {
        return v4
            .parse::<Ipv4Addr>()
            .map(IpAddr::V4)
            .map_err(|_| LocateError::AddressInvalid(inner.to_string()));
    }

    inner
        .parse::<Ipv6Addr>()
        .map(IpAddr::V6)
        .map_err(|_| LocateError::AddressInvalid(inner.to_string()))
}

/// Split a locate response into descriptor tokens.
pub fn tokens(response: &str) -> impl Iterator<Item = &str> {
    response
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

/// Normalize one token into a canonical hostname.
pub async fn normalize(token: &str, resolver: &dyn ReverseResolve) -> Result<String, LocateError> {
    let node = NodeDescriptor::parse(token)?;
    let host = node.hostname(resolver).await?;
    if host.is_empty() {
        return Err(LocateError::NameNotResolvedFor {
            addr: node.addr.ip().to_string(),
            reason: "empty hostname".to_string(),
        });
    }
    Ok(host)
}

/// Normalize every token of a response, skipping the ones that fail.
pub async fn hosts_from_response(response: &str, resolver: &dyn ReverseResolve) -> BTreeSet<String> {
    let lookups = tokens(response).map(|token| async move {
        match normalize(token, resolver).await {
            Ok(host) => Some(host),
            Err(e) => {
                tracing::debug!(token = %token, error = %e, "skipping node descriptor");
                None
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}
