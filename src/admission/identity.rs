//! Client identity resolution.
//!
//! # Responsibilities
//! - Derive a stable identifier string for a request's origin
//! - Honor a declared forwarded identity only from trusted peers
//! - Reject peer addresses that cannot be decomposed into a bare host
//!
//! # Design Decisions
//! - Resolution is a pure function of the peer address, the forwarded
//!   header value, and the static trust set
//! - The strategy is picked once at construction; an empty trust set
//!   selects the plain peer-address strategy
//! - Trusted peers are matched as parsed `IpAddr`s, so textual IPv6
//!   variants normalize before comparison

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

/// The string a request's origin is throttled under.
///
/// Typically an IP address, but opaque to the limiter: a trusted proxy may
/// declare any identifier on behalf of a further-upstream client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors produced while resolving a client identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Peer address string could not be decomposed into a bare host.
    #[error("malformed peer address `{0}`")]
    MalformedPeerAddress(String),
}

/// The set of immediate peer addresses whose forwarded-identity header is
/// honored. Built once from configuration and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    addrs: HashSet<IpAddr>,
}

impl TrustedProxies {
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().collect(),
        }
    }

    /// Parse textual entries from configuration.
    ///
    /// Unparseable entries are logged and skipped; startup validation
    /// reports them as hard errors before this runs.
    pub fn from_entries(entries: &[String]) -> Self {
        let addrs = entries
            .iter()
            .filter_map(|entry| {
                let parsed = entry.trim().parse::<IpAddr>();
                if parsed.is_err() {
                    tracing::warn!(entry = %entry, "Invalid trusted proxy address, skipping");
                }
                parsed.ok()
            })
            .collect();
        Self { addrs }
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Whether the bare host of a peer address belongs to the trust set.
    /// Hosts that are not IP addresses never match.
    pub fn contains_host(&self, host: &str) -> bool {
        host.parse::<IpAddr>()
            .map(|ip| self.addrs.contains(&ip))
            .unwrap_or(false)
    }
}

/// Strategy for deriving a client identifier from connection metadata.
///
/// Selected once at gateway construction; request handling only ever sees
/// the trait object.
pub trait IdentityStrategy: fmt::Debug + Send + Sync {
    /// Resolve an identifier from the immediate peer address
    /// (`host:port` or bare `host`) and the declared forwarded identity,
    /// if any.
    fn resolve(&self, peer_addr: &str, forwarded: Option<&str>) -> Result<ClientId, IdentityError>;
}

/// Identifies clients by the bare host of their immediate peer address.
///
/// Suitable when clients connect to the gateway directly: any forwarded
/// identity a client declares for itself is ignored.
#[derive(Debug, Clone, Copy)]
pub struct DirectPeer;

impl IdentityStrategy for DirectPeer {
    fn resolve(&self, peer_addr: &str, _forwarded: Option<&str>) -> Result<ClientId, IdentityError> {
        peer_host(peer_addr).map(ClientId::from)
    }
}

/// Honors the forwarded identity declared by a trusted immediate peer.
///
/// A gateway deployed behind edge infrastructure sees every request from
/// the edge's own address; without this indirection all clients would
/// collapse onto one identifier. The trust gate keeps clients that connect
/// directly from forging identifiers to evade throttling.
#[derive(Debug)]
pub struct TrustedForwardedFor {
    trusted: TrustedProxies,
}

impl TrustedForwardedFor {
    pub fn new(trusted: TrustedProxies) -> Self {
        Self { trusted }
    }
}

impl IdentityStrategy for TrustedForwardedFor {
    fn resolve(&self, peer_addr: &str, forwarded: Option<&str>) -> Result<ClientId, IdentityError> {
        let host = peer_host(peer_addr)?;
        if self.trusted.contains_host(host) {
            if let Some(declared) = forwarded {
                // Nearest-hop convention: the first entry of a
                // comma-delimited chain is the originating client.
                let first = declared.split(',').next().unwrap_or("").trim();
                if !first.is_empty() {
                    return Ok(ClientId::from(first));
                }
            }
        }
        Ok(ClientId::from(host))
    }
}

/// Pick the identity strategy for a trust policy.
pub fn select_strategy(trusted: TrustedProxies) -> Box<dyn IdentityStrategy> {
    if trusted.is_empty() {
        Box::new(DirectPeer)
    } else {
        Box::new(TrustedForwardedFor::new(trusted))
    }
}

/// Extract the bare host from a peer address.
///
/// Accepts `host:port`, bare `host`, `[v6]:port`, and bare `v6` forms.
/// Anything without a recoverable non-empty host is malformed.
fn peer_host(peer_addr: &str) -> Result<&str, IdentityError> {
    let malformed = || IdentityError::MalformedPeerAddress(peer_addr.to_string());

    let peer = peer_addr.trim();
    if peer.is_empty() {
        return Err(malformed());
    }

    if let Some(rest) = peer.strip_prefix('[') {
        // Bracketed IPv6: `[host]` optionally followed by `:port`.
        let end = rest.find(']').ok_or_else(malformed)?;
        let host = &rest[..end];
        if host.is_empty() {
            return Err(malformed());
        }
        match &rest[end + 1..] {
            "" => Ok(host),
            tail => match tail.strip_prefix(':') {
                Some(port) if !port.is_empty() => Ok(host),
                _ => Err(malformed()),
            },
        }
    } else if peer.chars().filter(|c| *c == ':').count() > 1 {
        // Multiple colons without brackets: a bare IPv6 address.
        Ok(peer)
    } else if let Some((host, port)) = peer.split_once(':') {
        if host.is_empty() || port.is_empty() {
            return Err(malformed());
        }
        Ok(host)
    } else {
        Ok(peer)
    }
}
