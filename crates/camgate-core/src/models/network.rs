//! Network patterns used for camera pinning and the scripted-upload allowlist.

use ipnet::IpNet;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid network pattern '{pattern}': {reason}")]
pub struct NetworkPatternError {
    pub pattern: String,
    pub reason: &'static str,
}

/// A single address, a CIDR block, or a legacy textual prefix such as `10.20.` or `10.20.*`.
///
/// Prefix patterns are only accepted where [`NetworkPattern::parse_allowlist`] is used;
/// per-camera expected networks go through the stricter [`FromStr`] impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPattern {
    Exact(IpAddr),
    Cidr(IpNet),
    Prefix(String),
}

impl NetworkPattern {
    /// Parse an allowlist entry, accepting the prefix form in addition to IPs and CIDRs.
    pub fn parse_allowlist(raw: &str) -> Result<Self, NetworkPatternError> {
        let trimmed = raw.trim();
        if let Ok(pattern) = trimmed.parse::<NetworkPattern>() {
            return Ok(pattern);
        }

        let prefix = trimmed.trim_end_matches('*');
        let is_prefix_shape = !prefix.is_empty()
            && (trimmed.ends_with('*') || trimmed.ends_with('.') || trimmed.ends_with(':'))
            && prefix
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '.' || c == ':');

        if is_prefix_shape {
            Ok(NetworkPattern::Prefix(prefix.to_string()))
        } else {
            Err(NetworkPatternError {
                pattern: raw.to_string(),
                reason: "expected an IP address, a CIDR block or an address prefix",
            })
        }
    }

    pub fn matches(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        match self {
            NetworkPattern::Exact(addr) => addr.to_canonical() == ip,
            NetworkPattern::Cidr(net) => net.contains(&ip),
            NetworkPattern::Prefix(prefix) => ip.to_string().starts_with(prefix.as_str()),
        }
    }
}

impl FromStr for NetworkPattern {
    type Err = NetworkPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(NetworkPatternError {
                pattern: s.to_string(),
                reason: "empty pattern",
            });
        }

        if trimmed.contains('/') {
            return trimmed
                .parse::<IpNet>()
                .map(NetworkPattern::Cidr)
                .map_err(|_| NetworkPatternError {
                    pattern: s.to_string(),
                    reason: "malformed CIDR block",
                });
        }

        trimmed
            .parse::<IpAddr>()
            .map(NetworkPattern::Exact)
            .map_err(|_| NetworkPatternError {
                pattern: s.to_string(),
                reason: "expected an IP address or CIDR block",
            })
    }
}

impl fmt::Display for NetworkPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkPattern::Exact(addr) => write!(f, "{}", addr),
            NetworkPattern::Cidr(net) => write!(f, "{}", net),
            NetworkPattern::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

impl Serialize for NetworkPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
