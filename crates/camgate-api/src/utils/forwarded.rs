//! Client address and scheme extraction
//!
//! The gateway sits behind proxies that describe the original connection in an RFC 7239
//! `Forwarded` header. Only the first hop is trusted to name the camera:
//! `Forwarded: for=203.0.113.5;proto=https, for=10.0.0.2`.
//!
//! When `Forwarded` is absent, the first `X-Forwarded-For` entry is used, then the socket
//! address. A present `Forwarded` header whose first hop names no usable address falls
//! through to the socket address; `X-Forwarded-For` is not consulted.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const FORWARDED: &str = "forwarded";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Parameters declared by the first hop of a `Forwarded` header.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForwardedHop {
    pub for_ip: Option<IpAddr>,
    pub proto: Option<String>,
}

/// Parse the first element of a `Forwarded` header value.
pub fn parse_first_hop(header_value: &str) -> ForwardedHop {
    let first = header_value.split(',').next().unwrap_or_default();
    let mut hop = ForwardedHop::default();

    for pair in first.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = unquote(value.trim());
        match key.trim().to_ascii_lowercase().as_str() {
            "for" => hop.for_ip = parse_node(value),
            "proto" if !value.is_empty() => hop.proto = Some(value.to_ascii_lowercase()),
            _ => {}
        }
    }

    hop
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse a `for=` node: `1.2.3.4`, `1.2.3.4:port`, `[v6]` or `[v6]:port`.
/// Obfuscated identifiers and `unknown` yield `None`.
fn parse_node(node: &str) -> Option<IpAddr> {
    if let Some(rest) = node.strip_prefix('[') {
        let (addr, _) = rest.split_once(']')?;
        return addr.parse().ok();
    }

    if let Ok(ip) = node.parse::<IpAddr>() {
        return Some(ip);
    }

    node.parse::<SocketAddr>().ok().map(|addr| addr.ip())
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn first_list_entry(value: &str) -> Option<&str> {
    value
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

/// Client address for an upload.
pub fn client_ip(headers: &HeaderMap, socket_addr: Option<SocketAddr>) -> Option<IpAddr> {
    let declared = match first_header_value(headers, FORWARDED) {
        Some(value) => parse_first_hop(value).for_ip,
        None => first_header_value(headers, X_FORWARDED_FOR)
            .and_then(first_list_entry)
            .and_then(parse_node),
    };

    declared.or_else(|| socket_addr.map(|addr| addr.ip()))
}

/// Scheme the camera used to reach the first proxy, lowercased.
/// Follows the same rule as [`client_ip`]: `X-Forwarded-Proto` is read only without `Forwarded`.
pub fn forwarded_proto(headers: &HeaderMap) -> Option<String> {
    match first_header_value(headers, FORWARDED) {
        Some(value) => parse_first_hop(value).proto,
        None => first_header_value(headers, X_FORWARDED_PROTO)
            .and_then(first_list_entry)
            .map(str::to_ascii_lowercase),
    }
}
