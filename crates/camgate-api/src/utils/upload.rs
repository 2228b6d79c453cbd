//! Upload request metadata extraction.

use crate::auth::parse_basic_authorization;
use crate::utils::forwarded::{client_ip, forwarded_proto};
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use camgate_core::models::UploadRequestMeta;
use std::convert::Infallible;
use std::net::SocketAddr;

/// `filename` parameter of a `Content-Disposition` header value, unquoted.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, raw) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = raw.trim().trim_matches('"').trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

pub fn upload_meta(headers: &HeaderMap, socket_addr: Option<SocketAddr>) -> UploadRequestMeta {
    let filename = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition);

    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_authorization);

    UploadRequestMeta {
        client_ip: client_ip(headers, socket_addr),
        forwarded_proto: forwarded_proto(headers),
        filename,
        credentials,
    }
}

/// Extractor collecting everything the auth engine needs from an upload request.
///
/// The socket address is optional: it is only present when the server is run with
/// connect info.
pub struct UploadMeta(pub UploadRequestMeta);

impl<S> FromRequestParts<S> for UploadMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(UploadMeta(upload_meta(&parts.headers, socket_addr)))
    }
}
