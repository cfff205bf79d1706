//! Engine-facing snapshot of an incoming request.
//!
//! The view is computed once per request from the request head and is the
//! only request representation the inspection pipeline reads. It never
//! touches the body; body presence is decided from the body's size hint
//! before the head and body are split apart.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::header::TRANSFER_ENCODING;
use axum::http::request::Parts;
use axum::http::{header, Version};
use thiserror::Error;

/// Failure to derive an engine-facing view from a request head.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The request target carries no path, so there is nothing to feed the
    /// URI phase (authority-form `CONNECT` targets).
    #[error("request target {0:?} has no inspectable path")]
    NonOriginTarget(String),
}

/// What the engine gets told about a request.
#[derive(Debug, Clone)]
pub struct RequestView {
    /// Method token as received.
    pub method: String,
    /// Request target as transmitted: origin-form path-and-query,
    /// absolute-form URI, or `*`.
    pub target: String,
    /// Protocol version in request-line spelling.
    pub proto: &'static str,
    /// Host the request was addressed to, from the target's authority or
    /// the `Host` header. Ports are kept; [`server_name`](Self::server_name)
    /// strips them.
    pub host: Option<String>,
    /// Peer address, when the stack recorded one.
    pub client_addr: String,
    /// Peer port, `0` when unknown.
    pub client_port: u16,
    /// First `Transfer-Encoding` token, when the header is present.
    pub transfer_encoding: Option<String>,
    /// Whether the request may carry body bytes. `false` only when the
    /// size hint proves the body empty.
    pub has_body: bool,
    /// Correlation id lifted from `x-request-id`, when present.
    pub request_id: Option<String>,
}

impl RequestView {
    /// Builds a view from a request head.
    ///
    /// `has_body` comes from the body's size hint, which the caller reads
    /// before splitting the request.
    pub fn from_parts(parts: &Parts, has_body: bool) -> Result<Self, ViewError> {
        let target = if parts.uri.scheme().is_some() {
            parts.uri.to_string()
        } else if let Some(path_and_query) = parts.uri.path_and_query() {
            path_and_query.as_str().to_owned()
        } else {
            return Err(ViewError::NonOriginTarget(parts.uri.to_string()));
        };

        let host = parts
            .uri
            .host()
            .map(str::to_owned)
            .or_else(|| header_str(parts, header::HOST));

        let (client_addr, client_port) = match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => (addr.ip().to_string(), addr.port()),
            None => (String::new(), 0),
        };

        let transfer_encoding = header_str(parts, TRANSFER_ENCODING)
            .map(|value| first_token(&value).to_owned());

        Ok(Self {
            method: parts.method.to_string(),
            target,
            proto: proto_str(parts.version),
            host,
            client_addr,
            client_port,
            transfer_encoding,
            has_body,
            request_id: header_str(parts, header::HeaderName::from_static("x-request-id")),
        })
    }

    /// Host with any port (and IPv6 brackets) removed, for the
    /// server-name phase.
    pub fn server_name(&self) -> Option<&str> {
        self.host.as_deref().map(host_without_port)
    }
}

fn header_str(parts: &Parts, name: header::HeaderName) -> Option<String> {
    parts
        .headers
        .get(&name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn first_token(value: &str) -> &str {
    value.split(',').next().unwrap_or(value).trim()
}

fn proto_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn host_without_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
