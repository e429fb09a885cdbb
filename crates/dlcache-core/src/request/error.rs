//! Failure kinds of a single HTTP GET.

use std::io;
use thiserror::Error;

/// Why an `HttpRequest` finished without a body.
///
/// Only the worker and the harvester's log see the kind; the queue records a
/// plain success flag.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Not `http://host[:port][/...]`.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    #[error("could not resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded but produced no IPv4 address.
    #[error("no IPv4 address for {host}:{port}")]
    NoIpv4Address { host: String, port: u16 },

    #[error("could not create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("sending request failed: {0}")]
    Send(#[source] io::Error),

    #[error("receiving response failed: {0}")]
    Receive(#[source] io::Error),

    /// Headers ended without a `Content-Length`; chunked and close-delimited bodies are unsupported.
    #[error("response has no Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    /// Peer closed before the headers or the full body arrived.
    #[error("connection closed after {received} body bytes (expected {expected:?})")]
    PrematureClose {
        received: u64,
        expected: Option<u64>,
    },

    #[error("request canceled")]
    Canceled,

    #[error("could not start request worker: {0}")]
    Spawn(#[source] io::Error),
}

impl RequestError {
    /// True for failures caused by `cancel()` rather than the network or the peer.
    pub fn is_canceled(&self) -> bool {
        matches!(self, RequestError::Canceled)
    }
}
