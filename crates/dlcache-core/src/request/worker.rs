//! The worker side of a request: parse, resolve, connect, send, receive,
//! close gracefully.

use super::response::ResponseReader;
use super::target::HttpTarget;
use super::{RequestError, Shared};
use crate::config::RequestOptions;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Upper bound on waiting for the peer's FIN after our own write half is shut.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run one GET to completion. The returned value is published as the outcome.
pub(super) fn fetch(
    url: &str,
    shared: &Shared,
    options: RequestOptions,
) -> Result<Vec<u8>, RequestError> {
    let target = HttpTarget::parse(url)?;
    let addr = resolve(&target)?;
    shared.wait_before_socket();

    // Canceled before start: never open a socket.
    if shared.is_canceled() {
        return Err(RequestError::Canceled);
    }

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(RequestError::Socket)?;
    // Published before connect so `cancel` can abort a pending handshake.
    shared.attach_socket(&socket)?;

    let result = match connect(&socket, addr, options.connect_timeout) {
        // `cancel` landed between publishing and the connect call, when shutdown is a no-op.
        Ok(()) if shared.is_canceled() => Err(RequestError::Canceled),
        Ok(()) => {
            tracing::debug!(%addr, host = %target.host, "connected");
            let mut stream = TcpStream::from(socket);
            let result = exchange(&mut stream, &target, shared, options.recv_buffer_bytes);
            close_gracefully(stream, options.recv_buffer_bytes);
            result
        }
        Err(e) => Err(e),
    };
    shared.detach_socket();

    // A shutdown from `cancel` surfaces as a connect or receive error, or an early close.
    match result {
        Err(_) if shared.is_canceled() => Err(RequestError::Canceled),
        other => other,
    }
}

fn resolve(target: &HttpTarget) -> Result<SocketAddr, RequestError> {
    let addrs = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|source| RequestError::Resolve {
            host: target.host.clone(),
            port: target.port,
            source,
        })?;
    addrs
        .into_iter()
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| RequestError::NoIpv4Address {
            host: target.host.clone(),
            port: target.port,
        })
}

fn connect(
    socket: &Socket,
    addr: SocketAddr,
    timeout: Option<Duration>,
) -> Result<(), RequestError> {
    let sock_addr = SockAddr::from(addr);
    let connected = match timeout {
        Some(t) if !t.is_zero() => socket.connect_timeout(&sock_addr, t),
        _ => socket.connect(&sock_addr),
    };
    connected.map_err(|source| RequestError::Connect { addr, source })
}

/// Send the request head, then read until the body is complete.
fn exchange(
    stream: &mut TcpStream,
    target: &HttpTarget,
    shared: &Shared,
    buffer_bytes: usize,
) -> Result<Vec<u8>, RequestError> {
    // std sends with MSG_NOSIGNAL, so a broken pipe is an error here, not SIGPIPE.
    stream
        .write_all(target.request_head().as_bytes())
        .map_err(RequestError::Send)?;

    let mut reader = ResponseReader::new();
    let mut chunk = vec![0u8; buffer_bytes.max(1)];
    while !reader.is_complete() {
        let n = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(RequestError::Receive(e)),
        };
        if n == 0 {
            return Err(RequestError::PrematureClose {
                received: reader.body_received(),
                expected: reader.content_length(),
            });
        }

        let had_headers = reader.headers_complete();
        reader.push(&chunk[..n])?;
        if let (false, Some(len)) = (had_headers, reader.content_length()) {
            shared.set_expected_size(len);
        }
        if reader.headers_complete() {
            shared.set_progress(reader.body_received());
        }
    }

    Ok(reader.into_body())
}

/// Shut down our write half, then discard until the peer closes its side,
/// so the peer sees an orderly close instead of a reset.
fn close_gracefully(mut stream: TcpStream, buffer_bytes: usize) {
    let _ = stream.shutdown(Shutdown::Write);
    let _ = stream.set_read_timeout(Some(DRAIN_TIMEOUT));
    let mut sink = vec![0u8; buffer_bytes.clamp(1, 4096)];
    loop {
        match stream.read(&mut sink) {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}
