//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves static bodies by path, one thread per connection. Options make it
//! misbehave the ways the client has to cope with: no `Content-Length`,
//! lowercase header names, early close, or never answering.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, omit `Content-Length` (close-delimited body).
    pub send_content_length: bool,
    /// Send the header name as `content-length`.
    pub lowercase_content_length: bool,
    /// Send only this many body bytes, then close.
    pub truncate_body_to: Option<usize>,
    /// Read the request, then never answer until the client goes away.
    pub stall: bool,
    /// After a complete response, keep the connection open without ever
    /// sending FIN, even once the client has shut down its side.
    pub hold_open: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            send_content_length: true,
            lowercase_content_length: false,
            truncate_body_to: None,
            stall: false,
            hold_open: None,
        }
    }
}

pub struct TestServer {
    /// e.g. "http://127.0.0.1:12345"
    pub base_url: String,
    connections: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Number of accepted connections so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Raw request heads received so far, in arrival order.
    pub fn request_heads(&self) -> Vec<String> {
        self.request_heads.lock().unwrap().clone()
    }
}

/// Serve `routes` (path such as "/a.bin" → body) with default options.
pub fn start(routes: HashMap<String, Vec<u8>>) -> TestServer {
    start_with_options(routes, ServerOptions::default())
}

pub fn start_with_options(routes: HashMap<String, Vec<u8>>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let routes = Arc::new(routes);
    let connections = Arc::new(AtomicUsize::new(0));
    let request_heads = Arc::new(Mutex::new(Vec::new()));

    let conns = Arc::clone(&connections);
    let heads = Arc::clone(&request_heads);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            conns.fetch_add(1, Ordering::SeqCst);
            let routes = Arc::clone(&routes);
            let heads = Arc::clone(&heads);
            thread::spawn(move || handle(stream, &routes, &heads, opts));
        }
    });

    TestServer {
        base_url,
        connections,
        request_heads,
    }
}

fn handle(
    mut stream: TcpStream,
    routes: &HashMap<String, Vec<u8>>,
    heads: &Mutex<Vec<String>>,
    opts: ServerOptions,
) {
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(head) = read_head(&mut stream) else {
        return;
    };
    heads.lock().unwrap().push(head.clone());

    if opts.stall {
        let _ = stream.set_read_timeout(None);
        wait_for_close(&mut stream);
        return;
    }

    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let body: &[u8] = routes
        .get(path_of(target))
        .map(Vec::as_slice)
        .unwrap_or(&b"not found"[..]);

    let mut response = String::from("HTTP/1.1 200 OK\r\nServer: dlcache-test\r\n");
    if opts.send_content_length {
        let name = if opts.lowercase_content_length {
            "content-length"
        } else {
            "Content-Length"
        };
        response.push_str(&format!("{}: {}\r\n", name, body.len()));
    }
    response.push_str("\r\n");
    let sent = opts.truncate_body_to.map_or(body, |n| &body[..n.min(body.len())]);

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(sent);
    if opts.truncate_body_to.is_some() || !opts.send_content_length {
        // Close right away: the client must not wait for the rest.
        let _ = stream.shutdown(std::net::Shutdown::Both);
        return;
    }
    wait_for_close(&mut stream);
    if let Some(hold) = opts.hold_open {
        thread::sleep(hold);
    }
}

/// Read until the blank line ending the request head.
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8(raw).ok()
}

/// Block until the client closes its side (its graceful-close FIN).
fn wait_for_close(stream: &mut TcpStream) {
    let mut buf = [0u8; 256];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Absolute-form targets ("http://host:port/a") reduce to their path ("/a").
fn path_of(target: &str) -> &str {
    match target.strip_prefix("http://") {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => target,
    }
}
