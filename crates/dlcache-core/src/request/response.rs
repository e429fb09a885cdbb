//! Streaming decode of an HTTP/1.1 response: header terminator scan,
//! `Content-Length` extraction, and body accumulation.

use super::RequestError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Accumulates raw response bytes until the headers end and the
/// `Content-Length` body has arrived.
#[derive(Debug, Default)]
pub(crate) struct ResponseReader {
    buf: Vec<u8>,
    /// Where the next terminator scan starts.
    scan_from: usize,
    /// Offset of the first body byte, once headers are complete.
    body_start: Option<usize>,
    content_length: Option<u64>,
}

impl ResponseReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append received bytes. Once the header block is complete it is parsed;
    /// a header block without `Content-Length` is an error.
    pub(crate) fn push(&mut self, data: &[u8]) -> Result<(), RequestError> {
        self.buf.extend_from_slice(data);
        if self.body_start.is_some() {
            return Ok(());
        }

        let Some(pos) = find_terminator(&self.buf[self.scan_from..]) else {
            // A terminator may straddle two reads.
            self.scan_from = self.buf.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
            return Ok(());
        };
        let header_end = self.scan_from + pos;
        let body_start = header_end + HEADER_TERMINATOR.len();

        let length = parse_content_length(&self.buf[..header_end])?;
        tracing::debug!(content_length = length, "response headers parsed");
        self.content_length = Some(length);
        self.body_start = Some(body_start);
        Ok(())
    }

    /// `Content-Length` once the headers are parsed.
    pub(crate) fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub(crate) fn headers_complete(&self) -> bool {
        self.body_start.is_some()
    }

    /// Body bytes received so far (0 until the headers are complete).
    pub(crate) fn body_received(&self) -> u64 {
        self.body_start
            .map_or(0, |start| (self.buf.len() - start) as u64)
    }

    pub(crate) fn is_complete(&self) -> bool {
        match self.content_length {
            Some(len) => self.body_received() >= len,
            None => false,
        }
    }

    /// The body, cut to `Content-Length`.
    ///
    /// Deliberately stricter than taking everything after the header block:
    /// bytes a peer sends past `Content-Length` in the same reads are dropped,
    /// so they never end up in the stored file.
    pub(crate) fn into_body(mut self) -> Vec<u8> {
        let Some(start) = self.body_start else {
            return Vec::new();
        };
        let mut body = self.buf.split_off(start);
        if let Some(len) = self.content_length {
            body.truncate(usize::try_from(len).unwrap_or(usize::MAX));
        }
        body
    }
}

fn find_terminator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

/// Walk the header block (status line ignored) and return the `Content-Length` value.
///
/// Header names match case-insensitively, so `content-length` from a
/// lowercasing proxy is accepted too.
fn parse_content_length(head: &[u8]) -> Result<u64, RequestError> {
    let head = String::from_utf8_lossy(head);
    let mut content_length = None;

    for line in head.split("\r\n").skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        let length = value
            .trim()
            .parse::<u64>()
            .map_err(|_| RequestError::InvalidContentLength(value.to_string()))?;
        content_length = Some(length);
    }

    content_length.ok_or(RequestError::MissingContentLength)
}
