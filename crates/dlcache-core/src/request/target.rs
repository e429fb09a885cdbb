//! Manual `http://host[:port][/...]` parsing.
//!
//! Only the host and port are extracted; the request line carries the whole
//! original URL as its target (absolute-form), so no path is split out.

use super::RequestError;

pub(crate) const DEFAULT_HTTP_PORT: u16 = 80;

/// Where to connect and what to send for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpTarget {
    pub host: String,
    pub port: u16,
    /// Request-target for the request line: the full original URL.
    pub request_target: String,
}

impl HttpTarget {
    pub(crate) fn parse(url: &str) -> Result<Self, RequestError> {
        let invalid = |reason| RequestError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let (scheme, rest) = url.split_once("://").ok_or_else(|| invalid("missing ://"))?;
        // Scheme match is exact: "HTTP://" is rejected.
        if scheme != "http" {
            return Err(invalid("scheme is not http"));
        }

        let host_end = rest.find(['/', ':']).unwrap_or(rest.len());
        let host = &rest[..host_end];
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let port = match rest[host_end..].strip_prefix(':') {
            Some(after_colon) => {
                let digits = after_colon
                    .find('/')
                    .map_or(after_colon, |end| &after_colon[..end]);
                digits.parse::<u16>().map_err(|_| invalid("bad port"))?
            }
            None => DEFAULT_HTTP_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            request_target: url.to_string(),
        })
    }

    /// The full request head: request line, `Host`, blank line.
    pub(crate) fn request_head(&self) -> String {
        format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\n\r\n",
            self.request_target, self.host
        )
    }
}
