//! Progress snapshots of active downloads (for status lines and UIs).

use std::path::PathBuf;

/// Snapshot of one active download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProgress {
    pub filename: PathBuf,
    pub url: String,
    /// Body bytes received so far.
    pub bytes_received: u64,
    /// `Content-Length`, once the response headers arrived.
    pub expected_size: Option<u64>,
}

impl ActiveProgress {
    /// Fraction complete in [0.0, 1.0], or `None` while the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.expected_size?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.bytes_received as f64 / total as f64).min(1.0))
    }
}
