//! Dedup and eviction layer over [`DownloadQueue`].
//!
//! The ready set remembers, across ticks, which destinations are available
//! (`true`) and which were attempted and failed (`false`). A destination
//! already on disk counts as available without touching the network.

use crate::config::RequestOptions;
use crate::queue::DownloadQueue;
use crate::storage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct DownloadCache {
    queue: DownloadQueue,
    ready: BTreeMap<PathBuf, bool>,
}

impl DownloadCache {
    pub fn new(options: RequestOptions) -> Self {
        Self {
            queue: DownloadQueue::new(options),
            ready: BTreeMap::new(),
        }
    }

    /// Make `filename` available, downloading `url` only if needed.
    ///
    /// No-op if the file is ready or already being processed. A file already
    /// on disk is marked ready immediately. Otherwise any earlier failure is
    /// forgotten and the download is queued.
    pub fn add(&mut self, url: impl Into<String>, filename: impl Into<PathBuf>) {
        let filename = filename.into();
        if self.ready.get(&filename) == Some(&true) {
            return;
        }
        if self.queue.is_processing(&filename) {
            return;
        }
        if storage::is_present(&filename) {
            tracing::debug!(filename = %filename.display(), "already on disk");
            self.ready.insert(filename, true);
            return;
        }
        self.ready.remove(&filename);
        self.queue.add(url, filename);
    }

    /// Drive the queue one step and fold its completions into the ready set.
    pub fn tick(&mut self, max_active: usize) {
        self.queue.tick(max_active);
        for (filename, &success) in self.queue.completions() {
            self.ready.insert(filename.clone(), success);
        }
    }

    /// Cancel everything in flight or queued. Keep ticking afterwards to
    /// collect the failed completions and release request workers.
    pub fn cancel(&mut self) {
        self.queue.cancel_active_downloads();
        self.queue.cancel_queued_downloads();
    }

    /// Invalidate the cache: cancel active downloads, drop queued ones, and
    /// delete every file in the ready set from disk.
    pub fn clear(&mut self) {
        self.queue.cancel_active_downloads();
        self.queue.clear_queued_downloads();
        for filename in std::mem::take(&mut self.ready).into_keys() {
            match storage::remove_cached(&filename) {
                Ok(true) => tracing::debug!(filename = %filename.display(), "evicted"),
                Ok(false) => {}
                Err(e) => tracing::warn!("could not evict cached file: {:#}", e),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// `Some(true)` available, `Some(false)` attempted and failed, `None` unknown.
    pub fn availability(&self, filename: &Path) -> Option<bool> {
        self.ready.get(filename).copied()
    }

    pub fn is_ready(&self, filename: &Path) -> bool {
        self.availability(filename) == Some(true)
    }

    pub fn ready(&self) -> &BTreeMap<PathBuf, bool> {
        &self.ready
    }

    pub fn queue(&self) -> &DownloadQueue {
        &self.queue
    }
}
