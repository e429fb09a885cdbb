//! Bounded-concurrency download scheduler.
//!
//! Items move queued → active → completions. `tick` harvests finished
//! requests (writing successful payloads to disk) and then admits queued
//! items until `max_active` requests are in flight. The queue is driven from
//! one thread; only the per-request state is shared with workers.

mod item;
mod progress;

pub use item::QueueItem;
pub use progress::ActiveProgress;

use crate::config::RequestOptions;
use crate::request::HttpRequest;
use crate::storage;
use item::{ActiveItem, ActiveState};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

/// Downloads keyed by destination filename.
#[derive(Debug)]
pub struct DownloadQueue {
    /// Awaiting admission, in insertion order.
    queued: VecDeque<QueueItem>,
    active: BTreeMap<PathBuf, ActiveItem>,
    /// Results of the latest tick only; replaced at the start of every tick.
    completions: BTreeMap<PathBuf, bool>,
    options: RequestOptions,
}

impl DownloadQueue {
    pub fn new(options: RequestOptions) -> Self {
        Self {
            queued: VecDeque::new(),
            active: BTreeMap::new(),
            completions: BTreeMap::new(),
            options,
        }
    }

    /// Queue a download of `url` into `filename`.
    ///
    /// `filename` must not already be queued or active; callers dedup first
    /// (see [`crate::cache::DownloadCache::add`]).
    pub fn add(&mut self, url: impl Into<String>, filename: impl Into<PathBuf>) {
        let item = QueueItem {
            url: url.into(),
            filename: filename.into(),
        };
        debug_assert!(
            !self.is_queued_or_active(&item.filename),
            "{} is already queued or active",
            item.filename.display()
        );
        if self.is_queued_or_active(&item.filename) {
            tracing::warn!(filename = %item.filename.display(), "duplicate add ignored");
            return;
        }
        tracing::debug!(url = %item.url, filename = %item.filename.display(), "queued");
        self.queued.push_back(item);
    }

    fn is_queued_or_active(&self, filename: &Path) -> bool {
        self.active.contains_key(filename)
            || self.queued.iter().any(|i| i.filename.as_path() == filename)
    }

    /// True if `filename` is queued, active, or completed in the latest tick.
    pub fn is_processing(&self, filename: &Path) -> bool {
        self.completions.contains_key(filename) || self.is_queued_or_active(filename)
    }

    /// True when nothing is queued, active, or just completed.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.active.is_empty() && self.completions.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Items awaiting admission, in admission order.
    pub fn queued(&self) -> impl Iterator<Item = &QueueItem> {
        self.queued.iter()
    }

    /// Filename → success for everything that finished in the latest tick.
    pub fn completions(&self) -> &BTreeMap<PathBuf, bool> {
        &self.completions
    }

    /// Progress of every active download, ordered by filename.
    pub fn active_progress(&self) -> Vec<ActiveProgress> {
        self.active
            .iter()
            .map(|(filename, item)| {
                let (bytes_received, expected_size) = match &item.state {
                    ActiveState::Running(req) => (req.progress(), req.expected_size()),
                    ActiveState::CanceledBeforeStart => (0, None),
                };
                ActiveProgress {
                    filename: filename.clone(),
                    url: item.url.clone(),
                    bytes_received,
                    expected_size,
                }
            })
            .collect()
    }

    /// Harvest finished requests, then admit queued items up to `max_active`.
    pub fn tick(&mut self, max_active: usize) {
        self.check_completions();
        self.schedule_downloads(max_active);
    }

    fn check_completions(&mut self) {
        self.completions = BTreeMap::new();

        let finished: Vec<PathBuf> = self
            .active
            .iter()
            .filter(|(_, item)| item.finished().is_some())
            .map(|(filename, _)| filename.clone())
            .collect();

        for filename in finished {
            let Some(item) = self.active.remove(&filename) else {
                continue;
            };
            let success = match item.state {
                ActiveState::CanceledBeforeStart => {
                    tracing::debug!(filename = %filename.display(), "canceled before start");
                    false
                }
                // Joins the worker; it has already finished.
                ActiveState::Running(req) => match req.into_result() {
                    Ok(Ok(body)) => {
                        store_payload(&filename, &body);
                        tracing::info!(
                            url = %item.url,
                            filename = %filename.display(),
                            bytes = body.len(),
                            "download complete"
                        );
                        true
                    }
                    Ok(Err(e)) => {
                        tracing::info!(
                            url = %item.url,
                            filename = %filename.display(),
                            "download failed: {}",
                            e
                        );
                        false
                    }
                    // Only finished items are harvested; keep it running if not.
                    Err(req) => {
                        self.active.insert(
                            filename,
                            ActiveItem {
                                url: item.url,
                                state: ActiveState::Running(req),
                            },
                        );
                        continue;
                    }
                },
            };
            self.completions.insert(filename, success);
        }
    }

    fn schedule_downloads(&mut self, max_active: usize) {
        while self.active.len() < max_active {
            let Some(item) = self.queued.pop_front() else {
                break;
            };
            tracing::debug!(url = %item.url, filename = %item.filename.display(), "starting download");
            let req = HttpRequest::start(item.url.clone(), self.options);
            self.active.insert(
                item.filename,
                ActiveItem {
                    url: item.url,
                    state: ActiveState::Running(req),
                },
            );
        }
    }

    /// Ask every in-flight request to stop. Does not wait; the next tick harvests them.
    pub fn cancel_active_downloads(&mut self) {
        for item in self.active.values() {
            if let ActiveState::Running(req) = &item.state {
                req.cancel();
            }
        }
    }

    /// Move every queued item to active without starting it; the next tick
    /// reports each as a failed completion.
    pub fn cancel_queued_downloads(&mut self) {
        for item in self.queued.drain(..) {
            self.active.insert(
                item.filename,
                ActiveItem {
                    url: item.url,
                    state: ActiveState::CanceledBeforeStart,
                },
            );
        }
    }

    /// Drop every queued item without recording a completion.
    pub fn clear_queued_downloads(&mut self) {
        self.queued.clear();
    }
}

impl Default for DownloadQueue {
    fn default() -> Self {
        Self::new(RequestOptions::default())
    }
}

impl Drop for DownloadQueue {
    fn drop(&mut self) {
        // Dropping a request joins its worker; unblock stalled ones first.
        self.cancel_active_downloads();
    }
}

/// A write failure is logged only; the completion still reflects the network outcome.
fn store_payload(filename: &Path, body: &[u8]) {
    if let Err(e) = storage::write_payload(filename, body) {
        tracing::warn!(filename = %filename.display(), "failed to write download: {:#}", e);
    }
}
