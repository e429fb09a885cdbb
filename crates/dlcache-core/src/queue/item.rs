//! Queue items and their lifecycle states.

use crate::request::HttpRequest;
use std::path::PathBuf;

/// A requested destination waiting for admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub url: String,
    /// Destination path; the item's identity.
    pub filename: PathBuf,
}

/// What backs an item once it has left the queued set.
#[derive(Debug)]
pub(crate) enum ActiveState {
    /// A request is in flight (or finished but not yet harvested).
    Running(HttpRequest),
    /// Canceled while still queued; never opened a socket.
    CanceledBeforeStart,
}

#[derive(Debug)]
pub(crate) struct ActiveItem {
    pub url: String,
    pub state: ActiveState,
}

impl ActiveItem {
    /// `Some(success)` once the item can be harvested.
    pub(crate) fn finished(&self) -> Option<bool> {
        match &self.state {
            ActiveState::Running(req) if req.is_done() => Some(req.is_success()),
            ActiveState::Running(_) => None,
            ActiveState::CanceledBeforeStart => Some(false),
        }
    }
}
