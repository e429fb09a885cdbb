//! dlcache core: a raw-socket HTTP GET client, a bounded download queue
//! driven by `tick`, and an on-disk download cache with dedup.

pub mod config;
pub mod logging;

pub mod cache;
pub mod checksum;
pub mod queue;
pub mod request;
pub mod storage;
pub mod url_model;

pub use cache::DownloadCache;
pub use queue::DownloadQueue;
pub use request::{HttpRequest, RequestError};
