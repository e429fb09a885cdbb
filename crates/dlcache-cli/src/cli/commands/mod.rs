//! CLI command handlers. Each command is in its own file.

mod checksum;
mod get;

pub use checksum::run_checksum;
pub use get::{run_get, GetOptions};
