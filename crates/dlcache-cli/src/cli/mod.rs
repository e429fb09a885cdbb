//! CLI for the dlcache download cache.

mod commands;
mod manifest;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dlcache_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_get, GetOptions};

/// Top-level CLI for dlcache.
#[derive(Debug, Parser)]
#[command(name = "dlcache")]
#[command(about = "dlcache: fetch HTTP files into a local cache directory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download files that are not already in the output directory.
    Get {
        /// http:// URLs to fetch; the file is named after the last path segment.
        urls: Vec<String>,

        /// File with one `url [filename]` per line (`#` starts a comment).
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Destination directory (default: config `download_dir`, else the current directory).
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Maximum concurrent downloads (default: config `max_active_downloads`).
        #[arg(long, value_name = "N")]
        max_active: Option<usize>,

        /// Delete files already present and download them again.
        #[arg(long)]
        refresh: bool,

        /// Print the SHA-256 of every available file when done.
        #[arg(long)]
        sha256: bool,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                manifest,
                output_dir,
                max_active,
                refresh,
                sha256,
            } => {
                let output_dir = match output_dir.or_else(|| cfg.download_dir.clone()) {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                let opts = GetOptions {
                    urls,
                    manifest,
                    output_dir,
                    max_active: max_active.unwrap_or(cfg.max_active_downloads),
                    refresh,
                    sha256,
                };
                run_get(&cfg, opts).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
