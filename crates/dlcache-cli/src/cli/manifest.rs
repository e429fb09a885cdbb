//! Download lists: positional URLs and `url [filename]` manifest files.

use anyhow::{bail, Context, Result};
use dlcache_core::url_model::filename_for_url;
use std::path::{Path, PathBuf};

/// One destination to make available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub url: String,
    pub filename: PathBuf,
}

/// Entry for a bare URL: named after its last path segment inside `output_dir`.
pub fn entry_for_url(url: &str, output_dir: &Path) -> Entry {
    Entry {
        url: url.to_string(),
        filename: output_dir.join(filename_for_url(url)),
    }
}

/// Parse manifest text. Relative filenames are placed under `output_dir`.
pub fn parse_manifest(text: &str, output_dir: &Path) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(url) = fields.next() else {
            continue;
        };
        let entry = match fields.next() {
            Some(name) => Entry {
                url: url.to_string(),
                filename: output_dir.join(name),
            },
            None => entry_for_url(url, output_dir),
        };
        if fields.next().is_some() {
            bail!("manifest line {}: expected `url [filename]`", index + 1);
        }
        entries.push(entry);
    }
    Ok(entries)
}

pub fn read_manifest(path: &Path, output_dir: &Path) -> Result<Vec<Entry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    parse_manifest(&text, output_dir).with_context(|| format!("in {}", path.display()))
}
