use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Per-request socket options handed from the config to every `HttpRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Bound on the TCP connect step. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Size of each socket read while receiving the response.
    pub recv_buffer_bytes: usize,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            recv_buffer_bytes: DEFAULT_RECV_BUFFER_BYTES,
        }
    }
}

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RECV_BUFFER_BYTES: usize = 16 * 1024;

/// Global configuration loaded from `~/.config/dlcache/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlCacheConfig {
    /// Maximum number of downloads in flight at once (the `max_active` passed to `tick`).
    pub max_active_downloads: usize,
    /// Interval between scheduling ticks in the CLI download loop.
    pub tick_interval_ms: u64,
    /// Optional bound on TCP connect, in seconds. Missing means no bound.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Size of each socket read in bytes.
    pub recv_buffer_bytes: usize,
    /// Default destination directory for downloads (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Default for DlCacheConfig {
    fn default() -> Self {
        Self {
            max_active_downloads: 4,
            tick_interval_ms: 50,
            connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT_SECS),
            recv_buffer_bytes: DEFAULT_RECV_BUFFER_BYTES,
            download_dir: None,
        }
    }
}

impl DlCacheConfig {
    /// Socket options for the requests started by the queue.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            recv_buffer_bytes: self.recv_buffer_bytes.max(1),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlcache")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlCacheConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlCacheConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DlCacheConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DlCacheConfig::default();
        assert_eq!(cfg.max_active_downloads, 4);
        assert_eq!(cfg.tick_interval_ms, 50);
        assert_eq!(cfg.connect_timeout_secs, Some(30));
        assert_eq!(cfg.recv_buffer_bytes, 16 * 1024);
        assert!(cfg.download_dir.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = DlCacheConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: DlCacheConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_active_downloads, cfg.max_active_downloads);
        assert_eq!(parsed.tick_interval_ms, cfg.tick_interval_ms);
        assert_eq!(parsed.connect_timeout_secs, cfg.connect_timeout_secs);
        assert_eq!(parsed.recv_buffer_bytes, cfg.recv_buffer_bytes);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_active_downloads = 8
            tick_interval_ms = 10
            recv_buffer_bytes = 4096
            download_dir = "/var/cache/media"
        "#;
        let cfg: DlCacheConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_active_downloads, 8);
        assert_eq!(cfg.tick_interval(), Duration::from_millis(10));
        assert!(cfg.connect_timeout_secs.is_none());
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/var/cache/media")));

        let opts = cfg.request_options();
        assert!(opts.connect_timeout.is_none());
        assert_eq!(opts.recv_buffer_bytes, 4096);
    }

    #[test]
    fn request_options_clamp_zero_buffer() {
        let cfg = DlCacheConfig {
            recv_buffer_bytes: 0,
            ..DlCacheConfig::default()
        };
        assert_eq!(cfg.request_options().recv_buffer_bytes, 1);
        assert_eq!(
            cfg.request_options().connect_timeout,
            Some(Duration::from_secs(30))
        );
    }
}
