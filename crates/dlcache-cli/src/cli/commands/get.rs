//! `dlcache get` – make a set of files available, downloading only what is missing.

use anyhow::{bail, Result};
use dlcache_core::checksum;
use dlcache_core::config::DlCacheConfig;
use dlcache_core::queue::ActiveProgress;
use dlcache_core::DownloadCache;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::cli::manifest::{self, Entry};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct GetOptions {
    pub urls: Vec<String>,
    pub manifest: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub max_active: usize,
    pub refresh: bool,
    pub sha256: bool,
}

pub async fn run_get(cfg: &DlCacheConfig, opts: GetOptions) -> Result<()> {
    let mut entries: Vec<Entry> = opts
        .urls
        .iter()
        .map(|url| manifest::entry_for_url(url, &opts.output_dir))
        .collect();
    if let Some(path) = &opts.manifest {
        entries.extend(manifest::read_manifest(path, &opts.output_dir)?);
    }
    if entries.is_empty() {
        bail!("nothing to download: pass URLs or --manifest");
    }
    if opts.max_active == 0 {
        bail!("--max-active must be at least 1");
    }

    let mut cache = DownloadCache::new(cfg.request_options());
    if opts.refresh {
        // add() marks files already on disk as ready; clear() deletes exactly those.
        for e in &entries {
            cache.add(e.url.as_str(), e.filename.as_path());
        }
        let evicted = cache.ready().len();
        cache.clear();
        tracing::info!("refresh evicted {} cached file(s)", evicted);
    }
    for e in &entries {
        cache.add(e.url.as_str(), e.filename.as_path());
    }

    drive(&mut cache, opts.max_active, cfg.tick_interval()).await?;

    let mut failed = 0usize;
    for e in &entries {
        if cache.is_ready(&e.filename) {
            if opts.sha256 {
                let digest = checksum::sha256_path(&e.filename)?;
                println!("{}  {}", digest, e.filename.display());
            }
        } else {
            failed += 1;
            eprintln!("unavailable: {} ({})", e.filename.display(), e.url);
        }
    }
    println!("{} of {} file(s) available", entries.len() - failed, entries.len());
    if failed > 0 {
        bail!("{} download(s) failed", failed);
    }
    Ok(())
}

/// Tick the cache until empty. Ctrl-C cancels everything; ticking continues
/// so the cancellation drains.
async fn drive(cache: &mut DownloadCache, max_active: usize, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut canceled = false;
    let mut last_print = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            res = &mut ctrl_c, if !canceled => {
                res?;
                canceled = true;
                println!("canceling downloads...");
                cache.cancel();
            }
        }

        cache.tick(max_active);
        for (filename, ok) in cache.queue().completions() {
            let status = if *ok { "done" } else { "failed" };
            println!("  {:<6} {}", status, filename.display());
        }
        if cache.is_empty() {
            break;
        }
        if last_print.elapsed() >= PROGRESS_INTERVAL {
            for p in cache.queue().active_progress() {
                println!("  {}", progress_line(&p));
            }
            last_print = Instant::now();
        }
    }
    Ok(())
}

fn progress_line(p: &ActiveProgress) -> String {
    let done_kib = p.bytes_received as f64 / 1024.0;
    match (p.expected_size, p.fraction()) {
        (Some(total), Some(fraction)) => format!(
            "{}  {:.1} / {:.1} KiB ({:.1}%)",
            p.filename.display(),
            done_kib,
            total as f64 / 1024.0,
            fraction * 100.0
        ),
        _ => format!("{}  {:.1} KiB", p.filename.display(), done_kib),
    }
}
