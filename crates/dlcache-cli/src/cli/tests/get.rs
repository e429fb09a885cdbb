//! Tests for the get and checksum subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_get_urls() {
    match parse(&["dlcache", "get", "http://h/a.mp4", "http://h/b.mp4"]) {
        CliCommand::Get {
            urls,
            manifest,
            output_dir,
            max_active,
            refresh,
            sha256,
        } => {
            assert_eq!(urls, vec!["http://h/a.mp4", "http://h/b.mp4"]);
            assert!(manifest.is_none());
            assert!(output_dir.is_none());
            assert!(max_active.is_none());
            assert!(!refresh);
            assert!(!sha256);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_all_flags() {
    match parse(&[
        "dlcache",
        "get",
        "--manifest",
        "media.txt",
        "-o",
        "/tmp/media",
        "--max-active",
        "8",
        "--refresh",
        "--sha256",
    ]) {
        CliCommand::Get {
            urls,
            manifest,
            output_dir,
            max_active,
            refresh,
            sha256,
        } => {
            assert!(urls.is_empty());
            assert_eq!(manifest.as_deref(), Some(Path::new("media.txt")));
            assert_eq!(output_dir.as_deref(), Some(Path::new("/tmp/media")));
            assert_eq!(max_active, Some(8));
            assert!(refresh);
            assert!(sha256);
        }
        _ => panic!("expected Get with flags"),
    }
}

#[test]
fn cli_parse_get_rejects_bad_max_active() {
    assert!(Cli::try_parse_from(["dlcache", "get", "--max-active", "many"]).is_err());
}

#[test]
fn cli_parse_checksum() {
    match parse(&["dlcache", "checksum", "/tmp/file.bin"]) {
        CliCommand::Checksum { path } => assert_eq!(path, Path::new("/tmp/file.bin")),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["dlcache", "status"]).is_err());
}
