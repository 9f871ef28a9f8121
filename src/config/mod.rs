//! Run configuration.
//!
//! [`MirrorConfig`] is everything one mirror run needs, validated and
//! resolved from the command line. It is built per run, so the default
//! sync timestamp is the moment the run starts.

use chrono::{NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Cli, Direction};
use crate::error::{Error, Result};
use crate::mirror::{MirrorOptions, PatternFilter};
use crate::validate::{
    normalize_remote_root, parse_synctime, parse_translations, validate_metadb_name,
};

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub local_root: PathBuf,
    /// `""` for the whole store, else `/a/b` (display casing).
    pub remote_root: String,
    pub metadb_path: PathBuf,
    pub filter: PatternFilter,
    pub options: MirrorOptions,
    pub timeout: Duration,
    pub reset_meta: bool,
    pub prune: bool,
    pub app_key: Option<String>,
}

impl MirrorConfig {
    /// Validate `cli` and assemble the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported directions, invalid patterns,
    /// malformed translation rules, a bad metadata name or sync time, or
    /// a non-positive timeout.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.direction != Direction::Download {
            return Err(Error::InvalidArgument(format!(
                "direction '{}' is not implemented, only 'download' is",
                direction_name(cli.direction)
            )));
        }

        let local = cli
            .local
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("a local directory is required".into()))?;
        let local_root = absolute(local)?;

        validate_metadb_name(&cli.metadb)?;
        let remote_root = normalize_remote_root(&cli.remote);

        // The metadata file and its side files are never mirrored or removed.
        let meta_pattern = format!("/{}", regex::escape(&cli.metadb));
        let mut exclude = cli.exclude.clone();
        let mut keep = cli.keep.clone();
        if !exclude.contains(&meta_pattern) {
            exclude.push(meta_pattern.clone());
        }
        if !keep.contains(&meta_pattern) {
            keep.push(meta_pattern);
        }
        let filter = PatternFilter::new(&remote_root, &exclude, &cli.include, &keep)?;

        let sync_ts = match &cli.synctime {
            Some(raw) => parse_synctime(raw)?,
            None => now(),
        };

        if !cli.timeout.is_finite() || cli.timeout <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "timeout must be a positive number of seconds, got {}",
                cli.timeout
            )));
        }

        let options = MirrorOptions {
            delete: !cli.no_delete,
            dir_only: cli.dir_only,
            dry_run: cli.dry_run,
            ignore_symlink_errors: cli.ignsymlink,
            translations: parse_translations(&cli.trsymlink)?,
            sync_ts,
        };

        Ok(Self {
            metadb_path: local_root.join(&cli.metadb),
            local_root,
            remote_root,
            filter,
            options,
            timeout: Duration::from_secs_f64(cli.timeout),
            reset_meta: cli.resetmeta,
            prune: cli.prune,
            app_key: cli.app_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

/// Current UTC time without zone, the form stored in the metadata file.
#[must_use]
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Download => "download",
        Direction::Upload => "upload",
        Direction::Both => "both",
    }
}

/// Make `path` absolute against the current directory without touching
/// the filesystem (the directory may not exist yet).
fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}
