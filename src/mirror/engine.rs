//! Mirror engine.
//!
//! Reconciles one remote folder tree into a local directory, depth-first:
//!
//! 1. List the remote folder completely (all pages) and filter it.
//! 2. Make sure the local directory exists.
//! 3. Remove local entries the remote no longer has (unless kept).
//! 4. Record tombstones for paths that never existed locally.
//! 5. Bring every file up to date and record it.
//! 6. Recurse into every folder, then record the folder itself.
//!
//! Records are linked to their parent folder by key; the root folder has
//! no record of its own. All store writes go through the caller's
//! transaction (see [`MetaStore::run`]).

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use super::case::CaseReconciler;
use super::change::{self, FileAction};
use super::filter::PatternFilter;
use super::local;
use super::symlink::{self, Translation};
use crate::error::{Error, Result};
use crate::model::{MetadataRecord, RemoteEntry};
use crate::remote::RemoteStore;
use crate::storage::{MetaStore, RecordQuery};

/// Behaviour switches for one run.
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Remove local entries missing remotely and record tombstones.
    pub delete: bool,
    /// Create directories and records only, never file content.
    pub dir_only: bool,
    /// Decide and log, but skip transfers, links and removals.
    pub dry_run: bool,
    /// Downgrade symlink creation failures to warnings.
    pub ignore_symlink_errors: bool,
    pub translations: Vec<Translation>,
    /// Timestamp stamped on every record this run touches.
    pub sync_ts: NaiveDateTime,
}

impl MirrorOptions {
    #[must_use]
    pub fn new(sync_ts: NaiveDateTime) -> Self {
        Self {
            delete: true,
            dir_only: false,
            dry_run: false,
            ignore_symlink_errors: false,
            translations: Vec::new(),
            sync_ts,
        }
    }
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorStats {
    pub dirs_visited: usize,
    pub dirs_created: usize,
    pub downloads: usize,
    pub identical: usize,
    pub overwritten_newer: usize,
    pub timestamps_adjusted: usize,
    pub symlinks_created: usize,
    pub symlinks_skipped: usize,
    pub removed: usize,
    pub kept: usize,
    pub tombstones: usize,
    pub excluded: usize,
}

/// Filtered listing of one remote folder, each part sorted by key.
#[derive(Debug, Default)]
struct Listing {
    folders: Vec<RemoteEntry>,
    files: Vec<RemoteEntry>,
    deleted: Vec<RemoteEntry>,
}

/// One mirror run.
pub struct Mirror<'a, R: RemoteStore + ?Sized> {
    remote: &'a mut R,
    store: &'a MetaStore,
    filter: &'a PatternFilter,
    options: &'a MirrorOptions,
    local_root: PathBuf,
    remote_root: String,
    case: CaseReconciler,
    stats: MirrorStats,
}

impl<'a, R: RemoteStore + ?Sized> Mirror<'a, R> {
    pub fn new(
        remote: &'a mut R,
        store: &'a MetaStore,
        local_root: &Path,
        remote_root: &str,
        filter: &'a PatternFilter,
        options: &'a MirrorOptions,
    ) -> Self {
        Self {
            remote,
            store,
            filter,
            options,
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.trim_end_matches('/').to_string(),
            case: CaseReconciler::new(),
            stats: MirrorStats::default(),
        }
    }

    /// Replace the case reconciler (e.g. to skip probing).
    #[must_use]
    pub fn with_case_reconciler(mut self, case: CaseReconciler) -> Self {
        self.case = case;
        self
    }

    /// Mirror the whole tree below the remote root.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; earlier filesystem changes remain.
    pub fn run(mut self) -> Result<MirrorStats> {
        fs::create_dir_all(&self.local_root)?;
        let root = self.local_root.clone();
        self.sync_dir(None, &root)?;
        Ok(self.stats)
    }

    fn sync_dir(&mut self, dir: Option<&RemoteEntry>, local_dir: &Path) -> Result<()> {
        let (remote_path, dir_key) = match dir {
            Some(entry) => (entry.path_lower.clone(), entry.path_lower.clone()),
            None => (self.remote_root.clone(), self.remote_root.to_lowercase()),
        };
        // Children of the root link to the empty key.
        let parent_key = dir.map_or("", RemoteEntry::key).to_string();

        debug!("Syncing {}", self.rel(local_dir));
        trace!("Remote {}", dir.map_or(self.remote_root.as_str(), |e| e.path_display.as_str()));
        self.stats.dirs_visited += 1;

        let listing = self.list(&remote_path)?;

        if !local_dir.is_dir() {
            debug!("Creating {}", self.rel(local_dir));
            fs::create_dir_all(local_dir)?;
            self.stats.dirs_created += 1;
        }

        if self.options.delete {
            self.remove_stale(&listing, &dir_key, local_dir)?;
            self.record_tombstones(&listing.deleted, &parent_key, local_dir)?;
        }

        for entry in &listing.files {
            let path = self.child_path(local_dir, &entry.name)?;
            if !self.options.dir_only {
                self.sync_file(entry, &path)?;
            }
            let record = MetadataRecord::from_entry(entry, &parent_key);
            self.store
                .upsert(&record, self.options.sync_ts, !self.options.dir_only)?;
        }

        for entry in &listing.folders {
            let path = self.child_path(local_dir, &entry.name)?;
            self.sync_dir(Some(entry), &path)?;
            let record = MetadataRecord::from_entry(entry, &parent_key);
            self.store.upsert(&record, self.options.sync_ts, true)?;
        }

        Ok(())
    }

    /// Fetch every page of `path` and split the survivors of the filter.
    fn list(&mut self, path: &str) -> Result<Listing> {
        let mut listing = Listing::default();
        let mut page = self.remote.list(path, None)?;

        loop {
            for entry in page.entries {
                if self.filter.is_excluded(&entry.path_display) {
                    debug!("Excluded: {}", entry.path_display);
                    self.stats.excluded += 1;
                } else if entry.is_file() {
                    listing.files.push(entry);
                } else if entry.is_folder() {
                    listing.folders.push(entry);
                } else {
                    listing.deleted.push(entry);
                }
            }

            match page.cursor {
                Some(cursor) if page.has_more => page = self.remote.list(path, Some(&cursor))?,
                _ => break,
            }
        }

        for part in [&mut listing.folders, &mut listing.files, &mut listing.deleted] {
            part.sort_by(|a, b| {
                a.key()
                    .cmp(b.key())
                    .then_with(|| a.path_display.cmp(&b.path_display))
            });
        }
        Ok(listing)
    }

    /// Delete local entries of `local_dir` the listing does not contain.
    fn remove_stale(&mut self, listing: &Listing, dir_key: &str, local_dir: &Path) -> Result<()> {
        let present: HashSet<&str> = listing
            .folders
            .iter()
            .chain(&listing.files)
            .map(RemoteEntry::key)
            .collect();

        for entry in local::list_dir(local_dir)? {
            let key = format!("{dir_key}/{}", entry.name.to_lowercase());
            if present.contains(key.as_str()) {
                continue;
            }
            if self.filter.is_kept(&key) {
                debug!("Keeping {}", self.rel(&entry.path));
                self.stats.kept += 1;
                continue;
            }

            info!("{}Removing {}", self.dry_prefix(), self.rel(&entry.path));
            self.stats.removed += 1;
            if self.options.dry_run {
                continue;
            }
            if entry.is_dir {
                local::remove_dir_force(&entry.path)?;
                self.store.remove_tree(&key)?;
            } else {
                local::remove_file_force(&entry.path)?;
                self.store.remove(&RecordQuery::key(&key))?;
            }
        }
        Ok(())
    }

    /// Record tombstones whose path does not exist locally.
    fn record_tombstones(&mut self, deleted: &[RemoteEntry], parent_key: &str, local_dir: &Path) -> Result<()> {
        for entry in deleted {
            let path = self.child_path(local_dir, &entry.name)?;
            if path.symlink_metadata().is_ok() {
                info!("Deleted remotely, left in place: {}", self.rel(&path));
                continue;
            }
            let record = MetadataRecord::from_entry(entry, parent_key);
            self.store.upsert(&record, self.options.sync_ts, true)?;
            self.stats.tombstones += 1;
        }
        Ok(())
    }

    /// Bring the local copy of one remote file up to date.
    fn sync_file(&mut self, entry: &RemoteEntry, path: &Path) -> Result<()> {
        let Some(info) = entry.file_info() else {
            return Ok(());
        };

        let action = change::decide(path, info)?;
        match action {
            FileAction::Identical => {
                trace!("Identical {}", self.rel(path));
                self.stats.identical += 1;
            }
            FileAction::Download { overwrite_newer } => {
                if overwrite_newer {
                    warn!("Overwriting newer {}", self.rel(path));
                    self.stats.overwritten_newer += 1;
                }
                info!(
                    "{}Downloading {}, {}k",
                    self.dry_prefix(),
                    self.rel(path),
                    info.size / 1024
                );
                if !self.options.dry_run {
                    self.remote.download(&entry.path_lower, path)?;
                    self.stats.downloads += 1;
                }
            }
            FileAction::CreateSymlink => {
                let target = info.symlink_target.as_deref().unwrap_or_default();
                self.create_symlink(target, path)?;
            }
            FileAction::LeaveSymlink => {
                debug!("Leaving symlink {} alone", self.rel(path));
            }
        }

        let skipped_transfer = self.options.dry_run && action.transfers();
        if info.symlink_target.is_none() && !skipped_transfer && path.is_file() {
            if let Some(previous) = change::reconcile_mtime(path, info.client_modified)? {
                let previous = previous.unix_seconds();
                if action.transfers() {
                    trace!("Adjusting timestamp {} ({previous} -> {})", self.rel(path), info.client_modified);
                } else {
                    debug!("Adjusting timestamp {} ({previous} -> {})", self.rel(path), info.client_modified);
                }
                self.stats.timestamps_adjusted += 1;
            }
        }
        Ok(())
    }

    fn create_symlink(&mut self, target: &str, path: &Path) -> Result<()> {
        let Some(resolved) = symlink::resolve_target(target, &self.options.translations) else {
            warn!(
                "Symbolic link target not found: {}",
                symlink::translate(target, &self.options.translations)
            );
            self.stats.symlinks_skipped += 1;
            return Ok(());
        };

        info!("{}Symlink {}, {}", self.dry_prefix(), self.rel(path), resolved.display());
        if self.options.dry_run {
            return Ok(());
        }

        match symlink::make_symlink(&resolved, path) {
            Ok(()) => self.stats.symlinks_created += 1,
            Err(e) if self.options.ignore_symlink_errors => {
                warn!("Cannot create symlink {}: {e}", self.rel(path));
                self.stats.symlinks_skipped += 1;
            }
            Err(source) => {
                return Err(Error::Symlink {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn child_path(&mut self, dir: &Path, name: &str) -> Result<PathBuf> {
        Ok(self.case.resolve(&self.local_root, dir, name)?)
    }

    fn dry_prefix(&self) -> &'static str {
        if self.options.dry_run { "Dry-run: " } else { "" }
    }

    /// `path` relative to the local root, for log output.
    fn rel(&self, path: &Path) -> String {
        match path.strip_prefix(&self.local_root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}
