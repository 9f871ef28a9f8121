//! Case-insensitive path reconciliation.
//!
//! Dropbox is case-insensitive but case-preserving, so one folder can be
//! listed as `Case/Sensitive-1` in one place and `case/sensitive-1` in
//! another. On a case-sensitive local filesystem that would produce two
//! directories. The reconciler redirects such paths to whatever casing
//! already exists on disk.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Per-run cache of case-sensitivity probes and resolved paths.
#[derive(Debug, Default)]
pub struct CaseReconciler {
    forced: Option<bool>,
    sensitivity: HashMap<PathBuf, bool>,
    resolved: HashMap<PathBuf, PathBuf>,
}

impl CaseReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reconciler that skips probing and assumes the given sensitivity.
    #[must_use]
    pub fn with_sensitivity(case_sensitive: bool) -> Self {
        Self {
            forced: Some(case_sensitive),
            ..Self::default()
        }
    }

    /// Whether the filesystem holding `root` distinguishes case.
    ///
    /// Probed once per root by creating a throwaway file and checking
    /// whether its upper-cased name resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe file cannot be created.
    pub fn is_case_sensitive(&mut self, root: &Path) -> io::Result<bool> {
        if let Some(forced) = self.forced {
            return Ok(forced);
        }
        if let Some(cached) = self.sensitivity.get(root) {
            return Ok(*cached);
        }

        let sensitive = probe_case_sensitive(root)?;
        trace!(root = %root.display(), sensitive, "Probed filesystem case sensitivity");
        self.sensitivity.insert(root.to_path_buf(), sensitive);
        Ok(sensitive)
    }

    /// Local path for child `name` of directory `dir`.
    ///
    /// On case-sensitive filesystems an existing differently-cased path is
    /// preferred over the literal one; otherwise `dir/name` is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the case-sensitivity probe fails.
    pub fn resolve(&mut self, root: &Path, dir: &Path, name: &str) -> io::Result<PathBuf> {
        let candidate = dir.join(name);
        if !self.is_case_sensitive(root)? {
            return Ok(candidate);
        }

        if let Some(hit) = self.resolved.get(&candidate) {
            if hit.symlink_metadata().is_ok() {
                return Ok(hit.clone());
            }
        }

        match find_insensitive(&candidate) {
            Some(found) => {
                if found != candidate {
                    trace!(wanted = %candidate.display(), found = %found.display(), "Reusing existing casing");
                }
                self.resolved.insert(candidate, found.clone());
                Ok(found)
            }
            None => Ok(candidate),
        }
    }
}

fn probe_case_sensitive(root: &Path) -> io::Result<bool> {
    let dir = if root.is_dir() {
        root
    } else {
        root.parent().unwrap_or(root)
    };

    let name = format!(".~case-probe-{}", uuid::Uuid::new_v4().simple());
    let probe = dir.join(&name);
    OpenOptions::new().write(true).create_new(true).open(&probe)?;

    let upper = dir.join(name.to_uppercase());
    let sensitive = upper.symlink_metadata().is_err();
    fs::remove_file(&probe)?;
    Ok(sensitive)
}

/// Find `path` on disk ignoring case.
///
/// Walks up to the nearest existing ancestor, then descends matching each
/// component case-insensitively against the directory's entries. Returns
/// `None` as soon as a level has no match (or is not a directory).
#[must_use]
pub fn find_insensitive(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() || path.symlink_metadata().is_ok() {
        return Some(path.to_path_buf());
    }

    let name = path.file_name()?;
    let parent = path.parent()?;
    let parent = if parent.as_os_str().is_empty() || parent.symlink_metadata().is_ok() {
        parent.to_path_buf()
    } else {
        find_insensitive(parent)?
    };

    let wanted = name.to_string_lossy().to_lowercase();
    fs::read_dir(&parent)
        .ok()?
        .filter_map(std::result::Result::ok)
        .find(|entry| entry.file_name().to_string_lossy().to_lowercase() == wanted)
        .map(|entry| parent.join(entry.file_name()))
}
