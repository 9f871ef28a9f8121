//! Change detection for a single remote file.
//!
//! Decides whether a remote file has to be transferred by comparing the
//! remote content hash with a hash of the local copy, and keeps local
//! modification times in line with the remote's `client_modified`.

use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::io;
use std::path::Path;

use super::hash::{has_changed, hash_file};
use crate::model::FileInfo;

/// What to do with one remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Fetch the content. `overwrite_newer` is set when the local copy
    /// differs and was modified after the remote one.
    Download { overwrite_newer: bool },
    /// Nothing exists locally and the remote entry is a symlink.
    CreateSymlink,
    /// Local content already matches.
    Identical,
    /// The remote entry is a symlink and something already exists locally.
    LeaveSymlink,
}

impl FileAction {
    /// Whether content (or a link) will be materialised.
    #[must_use]
    pub const fn transfers(&self) -> bool {
        matches!(self, Self::Download { .. } | Self::CreateSymlink)
    }
}

/// Decide what to do with remote file `info` whose local counterpart is `local`.
///
/// # Errors
///
/// Returns an error if the local file exists but cannot be hashed.
pub fn decide(local: &Path, info: &FileInfo) -> io::Result<FileAction> {
    match local.symlink_metadata() {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(if info.symlink_target.is_some() {
                FileAction::CreateSymlink
            } else {
                FileAction::Download {
                    overwrite_newer: false,
                }
            });
        }
        Err(e) => return Err(e),
    }

    if info.symlink_target.is_some() {
        return Ok(FileAction::LeaveSymlink);
    }

    let local_hash = hash_file(local)?;
    if !has_changed(&local_hash, Some(&info.content_hash)) {
        return Ok(FileAction::Identical);
    }

    let local_mtime = FileTime::from_last_modification_time(&std::fs::metadata(local)?);
    Ok(FileAction::Download {
        overwrite_newer: local_mtime > to_filetime(info.client_modified),
    })
}

/// Convert a remote timestamp to the local file clock.
#[must_use]
pub fn to_filetime(ts: DateTime<Utc>) -> FileTime {
    FileTime::from_unix_time(ts.timestamp(), ts.timestamp_subsec_nanos())
}

/// Set the modification time of `local` to `client_modified` if it differs.
///
/// Returns the previous modification time when an adjustment was made.
///
/// # Errors
///
/// Returns an error if the file cannot be inspected or updated.
pub fn reconcile_mtime(local: &Path, client_modified: DateTime<Utc>) -> io::Result<Option<FileTime>> {
    let meta = std::fs::metadata(local)?;
    let current = FileTime::from_last_modification_time(&meta);
    let wanted = to_filetime(client_modified);
    if current == wanted {
        return Ok(None);
    }
    filetime::set_file_times(local, wanted, wanted)?;
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::hash::hash_bytes;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn info(data: &[u8], year: i32) -> FileInfo {
        let ts = Utc.with_ymd_and_hms(year, 3, 4, 5, 6, 7).unwrap();
        FileInfo {
            size: data.len() as u64,
            content_hash: hash_bytes(data),
            client_modified: ts,
            server_modified: ts,
            rev: "0001".into(),
            symlink_target: None,
        }
    }

    #[test]
    fn test_missing_file_is_downloaded() {
        let temp_dir = TempDir::new().unwrap();
        let action = decide(&temp_dir.path().join("foo.txt"), &info(b"x", 2020)).unwrap();
        assert_eq!(
            action,
            FileAction::Download {
                overwrite_newer: false
            }
        );
        assert!(action.transfers());
    }

    #[test]
    fn test_missing_symlink_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let mut remote = info(b"", 2020);
        remote.symlink_target = Some("/somewhere".into());
        assert_eq!(
            decide(&temp_dir.path().join("link"), &remote).unwrap(),
            FileAction::CreateSymlink
        );
    }

    #[test]
    fn test_existing_symlink_target_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("link");
        fs::write(&path, "whatever").unwrap();
        let mut remote = info(b"", 2020);
        remote.symlink_target = Some("/somewhere".into());

        let action = decide(&path, &remote).unwrap();
        assert_eq!(action, FileAction::LeaveSymlink);
        assert!(!action.transfers());
    }

    #[test]
    fn test_identical_content_is_not_transferred() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("foo.txt");
        fs::write(&path, b"hello world!").unwrap();

        assert_eq!(
            decide(&path, &info(b"hello world!", 2020)).unwrap(),
            FileAction::Identical
        );
    }

    #[test]
    fn test_changed_content_flags_newer_local_copy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("foo.txt");
        fs::write(&path, b"local edit").unwrap();

        // Local mtime is "now", far after 2001.
        assert_eq!(
            decide(&path, &info(b"remote", 2001)).unwrap(),
            FileAction::Download {
                overwrite_newer: true
            }
        );

        let old = FileTime::from_unix_time(0, 0);
        filetime::set_file_mtime(&path, old).unwrap();
        assert_eq!(
            decide(&path, &info(b"remote", 2001)).unwrap(),
            FileAction::Download {
                overwrite_newer: false
            }
        );
    }

    #[test]
    fn test_reconcile_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("foo.txt");
        fs::write(&path, b"data").unwrap();
        let remote = info(b"data", 2010);

        assert!(reconcile_mtime(&path, remote.client_modified).unwrap().is_some());
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&path).unwrap());
        assert_eq!(mtime, to_filetime(remote.client_modified));

        assert!(reconcile_mtime(&path, remote.client_modified).unwrap().is_none());
    }
}
