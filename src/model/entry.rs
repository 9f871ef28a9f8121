//! Remote entry model.
//!
//! A `RemoteEntry` is what the remote store hands back for every child of a
//! listed folder. Entries are produced fresh on every listing call and are
//! never persisted by identity; see [`crate::model::MetadataRecord`] for the
//! persisted counterpart.

use chrono::{DateTime, Utc};

/// A single child returned by a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Last path component, original casing.
    pub name: String,

    /// Case-folded canonical path (lowercase, `/`-separated).
    pub path_lower: String,

    /// Path with the original casing.
    pub path_display: String,

    /// Remote unique id (tombstones have none).
    pub id: Option<String>,

    /// Variant-specific attributes.
    pub kind: EntryKind,
}

/// File, folder or tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File(FileInfo),
    Folder,
    Deleted,
}

/// Attributes only files carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Size in bytes.
    pub size: u64,

    /// Remote content hash, comparable to [`crate::mirror::hash_file`].
    pub content_hash: String,

    /// Modification time as reported by the uploading client.
    pub client_modified: DateTime<Utc>,

    /// Time the server last saw the file change.
    pub server_modified: DateTime<Utc>,

    /// Revision tag.
    pub rev: String,

    /// Link target when the remote file is a recorded symlink.
    pub symlink_target: Option<String>,
}

impl RemoteEntry {
    /// Create a folder entry.
    pub fn folder(path_display: &str, id: &str) -> Self {
        Self::with_kind(path_display, Some(id.to_string()), EntryKind::Folder)
    }

    /// Create a file entry.
    pub fn file(path_display: &str, id: &str, info: FileInfo) -> Self {
        Self::with_kind(path_display, Some(id.to_string()), EntryKind::File(info))
    }

    /// Create a tombstone entry.
    pub fn deleted(path_display: &str) -> Self {
        Self::with_kind(path_display, None, EntryKind::Deleted)
    }

    fn with_kind(path_display: &str, id: Option<String>, kind: EntryKind) -> Self {
        let name = path_display
            .rsplit('/')
            .next()
            .unwrap_or(path_display)
            .to_string();
        Self {
            name,
            path_lower: path_display.to_lowercase(),
            path_display: path_display.to_string(),
            id,
            kind,
        }
    }

    /// The case-folded key this entry is stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.path_lower
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File(_))
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, EntryKind::Folder)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self.kind, EntryKind::Deleted)
    }

    /// File attributes, if this is a file.
    #[must_use]
    pub fn file_info(&self) -> Option<&FileInfo> {
        match &self.kind {
            EntryKind::File(info) => Some(info),
            EntryKind::Folder | EntryKind::Deleted => None,
        }
    }
}
