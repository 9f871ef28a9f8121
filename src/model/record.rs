//! Persisted metadata record.
//!
//! One row of the `meta` table. Records are keyed by the case-folded path
//! and link to their parent folder by key, never by pointer: children of a
//! folder are found by querying the store for `parent = <folder key>`.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use super::entry::{EntryKind, RemoteEntry};

/// Type tag stored in the `type` column.
///
/// Written with the class-style tags existing metadata files use, so a file
/// stays readable by older tools; the short tags are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    File,
    Folder,
    Deleted,
}

impl RecordType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "LocalFileMeta",
            Self::Folder => "LocalFolderMeta",
            Self::Deleted => "LocalDeletedMeta",
        }
    }

    #[must_use]
    pub const fn short_tag(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    /// Accepts both the class-style and the short tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "LocalFileMeta" => Ok(Self::File),
            "folder" | "LocalFolderMeta" => Ok(Self::Folder),
            "deleted" | "LocalDeletedMeta" => Ok(Self::Deleted),
            other => Err(format!("unknown record type '{other}'")),
        }
    }
}

/// A persisted sync record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Case-folded path, primary key.
    pub key: String,
    pub record_type: RecordType,
    pub name: String,
    pub id: Option<String>,
    pub size: Option<i64>,
    /// Display path (original casing).
    pub path: Option<String>,
    /// Key of the parent folder record, empty for children of the root.
    pub parent: String,
    pub rev: Option<String>,
    pub client_modified: Option<NaiveDateTime>,
    pub server_modified: Option<NaiveDateTime>,
    /// Last time the comparable attributes changed (`mod_ts`).
    pub modified_at: Option<NaiveDateTime>,
    /// Last sync run that touched the record (`sync_ts`).
    pub synced_at: Option<NaiveDateTime>,
}

impl MetadataRecord {
    /// Build the record for a remote entry, linked to `parent`.
    ///
    /// Timestamps are converted to naive UTC. `modified_at` and `synced_at`
    /// are left empty; the store fills them in on upsert.
    #[must_use]
    pub fn from_entry(entry: &RemoteEntry, parent: &str) -> Self {
        let mut record = Self {
            key: entry.path_lower.clone(),
            record_type: RecordType::Deleted,
            name: entry.name.clone(),
            id: entry.id.clone(),
            size: None,
            path: Some(entry.path_display.clone()),
            parent: parent.to_string(),
            rev: None,
            client_modified: None,
            server_modified: None,
            modified_at: None,
            synced_at: None,
        };

        match &entry.kind {
            EntryKind::File(info) => {
                record.record_type = RecordType::File;
                record.size = i64::try_from(info.size).ok();
                record.rev = Some(info.rev.clone());
                record.client_modified = Some(info.client_modified.naive_utc());
                record.server_modified = Some(info.server_modified.naive_utc());
            }
            EntryKind::Folder => record.record_type = RecordType::Folder,
            EntryKind::Deleted => {
                record.record_type = RecordType::Deleted;
                record.id = None;
            }
        }

        record
    }

    /// Whether two records describe the same remote state.
    ///
    /// Compares the type and every attribute copied from the remote entry.
    /// Parent linkage and the two bookkeeping timestamps are ignored.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.record_type == other.record_type
            && self.key == other.key
            && self.name == other.name
            && self.path == other.path
            && self.id == other.id
            && self.size == other.size
            && self.rev == other.rev
            && self.client_modified == other.client_modified
            && self.server_modified == other.server_modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::FileInfo;
    use chrono::{TimeZone, Utc};

    fn file(path: &str, rev: &str) -> RemoteEntry {
        let ts = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        RemoteEntry::file(
            path,
            "id:f",
            FileInfo {
                size: 12,
                content_hash: "abc".into(),
                client_modified: ts,
                server_modified: ts,
                rev: rev.into(),
                symlink_target: None,
            },
        )
    }

    #[test]
    fn test_from_file_entry() {
        let record = MetadataRecord::from_entry(&file("/Test/bar.txt", "01"), "/test");
        assert_eq!(record.key, "/test/bar.txt");
        assert_eq!(record.record_type, RecordType::File);
        assert_eq!(record.parent, "/test");
        assert_eq!(record.size, Some(12));
        assert_eq!(record.path.as_deref(), Some("/Test/bar.txt"));
        assert!(record.modified_at.is_none());
    }

    #[test]
    fn test_same_content_ignores_bookkeeping() {
        let a = MetadataRecord::from_entry(&file("/foo.txt", "01"), "");
        let mut b = a.clone();
        b.parent = "/elsewhere".into();
        b.synced_at = Some(Utc::now().naive_utc());
        assert!(a.same_content(&b));

        let c = MetadataRecord::from_entry(&file("/foo.txt", "02"), "");
        assert!(!a.same_content(&c));
    }

    #[test]
    fn test_same_content_distinguishes_type() {
        let folder = MetadataRecord::from_entry(&RemoteEntry::folder("/x", "id:x"), "");
        let mut deleted = folder.clone();
        deleted.record_type = RecordType::Deleted;
        assert!(!folder.same_content(&deleted));
    }

    #[test]
    fn test_record_type_parses_legacy_tags() {
        assert_eq!("LocalFileMeta".parse::<RecordType>(), Ok(RecordType::File));
        assert_eq!("folder".parse::<RecordType>(), Ok(RecordType::Folder));
        assert_eq!("LocalDeletedMeta".parse::<RecordType>(), Ok(RecordType::Deleted));
        assert!("Symlink".parse::<RecordType>().is_err());
    }
}
