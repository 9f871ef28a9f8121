//! In-memory remote store for tests.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::{ListPage, RemoteStore};
use crate::error::{Error, Result};
use crate::mirror::hash::hash_bytes;
use crate::model::{FileInfo, RemoteEntry};

#[derive(Debug, Clone)]
struct Node {
    entry: RemoteEntry,
    data: Vec<u8>,
}

/// A remote tree held in memory, with call counters.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    nodes: BTreeMap<String, Node>,
    page_size: usize,
    failing: HashSet<String>,
    next_rev: u32,
    /// Keys passed to `list` without a cursor.
    pub listed: Vec<String>,
    /// Number of `list` calls made with a cursor.
    pub continue_calls: usize,
    /// Keys of downloaded files, in order.
    pub downloads: Vec<String>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed timestamp helper.
pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

fn parent_key(key: &str) -> &str {
    key.rsplit_once('/').map_or("", |(parent, _)| parent)
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            page_size: 1000,
            failing: HashSet::new(),
            next_rev: 1,
            listed: Vec::new(),
            continue_calls: 0,
            downloads: Vec::new(),
        }
    }

    /// Return at most `size` entries per page.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn add_folder(&mut self, path: &str) -> &mut Self {
        let id = format!("id:{}", path.to_lowercase());
        self.insert(RemoteEntry::folder(path, &id), Vec::new());
        self
    }

    pub fn add_file(&mut self, path: &str, data: &[u8], modified: DateTime<Utc>) -> &mut Self {
        let info = self.file_info(data, modified, None);
        let id = format!("id:{}", path.to_lowercase());
        self.insert(RemoteEntry::file(path, &id, info), data.to_vec());
        self
    }

    pub fn add_symlink(&mut self, path: &str, target: &str, modified: DateTime<Utc>) -> &mut Self {
        let info = self.file_info(b"", modified, Some(target.to_string()));
        let id = format!("id:{}", path.to_lowercase());
        self.insert(RemoteEntry::file(path, &id, info), Vec::new());
        self
    }

    pub fn add_deleted(&mut self, path: &str) -> &mut Self {
        self.insert(RemoteEntry::deleted(path), Vec::new());
        self
    }

    /// Drop `path` and everything below it.
    pub fn remove(&mut self, path: &str) -> &mut Self {
        let key = path.to_lowercase();
        let prefix = format!("{key}/");
        self.nodes.retain(|k, _| *k != key && !k.starts_with(&prefix));
        self
    }

    /// Make downloads of `path` fail.
    pub fn fail_download(&mut self, path: &str) -> &mut Self {
        self.failing.insert(path.to_lowercase());
        self
    }

    pub fn reset_counters(&mut self) {
        self.listed.clear();
        self.continue_calls = 0;
        self.downloads.clear();
    }

    fn file_info(&mut self, data: &[u8], modified: DateTime<Utc>, target: Option<String>) -> FileInfo {
        let rev = format!("{:09x}", self.next_rev);
        self.next_rev += 1;
        FileInfo {
            size: data.len() as u64,
            content_hash: hash_bytes(data),
            client_modified: modified,
            server_modified: modified,
            rev,
            symlink_target: target,
        }
    }

    fn insert(&mut self, entry: RemoteEntry, data: Vec<u8>) {
        self.nodes
            .insert(entry.key().to_string(), Node { entry, data });
    }

    fn children(&self, key: &str) -> Vec<RemoteEntry> {
        self.nodes
            .iter()
            .filter(|(k, _)| parent_key(k) == key)
            .map(|(_, node)| node.entry.clone())
            .collect()
    }
}

impl RemoteStore for MemoryRemote {
    fn list(&mut self, path: &str, cursor: Option<&str>) -> Result<ListPage> {
        let (key, offset) = match cursor {
            Some(cursor) => {
                self.continue_calls += 1;
                let (key, offset) = cursor
                    .rsplit_once('#')
                    .ok_or_else(|| Error::Other(format!("bad cursor '{cursor}'")))?;
                let offset = offset
                    .parse::<usize>()
                    .map_err(|e| Error::Other(e.to_string()))?;
                (key.to_string(), offset)
            }
            None => {
                let key = path.to_lowercase();
                self.listed.push(key.clone());
                (key, 0)
            }
        };

        let children = self.children(&key);
        let end = (offset + self.page_size).min(children.len());
        let has_more = end < children.len();
        Ok(ListPage {
            entries: children[offset..end].to_vec(),
            cursor: has_more.then(|| format!("{key}#{end}")),
            has_more,
        })
    }

    fn download(&mut self, remote_path: &str, dest: &Path) -> Result<()> {
        let key = remote_path.to_lowercase();
        if self.failing.contains(&key) {
            return Err(Error::Remote {
                status: 500,
                message: format!("download of {remote_path} failed"),
            });
        }
        let node = self.nodes.get(&key).ok_or_else(|| Error::Remote {
            status: 409,
            message: format!("path/not_found/ {remote_path}"),
        })?;
        std::fs::write(dest, &node.data)?;
        self.downloads.push(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginates_children() {
        let mut remote = MemoryRemote::new().with_page_size(2);
        for i in 0..5 {
            remote.add_file(&format!("/f{i}.txt"), b"x", ts(2020, 1, 1));
        }
        remote.add_folder("/Sub").add_file("/Sub/inner.txt", b"y", ts(2020, 1, 1));

        let mut seen = 0;
        let mut page = remote.list("", None).unwrap();
        loop {
            seen += page.entries.len();
            if !page.has_more {
                break;
            }
            let cursor = page.cursor.clone().unwrap();
            page = remote.list("", Some(&cursor)).unwrap();
        }

        assert_eq!(seen, 6);
        assert_eq!(remote.continue_calls, 2);
        assert_eq!(remote.list("/sub", None).unwrap().entries.len(), 1);
    }
}
