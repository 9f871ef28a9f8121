//! Content hashing for change detection.
//!
//! Dropbox reports a `content_hash` for every file: the file is split into
//! 4 MiB blocks, each block is hashed with SHA-256, and the concatenation of
//! the block digests is hashed again. Computing the same value locally lets
//! the mirror skip downloads of files that are already identical.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Block size used by the remote content hash.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Streaming content hasher.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    overall: Sha256,
    block: Sha256,
    block_pos: usize,
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.block_pos == BLOCK_SIZE {
                self.finish_block();
            }
            let take = (BLOCK_SIZE - self.block_pos).min(data.len());
            self.block.update(&data[..take]);
            self.block_pos += take;
            data = &data[take..];
        }
    }

    fn finish_block(&mut self) {
        let digest = std::mem::take(&mut self.block).finalize();
        self.overall.update(digest);
        self.block_pos = 0;
    }

    /// Finish and return the lowercase hex digest.
    #[must_use]
    pub fn hex_digest(mut self) -> String {
        if self.block_pos > 0 {
            self.finish_block();
        }
        format!("{:x}", self.overall.finalize())
    }
}

/// Hash the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.hex_digest())
}

/// Hash an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.hex_digest()
}

/// Check if local content differs from the remote.
///
/// Returns `true` if:
/// - The remote did not report a hash
/// - The local hash differs from the remote one
///
/// Returns `false` if the hashes match (no change).
#[must_use]
pub fn has_changed(local_hash: &str, remote_hash: Option<&str>) -> bool {
    remote_hash.is_none_or(|h| h != local_hash)
}
