//! One-way mirroring of a remote tree onto the local filesystem.
//!
//! # Submodules
//!
//! - [`engine`] - Depth-first reconciliation of one remote folder tree
//! - [`filter`] - Exclude/include/keep patterns
//! - [`case`] - Reuse of existing casing on case-sensitive filesystems
//! - [`change`] - Per-file transfer decisions and mtime mirroring
//! - [`hash`] - Remote-compatible content hash
//! - [`symlink`] - Link target translation and creation
//! - [`local`] - Forced local removal

pub mod case;
pub mod change;
pub mod engine;
pub mod filter;
pub mod hash;
pub mod local;
pub mod symlink;

pub use case::CaseReconciler;
pub use engine::{Mirror, MirrorOptions, MirrorStats};
pub use filter::PatternFilter;
pub use hash::{hash_file, ContentHasher};
pub use symlink::Translation;
