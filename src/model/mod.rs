//! Data models for dropmirror.
//!
//! This module contains all domain models:
//! - RemoteEntry (what a remote listing returns)
//! - MetadataRecord (what the metadata store persists)
//! - Credential (the stored login)

pub mod credential;
pub mod entry;
pub mod record;

pub use credential::Credential;
pub use entry::{EntryKind, FileInfo, RemoteEntry};
pub use record::{MetadataRecord, RecordType};
