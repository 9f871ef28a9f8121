//! SQLite storage layer for dropmirror.
//!
//! This module provides the persistence layer using SQLite with:
//! - A `meta` table of per-path sync records keyed by case-folded path
//! - A `login` table holding the single active credential
//! - Run-scoped transactions (commit once, roll back on failure)
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod schema;
pub mod sqlite;

pub use sqlite::{MetaStore, RecordQuery};
