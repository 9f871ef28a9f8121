//! dropmirror - one-way Dropbox mirror
//!
//! This crate mirrors a remote folder tree onto a local directory, keeping
//! per-path sync history in a SQLite file inside the local root.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Run configuration built from the command line
//! - [`mirror`] - Mirror engine, filters, change detection, case handling
//! - [`model`] - Data types (RemoteEntry, MetadataRecord, Credential)
//! - [`remote`] - Remote store trait and the Dropbox adapter
//! - [`storage`] - SQLite metadata store
//! - [`validate`] - Checks for command-line values
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod mirror;
pub mod model;
pub mod remote;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
