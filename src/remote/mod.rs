//! Remote store access.
//!
//! The mirror engine only needs two things from the remote side: a
//! paginated listing of one folder and a way to fetch a file's content into
//! a local path. [`RemoteStore`] is that seam; [`dropbox::DropboxClient`]
//! implements it over HTTP.

pub mod dropbox;
#[cfg(test)]
pub mod memory;

use std::path::Path;

use crate::error::Result;
use crate::model::RemoteEntry;

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<RemoteEntry>,
    /// Continuation cursor for the next page.
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Listing and download access to the remote tree.
///
/// Calls block the caller. Implementations apply their own per-call
/// timeout.
pub trait RemoteStore {
    /// List the direct children of `path` (`""` is the root).
    ///
    /// With `cursor`, fetch the page following the one that returned it;
    /// `path` is then ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    fn list(&mut self, path: &str, cursor: Option<&str>) -> Result<ListPage>;

    /// Write the content of the file at `remote_path` to `dest`,
    /// replacing anything already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the local write fails.
    fn download(&mut self, remote_path: &str, dest: &Path) -> Result<()>;
}
