//! Local filesystem helpers for the deletion pass.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One child of a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub name: String,
    pub path: PathBuf,
    /// Real directory (symlinks to directories are not directories here).
    pub is_dir: bool,
}

/// List the children of `dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_dir(dir: &Path) -> io::Result<Vec<LocalEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        entries.push(LocalEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Remove a file or symlink, clearing a read-only bit if that blocks it.
///
/// # Errors
///
/// Returns an error if the entry still cannot be removed.
pub fn remove_file_force(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_writable(path)?;
            fs::remove_file(path)
        }
        // Windows directory symlinks
        Err(e) if path.symlink_metadata().is_ok_and(|m| m.is_symlink()) => {
            fs::remove_dir(path).map_err(|_| e)
        }
        Err(e) => Err(e),
    }
}

/// Remove a directory tree, clearing read-only bits if they block it.
///
/// # Errors
///
/// Returns an error if the tree still cannot be removed.
pub fn remove_dir_force(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_tree_writable(path)?;
            fs::remove_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

fn make_tree_writable(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_symlink() {
        return Ok(());
    }
    make_writable(path)?;
    if meta.is_dir() {
        for entry in fs::read_dir(path)? {
            make_tree_writable(&entry?.path())?;
        }
    }
    Ok(())
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_dir_is_sorted() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();

        let entries = list_dir(temp_dir.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b.txt"]);
        assert!(entries[0].is_dir);
        assert!(!entries[1].is_dir);
    }

    #[test]
    fn test_remove_readonly_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ro.txt");
        fs::write(&path, "x").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        remove_file_force(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_tree_with_readonly_content() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("tree");
        fs::create_dir_all(dir.join("sub")).unwrap();
        let file = dir.join("sub").join("ro.txt");
        fs::write(&file, "x").unwrap();
        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();

        remove_dir_force(&dir).unwrap();
        assert!(!dir.exists());
    }
}
