//! Symlink translation and creation.
//!
//! Dropbox records the target of a symlink as the string the uploading
//! machine saw, e.g. `C:\Test\bar.txt`. Translation rules rewrite that
//! string into something meaningful on this machine before the link is
//! created.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A textual `from;to` rewrite applied to recorded link targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub from: String,
    pub to: String,
}

impl Translation {
    /// Parse a `from;to` rule. Only the first `;` separates; `to` may
    /// contain further semicolons.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the rule has no `;`.
    pub fn parse(rule: &str) -> Result<Self> {
        let (from, to) = rule.split_once(';').ok_or_else(|| {
            Error::InvalidArgument(format!(
                "symlink translation '{rule}' must have the form '<remote>;<local>'"
            ))
        })?;
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Apply every rule in order to `target`.
#[must_use]
pub fn translate(target: &str, rules: &[Translation]) -> String {
    rules
        .iter()
        .fold(target.to_string(), |acc, rule| acc.replace(&rule.from, &rule.to))
}

/// Translate `target` and return it if the result exists locally.
#[must_use]
pub fn resolve_target(target: &str, rules: &[Translation]) -> Option<PathBuf> {
    let translated = PathBuf::from(translate(target, rules));
    translated.exists().then_some(translated)
}

/// Create a symlink at `link` pointing to `target`.
///
/// # Errors
///
/// Returns the OS error if the link cannot be created.
#[cfg(unix)]
pub fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Create a symlink at `link` pointing to `target`.
///
/// # Errors
///
/// Returns the OS error if the link cannot be created (commonly missing
/// privileges).
#[cfg(windows)]
pub fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_splits_on_first_semicolon() {
        let rule = Translation::parse(r"C:\Test\;/home/me/Test/").unwrap();
        assert_eq!(rule.from, r"C:\Test\");
        assert_eq!(rule.to, "/home/me/Test/");

        let rule = Translation::parse("a;b;c").unwrap();
        assert_eq!(rule.to, "b;c");

        assert!(matches!(
            Translation::parse("no separator"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_translate_applies_rules_in_order() {
        let rules = vec![
            Translation::parse("C:;/mnt/c").unwrap(),
            Translation::parse(r"\;/").unwrap(),
        ];
        assert_eq!(translate(r"C:\Test\bar.txt", &rules), "/mnt/c/Test/bar.txt");
        assert_eq!(translate("untouched", &[]), "untouched");
    }

    #[test]
    fn test_resolve_requires_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let bar = temp_dir.path().join("bar.txt");
        std::fs::write(&bar, "bar").unwrap();

        let rule = Translation::parse(&format!(r"C:\Test\;{}/", temp_dir.path().display())).unwrap();
        assert_eq!(resolve_target(r"C:\Test\bar.txt", &[rule.clone()]), Some(bar));
        assert_eq!(resolve_target(r"C:\Test\missing.txt", &[rule]), None);
        assert_eq!(resolve_target(r"C:\Test\bar.txt", &[]), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_make_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target.txt");
        std::fs::write(&target, "t").unwrap();
        let link = temp_dir.path().join("link.txt");

        make_symlink(&target, &link).unwrap();
        assert_eq!(std::fs::read_link(&link).unwrap(), target);
        assert!(make_symlink(&target, &link).is_err());
    }
}
