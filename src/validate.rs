//! Validation of command-line values that clap cannot check on its own.
//!
//! Each function turns raw user input into the typed value the mirror
//! needs, or an [`Error::InvalidArgument`] naming the bad input.

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::mirror::Translation;

/// Format of the hidden `--synctime` override.
pub const SYNCTIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a `YYYYmmddHHMMSS` sync time.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the value does not match.
pub fn parse_synctime(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, SYNCTIME_FORMAT).map_err(|e| {
        Error::InvalidArgument(format!(
            "sync time '{input}' must look like 20240131235959: {e}"
        ))
    })
}

/// Parse every `from;to` symlink translation rule, keeping their order.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for the first malformed rule.
pub fn parse_translations(rules: &[String]) -> Result<Vec<Translation>> {
    rules.iter().map(|rule| Translation::parse(rule)).collect()
}

/// Check that the metadata file name is a plain file name.
///
/// The file always lives directly in the local root, so separators and
/// relative components are rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for empty names or names with path
/// components.
pub fn validate_metadb_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidArgument(format!(
            "metadata file name '{name}' is not a file name"
        )));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::InvalidArgument(format!(
            "metadata file name '{name}' must not contain path separators"
        )));
    }
    Ok(())
}

/// Normalize a remote root to `""` (the whole store) or `/a/b`.
///
/// Backslashes become slashes, a leading slash is added and trailing
/// slashes are dropped; casing is preserved.
#[must_use]
pub fn normalize_remote_root(input: &str) -> String {
    let path = input.replace('\\', "/");
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn test_parse_synctime() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(23, 59, 58).unwrap());
        assert_eq!(parse_synctime("20240131235958").unwrap(), expected);
        assert!(matches!(
            parse_synctime("2024-01-31"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_translations() {
        let rules = vec![r"C:\Test\;/home/test/".to_string(), "a;b".to_string()];
        let parsed = parse_translations(&rules).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].to, "/home/test/");

        assert!(parse_translations(&["broken".to_string()]).is_err());
        assert!(parse_translations(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_validate_metadb_name() {
        assert!(validate_metadb_name(".~dropmirror.db3").is_ok());
        assert!(validate_metadb_name("").is_err());
        assert!(validate_metadb_name("..").is_err());
        assert!(validate_metadb_name("sub/meta.db3").is_err());
        assert!(validate_metadb_name(r"sub\meta.db3").is_err());
    }

    #[test]
    fn test_normalize_remote_root() {
        assert_eq!(normalize_remote_root(""), "");
        assert_eq!(normalize_remote_root("/"), "");
        assert_eq!(normalize_remote_root("Photos"), "/Photos");
        assert_eq!(normalize_remote_root("/Photos/2020/"), "/Photos/2020");
        assert_eq!(normalize_remote_root(r"\Photos\Raw"), "/Photos/Raw");
    }
}
