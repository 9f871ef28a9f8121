//! Pattern-based filtering.
//!
//! Exclude, include and keep rules are regular expressions matched
//! case-insensitively against remote paths. Each rule is anchored to the
//! configured remote root, so `--exclude=/tmp` on root `/Photos` compiles
//! to `^/Photos/tmp` and matches `/photos/tmp`, `/Photos/tmp.jpg`, and so on
//! (prefix match).

use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::error::{Error, Result};

/// Compiled exclude/include/keep rules.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    exclude: Vec<Regex>,
    include: Vec<Regex>,
    keep: Vec<Regex>,
}

impl PatternFilter {
    /// Compile the rule lists relative to `remote_root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for the first rule that does not
    /// compile.
    pub fn new(
        remote_root: &str,
        exclude: &[String],
        include: &[String],
        keep: &[String],
    ) -> Result<Self> {
        Ok(Self {
            exclude: compile_all(remote_root, exclude, "exclude")?,
            include: compile_all(remote_root, include, "include")?,
            keep: compile_all(remote_root, keep, "keep")?,
        })
    }

    /// Whether `display_path` is filtered out of the mirror.
    ///
    /// True iff an exclude rule matches and no include rule does.
    #[must_use]
    pub fn is_excluded(&self, display_path: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(display_path))
            && !self.include.iter().any(|re| re.is_match(display_path))
    }

    /// Whether a local-only entry with this key is protected from deletion.
    #[must_use]
    pub fn is_kept(&self, key: &str) -> bool {
        self.keep.iter().any(|re| re.is_match(key))
    }

    /// Compiled patterns as `(kind, pattern)` pairs, for diagnostics.
    pub fn patterns(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.exclude
            .iter()
            .map(|re| ("Exclude", re.as_str()))
            .chain(self.include.iter().map(|re| ("Include", re.as_str())))
            .chain(self.keep.iter().map(|re| ("Keep", re.as_str())))
    }
}

fn compile_all(root: &str, sources: &[String], kind: &'static str) -> Result<Vec<Regex>> {
    sources
        .iter()
        .map(|src| {
            let pattern = format!(
                "^{}/{}",
                regex::escape(root),
                src.trim_start_matches('/')
            );
            let re = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| Error::InvalidPattern {
                    kind,
                    pattern: src.clone(),
                    source,
                })?;
            trace!(kind, pattern = re.as_str(), "Compiled pattern");
            Ok(re)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_exclude_matches_prefix_case_insensitively() {
        let filter = PatternFilter::new("", &strings(&[r"/foo.*\.txt"]), &[], &[]).unwrap();

        assert!(filter.is_excluded("/foo.txt"));
        assert!(filter.is_excluded("/FOO-bar.TXT"));
        assert!(!filter.is_excluded("/Test/foo.txt"));
        assert!(!filter.is_excluded("/bar.txt"));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let filter = PatternFilter::new(
            "",
            &strings(&[r".*\.txt"]),
            &strings(&[r".*/bar\.txt"]),
            &[],
        )
        .unwrap();

        assert!(filter.is_excluded("/foo.txt"));
        assert!(!filter.is_excluded("/Test/bar.txt"));
        assert!(!filter.is_excluded("/Test"));
    }

    #[test]
    fn test_patterns_are_anchored_to_root() {
        let filter = PatternFilter::new("/Photos (2020)", &strings(&["raw"]), &[], &[]).unwrap();

        assert!(filter.is_excluded("/Photos (2020)/raw"));
        assert!(filter.is_excluded("/photos (2020)/RAW/img.cr2"));
        assert!(!filter.is_excluded("/Other/raw"));
    }

    #[test]
    fn test_keep_is_independent_of_exclude() {
        let filter = PatternFilter::new(
            "",
            &strings(&["secret"]),
            &strings(&["secret"]),
            &strings(&[r"removeme\.txt"]),
        )
        .unwrap();

        assert!(filter.is_kept("/removeme.txt"));
        assert!(!filter.is_kept("/test/removeme.txt"));
        assert!(!filter.is_excluded("/secret"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = PatternFilter::new("", &strings(&["^invalid (RegEx"]), &[], &[]).unwrap_err();
        match err {
            Error::InvalidPattern { kind, pattern, .. } => {
                assert_eq!(kind, "exclude");
                assert_eq!(pattern, "^invalid (RegEx");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let filter = PatternFilter::default();
        assert!(!filter.is_excluded("/anything"));
        assert!(!filter.is_kept("/anything"));
        assert_eq!(filter.patterns().count(), 0);
    }
}
