//! Glob and regex filtering of sync candidates
//!
//! Filters are compiled once per operation, before any planning, so that a
//! malformed pattern fails fast with a [`ConfigurationError`] and no partial
//! plan ever exists. Matching is always against the `/`-separated path
//! relative to the sync scope.

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::error::ConfigurationError;

/// Compiled include/exclude filter over relative paths
///
/// A path participates in a sync iff it passes every include axis that was
/// given (globs and regex are independent axes, ANDed together) and matches
/// no exclude filter. With no filters at all, every path participates.
///
/// Regexes use search semantics: an unanchored pattern matches anywhere in
/// the relative path. Anchor with `^` to match from the path start.
#[derive(Debug, Clone, Default)]
pub struct SyncFilter {
    include_globs: Option<GlobSet>,
    exclude_globs: Option<GlobSet>,
    include_regex: Option<Regex>,
    exclude_regex: Option<Regex>,
}

impl SyncFilter {
    /// Filter that matches every path
    #[must_use]
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Compile filter expressions
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for any glob or regex that fails to
    /// compile.
    pub fn compile(
        include_globs: &[String],
        exclude_globs: &[String],
        include_regex: Option<&str>,
        exclude_regex: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            include_globs: build_glob_set(include_globs)?,
            exclude_globs: build_glob_set(exclude_globs)?,
            include_regex: build_regex(include_regex)?,
            exclude_regex: build_regex(exclude_regex)?,
        })
    }

    /// Whether `path` participates in the sync operation
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let glob_included = self
            .include_globs
            .as_ref()
            .is_none_or(|globs| globs.is_match(path));
        let regex_included = self
            .include_regex
            .as_ref()
            .is_none_or(|regex| regex.is_match(path));

        let excluded = self
            .exclude_globs
            .as_ref()
            .is_some_and(|globs| globs.is_match(path))
            || self
                .exclude_regex
                .as_ref()
                .is_some_and(|regex| regex.is_match(path));

        glob_included && regex_included && !excluded
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>, ConfigurationError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|e| ConfigurationError::invalid_pattern(pattern, &e))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| ConfigurationError::invalid_pattern(&patterns.join(", "), &e))?;
    Ok(Some(set))
}

fn build_regex(pattern: Option<&str>) -> Result<Option<Regex>, ConfigurationError> {
    pattern
        .map(|p| Regex::new(p).map_err(|e| ConfigurationError::invalid_pattern(p, &e)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globs(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_no_filters_matches_everything() {
        let filter = SyncFilter::match_all();
        assert!(filter.matches("any/path.bin"));
        assert!(filter.matches("file.txt"));
    }

    #[test]
    fn test_include_glob() {
        let filter = SyncFilter::compile(&globs(&["*.txt"]), &[], None, None).unwrap();
        assert!(filter.matches("notes.txt"));
        assert!(filter.matches("dir/nested.txt"));
        assert!(!filter.matches("image.png"));
    }

    #[test]
    fn test_multiple_include_globs_any_match() {
        let filter = SyncFilter::compile(&globs(&["*.txt", "*.json"]), &[], None, None).unwrap();
        assert!(filter.matches("a.txt"));
        assert!(filter.matches("b.json"));
        assert!(!filter.matches("c.yaml"));
    }

    #[test]
    fn test_exclude_glob() {
        let filter = SyncFilter::compile(&[], &globs(&["*.tmp"]), None, None).unwrap();
        assert!(!filter.matches("scratch.tmp"));
        assert!(filter.matches("keep.txt"));
    }

    #[test]
    fn test_include_regex() {
        let filter = SyncFilter::compile(&[], &[], Some(r"^data/"), None).unwrap();
        assert!(filter.matches("data/f.txt"));
        assert!(!filter.matches("other/f.txt"));
    }

    #[test]
    fn test_regex_uses_search_semantics() {
        let unanchored = SyncFilter::compile(&[], &[], Some("sub/"), None).unwrap();
        assert!(unanchored.matches("sub/f.txt"));
        assert!(unanchored.matches("dir/sub/f.txt"));

        let anchored = SyncFilter::compile(&[], &[], Some("^sub/"), None).unwrap();
        assert!(anchored.matches("sub/f.txt"));
        assert!(!anchored.matches("dir/sub/f.txt"));
    }

    #[test]
    fn test_exclude_regex_beats_include_glob() {
        // secret.txt matches the include glob but the exclude regex wins
        let filter =
            SyncFilter::compile(&globs(&["*.txt"]), &[], None, Some(".*secret.*")).unwrap();
        assert!(filter.matches("public.txt"));
        assert!(!filter.matches("secret.txt"));
        assert!(!filter.matches("dir/secret.txt"));
    }

    #[test]
    fn test_glob_and_regex_axes_are_anded() {
        let filter =
            SyncFilter::compile(&globs(&["*.txt"]), &[], Some(r"^reports/"), None).unwrap();
        assert!(filter.matches("reports/q1.txt"));
        assert!(!filter.matches("reports/q1.csv")); // fails glob axis
        assert!(!filter.matches("drafts/q1.txt")); // fails regex axis
    }

    #[test]
    fn test_invalid_glob_fails_fast() {
        let err = SyncFilter::compile(&globs(&["[unclosed"]), &[], None, None).unwrap_err();
        assert!(err.message.contains("[unclosed"));
    }

    #[test]
    fn test_invalid_regex_fails_fast() {
        let err = SyncFilter::compile(&[], &[], Some("(unclosed"), None).unwrap_err();
        assert!(err.message.contains("(unclosed"));
    }
}
