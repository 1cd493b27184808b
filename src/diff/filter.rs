//! Include/exclude path filters.
//!
//! Globs use gitignore syntax (via the `ignore` crate's override matcher),
//! so `*.al` matches at any depth and `src/**` matches a subtree. Filters
//! are evaluated against normalized diff paths before the engine runs.

use std::path::Path;

use ignore::overrides::{Override, OverrideBuilder};

use super::DiffError;
use crate::models::diff::FileDiff;

/// Compiled include/exclude glob sets.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<Override>,
    exclude: Option<Override>,
}

impl PathFilter {
    /// Compile the filter. Empty `include` means "everything".
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, DiffError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// A filter that keeps every path.
    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    /// Whether `path` survives the filter.
    pub fn matches(&self, path: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|set| set.matched(path, false).is_whitelist());
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|set| set.matched(path, false).is_whitelist());
        included && !excluded
    }

    /// Keep only the relevant files, preserving diff order.
    pub fn apply(&self, files: Vec<FileDiff>) -> Vec<FileDiff> {
        files.into_iter().filter(|f| self.matches(&f.path)).collect()
    }
}

/// Build an override set in which every glob is a positive match.
fn compile(globs: &[String]) -> Result<Option<Override>, DiffError> {
    let globs: Vec<&str> = globs
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect();
    if globs.is_empty() {
        return Ok(None);
    }

    let mut builder = OverrideBuilder::new(Path::new(""));
    for glob in globs {
        builder
            .add(glob)
            .map_err(|e| DiffError::InvalidFilter(format!("{glob}: {e}")))?;
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| DiffError::InvalidFilter(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = PathFilter::new(&[], &[]).unwrap();
        assert!(filter.matches("src/Sales.al"));
        assert!(filter.matches("README.md"));
        assert!(PathFilter::allow_all().matches("anything"));
    }

    #[test]
    fn include_restricts_to_matching_paths() {
        let filter = PathFilter::new(&globs(&["*.al"]), &[]).unwrap();
        assert!(filter.matches("src/Sales.al"));
        assert!(filter.matches("Top.al"));
        assert!(!filter.matches("app.json"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter =
            PathFilter::new(&globs(&["*.al"]), &globs(&["test/**", "*.PermissionSet.al"])).unwrap();
        assert!(filter.matches("src/Sales.al"));
        assert!(!filter.matches("test/SalesTest.al"));
        assert!(!filter.matches("src/App.PermissionSet.al"));
    }

    #[test]
    fn blank_globs_are_ignored() {
        let filter = PathFilter::new(&globs(&["  "]), &globs(&[""])).unwrap();
        assert!(filter.matches("x.al"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = PathFilter::new(&globs(&["src/[unclosed"]), &[]).unwrap_err();
        assert!(err.to_string().contains("invalid path filter"));
    }
}
