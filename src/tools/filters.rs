//! Workspace-listing filters for `list_workbooks`.

use anyhow::{Result, anyhow};
use globset::{Glob, GlobMatcher};
use std::path::Path;

/// Narrowing criteria for a workspace scan. All criteria are conjunctive;
/// an empty filter matches every workbook.
#[derive(Default)]
pub struct WorkbookFilter {
    slug_prefix: Option<String>,
    folder: Option<String>,
    path_glob: Option<GlobMatcher>,
}

impl WorkbookFilter {
    pub fn new(
        slug_prefix: Option<String>,
        folder: Option<String>,
        path_glob: Option<String>,
    ) -> Result<Self> {
        let path_glob = path_glob
            .map(|pattern| {
                Glob::new(&pattern)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|err| anyhow!("invalid glob pattern {pattern}: {err}"))
            })
            .transpose()?;

        Ok(Self {
            slug_prefix: slug_prefix.map(|s| s.to_ascii_lowercase()),
            folder: folder.map(|s| s.to_ascii_lowercase()),
            path_glob,
        })
    }

    /// Whether a workbook with the given slug, containing folder, and path
    /// passes every configured criterion. Slug and folder compare
    /// case-insensitively; the glob matches the full path.
    pub fn matches(&self, slug: &str, folder: Option<&str>, path: &Path) -> bool {
        let slug_ok = self
            .slug_prefix
            .as_deref()
            .is_none_or(|prefix| slug.to_ascii_lowercase().starts_with(prefix));

        let folder_ok = self.folder.as_deref().is_none_or(|expected| {
            folder.is_some_and(|actual| actual.eq_ignore_ascii_case(expected))
        });

        let glob_ok = self
            .path_glob
            .as_ref()
            .is_none_or(|glob| glob.is_match(path));

        slug_ok && folder_ok && glob_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_filter_matches_everything() {
        let filter = WorkbookFilter::default();
        assert!(filter.matches("budget", Some("q3"), &PathBuf::from("q3/budget.xlsx")));
        assert!(filter.matches("anything", None, &PathBuf::from("anything.xlsx")));
    }

    #[test]
    fn slug_prefix_is_case_insensitive() {
        let filter =
            WorkbookFilter::new(Some("Bud".to_string()), None, None).unwrap();
        assert!(filter.matches("budget", None, &PathBuf::from("budget.xlsx")));
        assert!(!filter.matches("forecast", None, &PathBuf::from("forecast.xlsx")));
    }

    #[test]
    fn folder_must_match_when_set() {
        let filter =
            WorkbookFilter::new(None, Some("Reports".to_string()), None).unwrap();
        assert!(filter.matches("a", Some("reports"), &PathBuf::from("reports/a.xlsx")));
        assert!(!filter.matches("a", Some("archive"), &PathBuf::from("archive/a.xlsx")));
        assert!(!filter.matches("a", None, &PathBuf::from("a.xlsx")));
    }

    #[test]
    fn glob_applies_to_the_full_path() {
        let filter =
            WorkbookFilter::new(None, None, Some("**/2024-*.xlsx".to_string())).unwrap();
        assert!(filter.matches("x", None, &PathBuf::from("sales/2024-q1.xlsx")));
        assert!(!filter.matches("x", None, &PathBuf::from("sales/2023-q4.xlsx")));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(WorkbookFilter::new(None, None, Some("[".to_string())).is_err());
    }
}
