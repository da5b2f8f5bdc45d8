//! Candidate version filtering
//!
//! This module provides the VersionFilter struct that narrows published
//! versions down to the ones an update may target:
//! - Ignored ranges configured by the user
//! - Prereleases, unless the dependency already opts into them
//! - Versions flagged by security advisories

use crate::domain::{is_vulnerable, Dependency, SecurityAdvisory};
use crate::version::{Constraint, Version};
use regex::Regex;
use std::sync::LazyLock;

/// Prerelease markers inside a requirement string (`1.0.0-beta1`, `@dev`)
static PRERELEASE_REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\d[._-]?(?:alpha|beta|rc|a|b)\d*\b|@(?:dev|alpha|beta|rc)\b)").unwrap()
});

/// Filter configuration for one dependency
#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    /// Dependency the filter applies to
    pub dependency_name: String,
    /// Constraint strings whose matches are never offered
    pub ignored_versions: Vec<String>,
    /// Advisories (of any package) known to the check
    pub advisories: Vec<SecurityAdvisory>,
    /// Keep prerelease candidates
    pub wants_prerelease: bool,
}

impl VersionFilter {
    /// Create a new VersionFilter that keeps everything
    pub fn new(dependency_name: impl Into<String>) -> Self {
        Self {
            dependency_name: dependency_name.into(),
            ..Self::default()
        }
    }

    /// Set ignored ranges
    pub fn with_ignored_versions(mut self, ignored: Vec<String>) -> Self {
        self.ignored_versions = ignored;
        self
    }

    /// Set security advisories
    pub fn with_advisories(mut self, advisories: Vec<SecurityAdvisory>) -> Self {
        self.advisories = advisories;
        self
    }

    /// Set whether prereleases are wanted
    pub fn with_prereleases(mut self, wanted: bool) -> Self {
        self.wants_prerelease = wanted;
        self
    }

    /// Drop prereleases (unless wanted) and ignored versions
    pub fn filter_candidates(&self, candidates: Vec<Version>) -> Vec<Version> {
        let candidates = filter_prereleases(candidates, self.wants_prerelease);
        filter_ignored(candidates, &self.ignored_versions)
    }

    /// Drop versions flagged by an applicable advisory
    pub fn filter_vulnerable(&self, candidates: Vec<Version>) -> Vec<Version> {
        candidates
            .into_iter()
            .filter(|v| !self.is_vulnerable(v))
            .collect()
    }

    pub fn is_vulnerable(&self, version: &Version) -> bool {
        is_vulnerable(&self.dependency_name, version, &self.advisories)
    }

    /// Returns true if `version` falls in one of the ignored ranges
    pub fn is_ignored(&self, version: &Version) -> bool {
        parse_ranges(&self.ignored_versions)
            .iter()
            .any(|c| c.matches(version))
    }

    /// Lowest candidate above `current` that is neither vulnerable nor ignored
    pub fn lowest_fix(&self, current: &Version, candidates: &[Version]) -> Option<Version> {
        lowest_fix(
            &self.dependency_name,
            current,
            candidates,
            &self.advisories,
            &self.ignored_versions,
        )
    }
}

/// Keep candidates that match none of the `ignored` ranges, preserving order
///
/// Ranges that cannot be parsed are logged and skipped.
pub fn filter_ignored(candidates: Vec<Version>, ignored: &[String]) -> Vec<Version> {
    let constraints = parse_ranges(ignored);
    if constraints.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|v| !constraints.iter().any(|c| c.matches(v)))
        .collect()
}

/// Drop prerelease candidates unless `wants_prerelease`
pub fn filter_prereleases(candidates: Vec<Version>, wants_prerelease: bool) -> Vec<Version> {
    if wants_prerelease {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|v| !v.is_prerelease())
        .collect()
}

/// Returns true if the dependency opts into prereleases
///
/// That is the case when the current version is a prerelease, or a
/// requirement names a prerelease version or a `@dev`-style flag.
pub fn wants_prerelease(dependency: &Dependency) -> bool {
    let current_is_prerelease = dependency
        .version
        .as_ref()
        .and_then(|v| v.as_release())
        .is_some_and(|v| v.is_prerelease());
    if current_is_prerelease {
        return true;
    }

    dependency
        .requirement_strings()
        .any(|req| PRERELEASE_REQUIREMENT_RE.is_match(req))
}

/// Lowest candidate strictly above `current` that is neither vulnerable nor ignored
pub fn lowest_fix(
    dependency_name: &str,
    current: &Version,
    candidates: &[Version],
    advisories: &[SecurityAdvisory],
    ignored: &[String],
) -> Option<Version> {
    let ignored = parse_ranges(ignored);
    let mut ascending: Vec<&Version> = candidates.iter().filter(|v| *v > current).collect();
    ascending.sort();

    ascending
        .into_iter()
        .find(|v| {
            !is_vulnerable(dependency_name, v, advisories) && !ignored.iter().any(|c| c.matches(v))
        })
        .cloned()
}

fn parse_ranges(ranges: &[String]) -> Vec<Constraint> {
    ranges
        .iter()
        .filter_map(|range| match Constraint::parse(range) {
            Ok(c) => Some(c),
            Err(err) => {
                log::warn!("skipping unparseable ignore range: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Requirement;
    use crate::version::VersionRef;

    fn versions(list: &[&str]) -> Vec<Version> {
        list.iter().map(|v| Version::parse(v).unwrap()).collect()
    }

    fn strings(list: &[Version]) -> Vec<String> {
        list.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_filter_ignored_preserves_order() {
        let candidates = versions(&["1.21.0", "1.22.0", "1.22.1", "1.0.0"]);
        let filtered = filter_ignored(candidates, &[">= 1.22.0.a, < 1.23".to_string()]);
        assert_eq!(strings(&filtered), vec!["1.21.0", "1.0.0"]);
    }

    #[test]
    fn test_filter_ignored_is_subset_without_matches() {
        let candidates = versions(&["1.0.0", "1.5.0", "2.0.0", "2.5.0", "3.0.0"]);
        let ignored = vec!["^2.0".to_string(), "3.0.0".to_string()];
        let filtered = filter_ignored(candidates.clone(), &ignored);

        for v in &filtered {
            assert!(candidates.contains(v));
            for range in &ignored {
                assert!(!Constraint::parse(range).unwrap().matches(v));
            }
        }
        assert_eq!(strings(&filtered), vec!["1.0.0", "1.5.0"]);
    }

    #[test]
    fn test_is_ignored() {
        let filter = VersionFilter::new("monolog/monolog")
            .with_ignored_versions(vec!["1.21.*".to_string(), "not a range".to_string()]);
        assert!(filter.is_ignored(&Version::parse("1.21.0").unwrap()));
        assert!(!filter.is_ignored(&Version::parse("1.16.0").unwrap()));
        let unfiltered = VersionFilter::new("monolog/monolog");
        assert!(!unfiltered.is_ignored(&Version::parse("1.21.0").unwrap()));
    }

    #[test]
    fn test_filter_ignored_skips_bad_ranges() {
        let candidates = versions(&["1.0.0", "2.0.0"]);
        let filtered = filter_ignored(candidates, &["garbage".to_string(), ">= 2".to_string()]);
        assert_eq!(strings(&filtered), vec!["1.0.0"]);
    }

    #[test]
    fn test_filter_prereleases() {
        let candidates = versions(&["1.0.0", "2.0.0-beta1", "2.0.0-dev"]);
        assert_eq!(strings(&filter_prereleases(candidates.clone(), false)), vec!["1.0.0"]);
        assert_eq!(filter_prereleases(candidates, true).len(), 3);
    }

    #[test]
    fn test_wants_prerelease() {
        let stable = Dependency::new(
            "acme/pkg",
            Some(VersionRef::parse("1.0.0").unwrap()),
            vec![Requirement::new("composer.json", Some("^1.0".to_string()))],
        );
        assert!(!wants_prerelease(&stable));

        let beta = Dependency::new("acme/pkg", Some(VersionRef::parse("2.0.0-beta2").unwrap()), vec![]);
        assert!(wants_prerelease(&beta));

        let flagged = Dependency::new(
            "acme/pkg",
            None,
            vec![Requirement::new("composer.json", Some("^2.0@dev".to_string()))],
        );
        assert!(wants_prerelease(&flagged));

        let named = Dependency::new(
            "acme/pkg",
            None,
            vec![Requirement::new("composer.json", Some("2.0.0-RC1".to_string()))],
        );
        assert!(wants_prerelease(&named));
    }

    #[test]
    fn test_lowest_fix_skips_vulnerable_and_ignored() {
        let advisories = vec![SecurityAdvisory::new(
            "monolog/monolog",
            vec!["<= 1.15.0".to_string()],
            vec![],
        )];
        let candidates = versions(&["1.22.1", "1.16.0", "1.15.0", "1.17.0", "1.0.1"]);
        let current = Version::parse("1.0.1").unwrap();

        let fix = lowest_fix("monolog/monolog", &current, &candidates, &advisories, &[]);
        assert_eq!(fix.unwrap().to_string(), "1.16.0");

        let fix = lowest_fix(
            "monolog/monolog",
            &current,
            &candidates,
            &advisories,
            &["1.16.0".to_string()],
        );
        assert_eq!(fix.unwrap().to_string(), "1.17.0");
    }

    #[test]
    fn test_lowest_fix_none_when_everything_vulnerable() {
        let advisories = vec![SecurityAdvisory::new("acme/pkg", vec!["*".to_string()], vec![])];
        let candidates = versions(&["1.0.0", "2.0.0"]);
        let current = Version::parse("0.9.0").unwrap();
        assert!(lowest_fix("acme/pkg", &current, &candidates, &advisories, &[]).is_none());
    }

    #[test]
    fn test_version_filter_composes() {
        let filter = VersionFilter::new("monolog/monolog")
            .with_ignored_versions(vec!["1.22.*".to_string()])
            .with_advisories(vec![SecurityAdvisory::new(
                "monolog/monolog",
                vec!["< 1.10".to_string()],
                vec![],
            )]);

        let candidates = versions(&["1.0.0", "1.21.0", "1.22.1", "1.23.0-beta1"]);
        let kept = filter.filter_candidates(candidates);
        assert_eq!(strings(&kept), vec!["1.0.0", "1.21.0"]);
        assert_eq!(strings(&filter.filter_vulnerable(kept)), vec!["1.21.0"]);
    }
}
