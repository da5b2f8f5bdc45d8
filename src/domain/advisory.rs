//! Security advisories

use super::dependency::COMPOSER;
use crate::version::{Constraint, Version};
use serde::{Deserialize, Serialize};

/// A published advisory for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAdvisory {
    pub dependency_name: String,
    #[serde(default = "default_package_manager")]
    pub package_manager: String,
    /// Constraint strings describing affected versions
    #[serde(default)]
    pub vulnerable_versions: Vec<String>,
    /// Constraint strings describing fixed versions
    #[serde(default)]
    pub safe_versions: Vec<String>,
}

fn default_package_manager() -> String {
    COMPOSER.to_string()
}

impl SecurityAdvisory {
    pub fn new(
        dependency_name: impl Into<String>,
        vulnerable_versions: Vec<String>,
        safe_versions: Vec<String>,
    ) -> Self {
        Self {
            dependency_name: dependency_name.into(),
            package_manager: default_package_manager(),
            vulnerable_versions,
            safe_versions,
        }
    }

    /// Returns true if this advisory concerns the Composer package `name`
    pub fn affects(&self, name: &str) -> bool {
        self.package_manager == COMPOSER && self.dependency_name.eq_ignore_ascii_case(name)
    }

    /// Returns true if `version` is covered by this advisory
    ///
    /// Vulnerable ranges win when present; otherwise a version is vulnerable
    /// when safe ranges exist and none of them matches.
    pub fn is_vulnerable(&self, version: &Version) -> bool {
        if !self.vulnerable_versions.is_empty() {
            return any_matches(&self.vulnerable_versions, version);
        }
        if !self.safe_versions.is_empty() {
            return !any_matches(&self.safe_versions, version);
        }
        false
    }
}

fn any_matches(ranges: &[String], version: &Version) -> bool {
    ranges.iter().any(|range| match Constraint::parse(range) {
        Ok(constraint) => constraint.matches(version),
        Err(err) => {
            log::warn!("skipping unparseable advisory range: {}", err);
            false
        }
    })
}

/// Returns true if any applicable advisory in `advisories` flags `version` of `name`
pub fn is_vulnerable(name: &str, version: &Version, advisories: &[SecurityAdvisory]) -> bool {
    advisories
        .iter()
        .filter(|a| a.affects(name))
        .any(|a| a.is_vulnerable(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_vulnerable_ranges() {
        let advisory = SecurityAdvisory::new("monolog/monolog", vec!["<= 1.15.0".to_string()], vec![]);
        assert!(advisory.is_vulnerable(&v("1.0.1")));
        assert!(advisory.is_vulnerable(&v("1.15.0")));
        assert!(!advisory.is_vulnerable(&v("1.16.0")));
    }

    #[test]
    fn test_safe_ranges_only() {
        let advisory = SecurityAdvisory::new("monolog/monolog", vec![], vec![">= 1.16.0".to_string()]);
        assert!(advisory.is_vulnerable(&v("1.15.0")));
        assert!(!advisory.is_vulnerable(&v("1.16.0")));
    }

    #[test]
    fn test_vulnerable_ranges_take_precedence_over_safe() {
        let advisory = SecurityAdvisory::new(
            "monolog/monolog",
            vec!["< 1.10.0".to_string()],
            vec![">= 2.0.0".to_string()],
        );
        // Not in vulnerable, not in safe: only vulnerable ranges count
        assert!(!advisory.is_vulnerable(&v("1.12.0")));
    }

    #[test]
    fn test_empty_advisory_never_vulnerable() {
        let advisory = SecurityAdvisory::new("monolog/monolog", vec![], vec![]);
        assert!(!advisory.is_vulnerable(&v("0.0.1")));
    }

    #[test]
    fn test_is_vulnerable_filters_by_name_and_manager() {
        let mut npm = SecurityAdvisory::new("monolog/monolog", vec!["*".to_string()], vec![]);
        npm.package_manager = "npm_and_yarn".to_string();
        let other = SecurityAdvisory::new("acme/other", vec!["*".to_string()], vec![]);
        assert!(!is_vulnerable("monolog/monolog", &v("1.0.0"), &[npm, other]));

        let applicable = SecurityAdvisory::new("Monolog/Monolog", vec!["< 2.0".to_string()], vec![]);
        assert!(is_vulnerable("monolog/monolog", &v("1.0.0"), &[applicable]));
    }

    #[test]
    fn test_unparseable_range_is_skipped() {
        let advisory = SecurityAdvisory::new(
            "monolog/monolog",
            vec!["not a range".to_string(), "< 1.5".to_string()],
            vec![],
        );
        assert!(advisory.is_vulnerable(&v("1.0.0")));
        assert!(!advisory.is_vulnerable(&v("1.6.0")));
    }
}
