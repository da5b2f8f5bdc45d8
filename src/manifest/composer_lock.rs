//! composer.lock view

use serde::Deserialize;
use std::collections::BTreeMap;

/// Typed subset of composer.lock
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerLock {
    #[serde(default)]
    pub packages: Option<Vec<LockedPackage>>,
    #[serde(default, rename = "packages-dev")]
    pub packages_dev: Option<Vec<LockedPackage>>,
}

/// One locked package
#[derive(Debug, Clone, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub source: Option<PackageSource>,
    #[serde(default)]
    pub dist: Option<PackageSource>,
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
}

/// `source` or `dist` entry of a locked package
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl ComposerLock {
    /// Runtime packages followed by development packages
    pub fn all_packages(&self) -> impl Iterator<Item = &LockedPackage> {
        self.packages
            .iter()
            .flatten()
            .chain(self.packages_dev.iter().flatten())
    }

    /// Locked entry for `name`
    pub fn package(&self, name: &str) -> Option<&LockedPackage> {
        self.all_packages()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl LockedPackage {
    /// Returns true when the package was installed from a branch (`dev-master`, `1.x-dev`)
    pub fn is_branch(&self) -> bool {
        let version = self.version.to_ascii_lowercase();
        version.starts_with("dev-") || version.ends_with("-dev")
    }

    /// Git commit the package is locked to
    pub fn reference(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.reference.as_deref())
            .or_else(|| self.dist.as_ref().and_then(|d| d.reference.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r#"{
        "packages": [
            {
                "name": "monolog/monolog",
                "version": "1.0.1",
                "source": {"type": "git", "url": "https://github.com/Seldaek/monolog.git", "reference": "303b8a83c87d5c6d749926cf02620465a5dcd0f2"},
                "dist": {"type": "zip", "url": "https://api.github.com/repos/Seldaek/monolog/zipball/303b8a8", "reference": "303b8a83c87d5c6d749926cf02620465a5dcd0f2"},
                "require": {"php": ">=5.3.0"}
            },
            {
                "name": "acme/local",
                "version": "dev-master",
                "dist": {"type": "path", "url": "../local", "reference": "abc"}
            }
        ],
        "packages-dev": null
    }"#;

    #[test]
    fn test_parse_lockfile() {
        let lock: ComposerLock = serde_json::from_str(LOCK).unwrap();
        assert_eq!(lock.all_packages().count(), 2);

        let monolog = lock.package("monolog/monolog").unwrap();
        assert_eq!(monolog.version, "1.0.1");
        assert!(!monolog.is_branch());
        assert_eq!(
            monolog.reference(),
            Some("303b8a83c87d5c6d749926cf02620465a5dcd0f2")
        );
        assert_eq!(monolog.require.get("php").map(String::as_str), Some(">=5.3.0"));
    }

    #[test]
    fn test_branch_detection() {
        let lock: ComposerLock = serde_json::from_str(LOCK).unwrap();
        let local = lock.package("acme/local").unwrap();
        assert!(local.is_branch());
        assert_eq!(local.dist.as_ref().map(|d| d.kind.as_str()), Some("path"));
    }

    #[test]
    fn test_missing_sections_default() {
        let lock: ComposerLock = serde_json::from_str("{}").unwrap();
        assert_eq!(lock.all_packages().count(), 0);
        assert!(lock.package("acme/pkg").is_none());
    }
}
