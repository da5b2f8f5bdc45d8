//! Latest version lookup for registry dependencies
//!
//! Fetches every published version from the repositories the manifest
//! uses, then narrows them down with the dependency's `VersionFilter`.

use crate::domain::{Credential, Dependency};
use crate::error::{CheckerError, RegistryError};
use crate::manifest::DependencyFiles;
use crate::registry::{RegistryAdapter, RegistrySet};
use crate::update::VersionFilter;
use crate::version::Version;

/// Registry-backed candidate lookup for one dependency
pub struct LatestVersionFinder<'a> {
    dependency: &'a Dependency,
    files: &'a DependencyFiles,
    credentials: &'a [Credential],
    filter: &'a VersionFilter,
    registry: &'a dyn RegistryAdapter,
}

impl<'a> LatestVersionFinder<'a> {
    pub fn new(
        dependency: &'a Dependency,
        files: &'a DependencyFiles,
        credentials: &'a [Credential],
        filter: &'a VersionFilter,
        registry: &'a dyn RegistryAdapter,
    ) -> Self {
        Self {
            dependency,
            files,
            credentials,
            filter,
            registry,
        }
    }

    /// Acceptable versions in ascending order
    ///
    /// Prereleases (unless wanted) and ignored versions are removed. A
    /// package no repository knows yields an empty list.
    pub async fn candidates(&self) -> Result<Vec<Version>, CheckerError> {
        let registries = RegistrySet::from_manifest(self.files.composer_json());
        let fetched = match self
            .registry
            .fetch_versions(&self.dependency.name, &registries, self.credentials)
            .await
        {
            Ok(versions) => versions,
            Err(RegistryError::PackageNotFound { .. }) => {
                log::info!(
                    "{} not found in {}",
                    self.dependency.name,
                    registries.urls().join(", ")
                );
                return Ok(Vec::new());
            }
            Err(RegistryError::AuthenticationError { registry, .. }) => {
                return Err(CheckerError::auth_failure(registry));
            }
            Err(e) => return Err(e.into()),
        };

        let mut versions: Vec<Version> = fetched.into_iter().map(|info| info.version).collect();
        versions.sort();
        versions.dedup();
        let total = versions.len();

        let candidates = self.filter.filter_candidates(versions);
        log::debug!(
            "{}: {} of {} published versions are candidates",
            self.dependency.name,
            candidates.len(),
            total
        );
        Ok(candidates)
    }

    /// Highest candidate
    pub fn latest(candidates: &[Version]) -> Option<Version> {
        candidates.iter().max().cloned()
    }

    /// Lowest candidate above `current` that fixes every advisory
    pub fn lowest_security_fix(&self, current: &Version, candidates: &[Version]) -> Option<Version> {
        let fix = self.filter.lowest_fix(current, candidates);
        if fix.is_none() {
            log::info!("no security fix for {} above {}", self.dependency.name, current);
        }
        fix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SecurityAdvisory;
    use crate::update::VersionInfo;
    use async_trait::async_trait;

    struct StaticRegistry {
        versions: Vec<&'static str>,
    }

    #[async_trait]
    impl RegistryAdapter for StaticRegistry {
        fn registry_name(&self) -> &'static str {
            "static"
        }

        async fn fetch_versions(
            &self,
            package: &str,
            _registries: &RegistrySet,
            _credentials: &[Credential],
        ) -> Result<Vec<crate::update::VersionInfo>, RegistryError> {
            if self.versions.is_empty() {
                return Err(RegistryError::package_not_found(package, "static"));
            }
            Ok(self
                .versions
                .iter()
                .filter_map(|v| VersionInfo::parse(v, None))
                .collect())
        }
    }

    struct DenyingRegistry;

    #[async_trait]
    impl RegistryAdapter for DenyingRegistry {
        fn registry_name(&self) -> &'static str {
            "denying"
        }

        async fn fetch_versions(
            &self,
            _package: &str,
            _registries: &RegistrySet,
            _credentials: &[Credential],
        ) -> Result<Vec<VersionInfo>, RegistryError> {
            Err(RegistryError::authentication_error("php.fury.io", "HTTP 401"))
        }
    }

    fn files() -> DependencyFiles {
        DependencyFiles::new(r#"{"require": {"monolog/monolog": "1.0.*"}}"#, None).unwrap()
    }

    fn dependency() -> Dependency {
        Dependency::new("monolog/monolog", None, Vec::new())
    }

    fn names(versions: &[Version]) -> Vec<String> {
        versions.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_candidates_sorted_and_filtered() {
        let registry = StaticRegistry {
            versions: vec!["1.22.1", "1.0.0", "1.22.0", "2.0.0-beta1", "1.21.0", "1.22.1"],
        };
        let filter = VersionFilter::new("monolog/monolog")
            .with_ignored_versions(vec![">= 1.22.0.a, < 1.23".to_string()]);
        let (dep, files) = (dependency(), files());
        let finder = LatestVersionFinder::new(&dep, &files, &[], &filter, &registry);

        let candidates = finder.candidates().await.unwrap();
        assert_eq!(names(&candidates), vec!["1.0.0", "1.21.0"]);
        assert_eq!(
            LatestVersionFinder::latest(&candidates).unwrap().to_string(),
            "1.21.0"
        );
    }

    #[tokio::test]
    async fn test_unknown_package_has_no_candidates() {
        let registry = StaticRegistry { versions: vec![] };
        let filter = VersionFilter::new("monolog/monolog");
        let (dep, files) = (dependency(), files());
        let finder = LatestVersionFinder::new(&dep, &files, &[], &filter, &registry);
        assert!(finder.candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authentication_error_names_host() {
        let filter = VersionFilter::new("monolog/monolog");
        let (dep, files) = (dependency(), files());
        let finder = LatestVersionFinder::new(&dep, &files, &[], &filter, &DenyingRegistry);
        match finder.candidates().await.unwrap_err() {
            CheckerError::PrivateSourceAuthFailure { host } => assert_eq!(host, "php.fury.io"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_lowest_security_fix() {
        let filter = VersionFilter::new("monolog/monolog").with_advisories(vec![
            SecurityAdvisory::new("monolog/monolog", vec!["<= 1.15.0".to_string()], vec![]),
        ]);
        let (dep, files) = (dependency(), files());
        let registry = StaticRegistry { versions: vec![] };
        let finder = LatestVersionFinder::new(&dep, &files, &[], &filter, &registry);

        let candidates: Vec<Version> = ["1.0.1", "1.15.0", "1.16.0", "1.22.1"]
            .iter()
            .map(|v| Version::parse(v).unwrap())
            .collect();
        let current = Version::parse("1.0.1").unwrap();
        assert_eq!(
            finder.lowest_security_fix(&current, &candidates).unwrap().to_string(),
            "1.16.0"
        );
    }
}
