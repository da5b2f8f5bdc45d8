//! Composer update checker
//!
//! Implements the `UpdateChecker` queries for one Composer dependency.
//! Every query result is cached for the lifetime of the checker; errors are
//! not cached.

use crate::checker::{
    capped_requirement, unlocked_requirement, LatestVersionFinder, UpdateChecker, VersionResolver,
};
use crate::domain::{
    classify_dependency, is_replaced, Credential, Dependency, SecurityAdvisory, Source,
    SourceKind, UpdateStrategy, UpdatedRequirements,
};
use crate::error::CheckerError;
use crate::manifest::DependencyFiles;
use crate::registry::RegistryAdapter;
use crate::resolver::{RelaxationPolicy, ResolverOracle, UnlockScope};
use crate::update::{wants_prerelease, RequirementsUpdater, VersionFilter};
use crate::version::{Version, VersionRef};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

type CachedVersion = OnceCell<Option<VersionRef>>;

/// Requirement used to ask for the newest version of an unrestricted dependency
const ANY_VERSION: &str = "*";

/// `UpdateChecker` for a dependency of a Composer project
pub struct ComposerUpdateChecker {
    dependency: Dependency,
    files: DependencyFiles,
    credentials: Vec<Credential>,
    filter: VersionFilter,
    strategy: UpdateStrategy,
    registry: Arc<dyn RegistryAdapter>,
    resolver: VersionResolver,
    candidates: OnceCell<Vec<Version>>,
    latest_version: CachedVersion,
    latest_resolvable_version: CachedVersion,
    latest_resolvable_version_with_no_unlock: CachedVersion,
    lowest_resolvable_security_fix_version: CachedVersion,
    latest_version_resolvable_with_full_unlock: CachedVersion,
}

impl ComposerUpdateChecker {
    /// Create a checker with no credentials, ignores or advisories
    pub fn new(
        dependency: Dependency,
        files: DependencyFiles,
        registry: Arc<dyn RegistryAdapter>,
        oracle: Arc<dyn ResolverOracle>,
    ) -> Self {
        let filter =
            VersionFilter::new(dependency.name.clone()).with_prereleases(wants_prerelease(&dependency));
        Self {
            dependency,
            files,
            credentials: Vec::new(),
            filter,
            strategy: UpdateStrategy::default(),
            registry,
            resolver: VersionResolver::new(oracle),
            candidates: OnceCell::new(),
            latest_version: OnceCell::new(),
            latest_resolvable_version: OnceCell::new(),
            latest_resolvable_version_with_no_unlock: OnceCell::new(),
            lowest_resolvable_security_fix_version: OnceCell::new(),
            latest_version_resolvable_with_full_unlock: OnceCell::new(),
        }
    }

    /// Set credentials for private sources
    pub fn with_credentials(mut self, credentials: Vec<Credential>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set version ranges that must never be offered
    pub fn with_ignored_versions(mut self, ignored: Vec<String>) -> Self {
        self.filter = self.filter.with_ignored_versions(ignored);
        self
    }

    /// Set known security advisories
    pub fn with_advisories(mut self, advisories: Vec<SecurityAdvisory>) -> Self {
        self.filter = self.filter.with_advisories(advisories);
        self
    }

    /// Set the requirement update strategy
    pub fn with_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replace the platform relaxation policies
    pub fn with_relaxation_policies(mut self, policies: Vec<RelaxationPolicy>) -> Self {
        self.resolver = self.resolver.with_policies(policies);
        self
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// Source kind of the dependency
    pub fn source_kind(&self) -> SourceKind {
        classify_dependency(&self.dependency)
    }

    /// Returns true for dependencies no query can say anything about
    ///
    /// Path and unrecognized sources, and packages replaced by another one.
    fn is_skipped(&self) -> bool {
        let kind = self.source_kind();
        if matches!(kind, SourceKind::Path | SourceKind::Unrecognized) {
            log::debug!("skipping {}: {} source", self.dependency.name, kind);
            return true;
        }
        if is_replaced(&self.dependency.name, &self.files) {
            log::debug!("skipping {}: replaced by another package", self.dependency.name);
            return true;
        }
        false
    }

    fn is_git(&self) -> bool {
        self.source_kind() == SourceKind::Git
    }

    fn current_release(&self) -> Option<&Version> {
        self.dependency.version.as_ref().and_then(VersionRef::as_release)
    }

    async fn candidates(&self) -> Result<&Vec<Version>, CheckerError> {
        self.candidates
            .get_or_try_init(|| async {
                LatestVersionFinder::new(
                    &self.dependency,
                    &self.files,
                    &self.credentials,
                    &self.filter,
                    self.registry.as_ref(),
                )
                .candidates()
                .await
            })
            .await
    }

    /// Requirement asking the resolver for the newest commit or tag of a git source
    ///
    /// Branch-tracking dependencies keep their requirement; tag-pinned ones
    /// accept any version.
    fn git_requirement(&self) -> Option<String> {
        let tracks_branch = self.dependency.has_commit_version()
            || self
                .dependency
                .sources()
                .any(|s| matches!(s, Source::Git { branch: Some(_), .. }));
        if tracks_branch {
            None
        } else {
            Some(ANY_VERSION.to_string())
        }
    }

    async fn resolve(
        &self,
        requirement: Option<String>,
        unlock: UnlockScope,
    ) -> Result<Option<VersionRef>, CheckerError> {
        self.resolver
            .resolve(
                &self.files,
                &self.credentials,
                &self.dependency.name,
                requirement.as_deref(),
                unlock,
            )
            .await
    }

    /// Upper cap for resolution: the latest release, when known
    async fn latest_release(&self) -> Result<Option<Version>, CheckerError> {
        Ok(self
            .latest_version()
            .await?
            .and_then(|v| v.as_release().cloned()))
    }

    /// Resolve the unlocked requirement capped at `cap`, skipping ignored releases
    ///
    /// When the resolver settles on an ignored release the cap drops to the
    /// next candidate below it and the request is re-issued. `None` once no
    /// candidate above the current version is left.
    async fn resolve_outside_ignored(
        &self,
        cap: Version,
        unlock: UnlockScope,
    ) -> Result<Option<VersionRef>, CheckerError> {
        let mut cap = cap;
        loop {
            let requirement = unlocked_requirement(&self.dependency, Some(&cap));
            let resolved = self.resolve(Some(requirement), unlock).await?;
            let Some(VersionRef::Release(version)) = &resolved else {
                return Ok(resolved);
            };
            if !self.filter.is_ignored(version) {
                return Ok(resolved);
            }

            let next = self
                .candidates()
                .await?
                .iter()
                .filter(|c| *c < version && **c < cap)
                .max()
                .cloned();
            match next {
                Some(next) if self.current_release().is_none_or(|current| next >= *current) => {
                    log::debug!(
                        "{} resolved to ignored {}, retrying up to {}",
                        self.dependency.name,
                        version,
                        next
                    );
                    cap = next;
                }
                _ => {
                    log::info!(
                        "{} only resolves to ignored version {}",
                        self.dependency.name,
                        version
                    );
                    return Ok(None);
                }
            }
        }
    }

    async fn fetch_latest_version(&self) -> Result<Option<VersionRef>, CheckerError> {
        if self.is_skipped() {
            return Ok(None);
        }
        if self.is_git() {
            return self.resolve(self.git_requirement(), UnlockScope::Dependency).await;
        }
        let latest = LatestVersionFinder::latest(self.candidates().await?);
        log::debug!(
            "latest version of {}: {}",
            self.dependency.name,
            latest.as_ref().map(ToString::to_string).unwrap_or_else(|| "none".to_string())
        );
        Ok(latest.map(VersionRef::from))
    }

    async fn fetch_latest_resolvable_version(&self) -> Result<Option<VersionRef>, CheckerError> {
        if self.is_skipped() {
            return Ok(None);
        }
        if self.is_git() {
            return self.latest_version().await;
        }
        let Some(latest) = self.latest_release().await? else {
            return Ok(None);
        };
        self.resolve_outside_ignored(latest, UnlockScope::Dependency).await
    }

    async fn fetch_latest_resolvable_version_with_no_unlock(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError> {
        if self.is_skipped() || !self.files.has_lockfile() {
            return Ok(None);
        }
        if self.is_git() {
            return self.resolve(None, UnlockScope::Dependency).await;
        }
        let latest = self.latest_release().await?;
        let requirement = capped_requirement(&self.dependency, latest.as_ref());
        self.resolve(requirement, UnlockScope::Dependency).await
    }

    async fn fetch_lowest_resolvable_security_fix_version(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError> {
        if self.is_skipped() {
            return Ok(None);
        }
        if !self.is_vulnerable() {
            return self.latest_resolvable_version().await;
        }
        let Some(current) = self.current_release().cloned() else {
            return Ok(None);
        };

        let candidates = self.candidates().await?;
        let finder = LatestVersionFinder::new(
            &self.dependency,
            &self.files,
            &self.credentials,
            &self.filter,
            self.registry.as_ref(),
        );
        let Some(lowest_fix) = finder.lowest_security_fix(&current, candidates) else {
            return Ok(None);
        };

        let fixes = self
            .filter
            .filter_vulnerable(candidates.iter().filter(|v| **v >= lowest_fix).cloned().collect());
        for candidate in fixes {
            let requirement = unlocked_requirement(&self.dependency, Some(&candidate));
            let resolved = self.resolve(Some(requirement), UnlockScope::Dependency).await?;
            if let Some(VersionRef::Release(version)) = &resolved {
                if *version > current
                    && !self.filter.is_vulnerable(version)
                    && !self.filter.is_ignored(version)
                {
                    log::info!("{} can be fixed by moving to {}", self.dependency.name, version);
                    return Ok(resolved);
                }
            }
            log::debug!("security fix {} for {} does not resolve", candidate, self.dependency.name);
        }
        Ok(None)
    }

    async fn fetch_latest_version_resolvable_with_full_unlock(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError> {
        if self.is_skipped() {
            return Ok(None);
        }
        if self.is_git() {
            return self.resolve(self.git_requirement(), UnlockScope::All).await;
        }
        let Some(latest) = self.latest_release().await? else {
            return Ok(None);
        };
        self.resolve_outside_ignored(latest, UnlockScope::All).await
    }
}

#[async_trait]
impl UpdateChecker for ComposerUpdateChecker {
    fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    fn is_vulnerable(&self) -> bool {
        self.current_release()
            .is_some_and(|current| self.filter.is_vulnerable(current))
    }

    fn updated_requirements(&self, target: Option<&VersionRef>) -> UpdatedRequirements {
        RequirementsUpdater::new(
            self.dependency.requirements.clone(),
            target.cloned(),
            self.strategy,
        )
        .updated_requirements()
    }

    async fn latest_version(&self) -> Result<Option<VersionRef>, CheckerError> {
        self.latest_version
            .get_or_try_init(|| self.fetch_latest_version())
            .await
            .cloned()
    }

    async fn latest_resolvable_version(&self) -> Result<Option<VersionRef>, CheckerError> {
        self.latest_resolvable_version
            .get_or_try_init(|| self.fetch_latest_resolvable_version())
            .await
            .cloned()
    }

    async fn latest_resolvable_version_with_no_unlock(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError> {
        self.latest_resolvable_version_with_no_unlock
            .get_or_try_init(|| self.fetch_latest_resolvable_version_with_no_unlock())
            .await
            .cloned()
    }

    async fn lowest_resolvable_security_fix_version(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError> {
        self.lowest_resolvable_security_fix_version
            .get_or_try_init(|| self.fetch_lowest_resolvable_security_fix_version())
            .await
            .cloned()
    }

    async fn latest_version_resolvable_with_full_unlock(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError> {
        self.latest_version_resolvable_with_full_unlock
            .get_or_try_init(|| self.fetch_latest_version_resolvable_with_full_unlock())
            .await
            .cloned()
    }
}
