//! Update checking
//!
//! This module provides:
//! - The `UpdateChecker` trait: per-dependency queries plus the update
//!   decision written once on top of them
//! - `ComposerUpdateChecker`, the Composer implementation
//! - Latest-version lookup and resolution helpers it is built from
//!
//! The decision logic reads in three steps:
//! 1. `is_up_to_date` compares the current version with the latest one
//! 2. `can_update` checks one unlock level (none, own, all)
//! 3. `updated_dependencies` builds the updated `Dependency` for that level

mod composer;
mod latest_version_finder;
mod version_resolver;

pub use composer::ComposerUpdateChecker;
pub use latest_version_finder::LatestVersionFinder;
pub use version_resolver::{capped_requirement, lower_bound, unlocked_requirement, VersionResolver};

use crate::domain::{Dependency, RequirementsToUnlock, UpdateDecision, UpdatedRequirements};
use crate::error::CheckerError;
use crate::version::VersionRef;
use async_trait::async_trait;

/// Returns true when `candidate` is an upgrade over `current`
///
/// Requirement-only dependencies (no current version) accept any candidate.
fn is_newer(candidate: &VersionRef, current: Option<&VersionRef>) -> bool {
    match current {
        Some(current) => candidate.is_newer_than(current),
        None => true,
    }
}

/// Update queries for a single dependency
///
/// Implementors answer the version queries; the decision methods are
/// provided. Queries that find nothing return `Ok(None)`, errors are fatal.
#[async_trait]
pub trait UpdateChecker: Send + Sync {
    /// The dependency being checked
    fn dependency(&self) -> &Dependency;

    /// Returns true if the current version is affected by an advisory
    fn is_vulnerable(&self) -> bool;

    /// Declared requirements rewritten to admit `target`
    fn updated_requirements(&self, target: Option<&VersionRef>) -> UpdatedRequirements;

    /// Newest acceptable version, ignoring the rest of the dependency graph
    async fn latest_version(&self) -> Result<Option<VersionRef>, CheckerError>;

    /// Newest version that resolves when the requirement may move
    async fn latest_resolvable_version(&self) -> Result<Option<VersionRef>, CheckerError>;

    /// Newest version that resolves within the existing requirement
    async fn latest_resolvable_version_with_no_unlock(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError>;

    /// Lowest resolvable version that is not vulnerable
    async fn lowest_resolvable_security_fix_version(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError>;

    /// Newest version that resolves when every dependency may move
    async fn latest_version_resolvable_with_full_unlock(
        &self,
    ) -> Result<Option<VersionRef>, CheckerError>;

    /// Security fix when vulnerable, newest resolvable version otherwise
    ///
    /// Neither query returns a release in an ignored range.
    async fn preferred_resolvable_version(&self) -> Result<Option<VersionRef>, CheckerError> {
        if self.is_vulnerable() {
            self.lowest_resolvable_security_fix_version().await
        } else {
            self.latest_resolvable_version().await
        }
    }

    /// Returns true when no newer version is available
    ///
    /// Never consults the resolver for release versions.
    async fn is_up_to_date(&self) -> Result<bool, CheckerError> {
        let dependency = self.dependency();
        match &dependency.version {
            Some(VersionRef::Commit(current)) => {
                if let Some(VersionRef::Commit(latest)) = self.latest_version().await? {
                    if latest.matches(current) {
                        return Ok(true);
                    }
                }
                Ok(matches!(
                    self.latest_resolvable_version().await?,
                    Some(VersionRef::Commit(resolvable)) if resolvable.matches(current)
                ))
            }
            Some(VersionRef::Release(current)) => Ok(matches!(
                self.latest_version().await?,
                Some(VersionRef::Release(latest)) if latest <= *current
            )),
            None => {
                let Some(latest) = self.latest_version().await? else {
                    return Ok(false);
                };
                Ok(matches!(
                    self.updated_requirements(Some(&latest)),
                    UpdatedRequirements::Updated(reqs) if reqs == dependency.requirements
                ))
            }
        }
    }

    /// Returns true if the dependency can be updated at `unlock`
    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, CheckerError> {
        if self.is_up_to_date().await? {
            return Ok(false);
        }
        let dependency = self.dependency();
        let current = dependency.version.as_ref();

        match unlock {
            RequirementsToUnlock::None => {
                let Some(current) = current else {
                    return Ok(false);
                };
                Ok(self
                    .latest_resolvable_version_with_no_unlock()
                    .await?
                    .is_some_and(|v| v.is_newer_than(current)))
            }
            RequirementsToUnlock::Own => {
                let Some(preferred) = self.preferred_resolvable_version().await? else {
                    return Ok(false);
                };
                if !is_newer(&preferred, current) {
                    return Ok(false);
                }
                match self.updated_requirements(Some(&preferred)) {
                    UpdatedRequirements::Unfixable => Ok(false),
                    UpdatedRequirements::Updated(reqs) => {
                        Ok(current.is_some() || reqs != dependency.requirements)
                    }
                }
            }
            RequirementsToUnlock::All => Ok(self.all_unlock_version().await?.is_some()),
        }
    }

    /// Version reachable when every requirement may change, if it is an upgrade
    async fn all_unlock_version(&self) -> Result<Option<VersionRef>, CheckerError> {
        let current = self.dependency().version.clone();
        if let Some(version) = self.latest_resolvable_version().await? {
            if is_newer(&version, current.as_ref()) {
                return Ok(Some(version));
            }
        }
        Ok(self
            .latest_version_resolvable_with_full_unlock()
            .await?
            .filter(|v| is_newer(v, current.as_ref())))
    }

    /// The updated dependency for `unlock`, or nothing when it cannot update
    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<Dependency>, CheckerError> {
        if !self.can_update(unlock).await? {
            return Ok(Vec::new());
        }
        let dependency = self.dependency();

        let (version, requirements) = match unlock {
            RequirementsToUnlock::None => (
                self.latest_resolvable_version_with_no_unlock().await?,
                Some(dependency.requirements.clone()),
            ),
            RequirementsToUnlock::Own => {
                let version = self.preferred_resolvable_version().await?;
                let requirements = self
                    .updated_requirements(version.as_ref())
                    .requirements()
                    .map(<[_]>::to_vec);
                (version, requirements)
            }
            RequirementsToUnlock::All => {
                let version = self.all_unlock_version().await?;
                let requirements = self
                    .updated_requirements(version.as_ref())
                    .requirements()
                    .map(<[_]>::to_vec);
                (version, requirements)
            }
        };

        match (version, requirements) {
            (Some(version), Some(requirements)) => {
                log::info!("{} can move to {} ({} unlock)", dependency.name, version, unlock);
                Ok(vec![dependency.updated(Some(version), requirements)])
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Up to date, updatable at the lowest sufficient unlock level, or stuck
    async fn decide(&self) -> Result<UpdateDecision, CheckerError> {
        if self.is_up_to_date().await? {
            return Ok(UpdateDecision::UpToDate);
        }
        for level in RequirementsToUnlock::ALL_LEVELS {
            if self.can_update(level).await? {
                return Ok(UpdateDecision::CanUpdate(level));
            }
        }
        Ok(UpdateDecision::CannotUpdate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Requirement, UpdateStrategy};
    use crate::update::RequirementsUpdater;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Checker with fixed answers, counting resolver-backed queries
    struct FixedChecker {
        dependency: Dependency,
        latest: Option<VersionRef>,
        resolvable: Option<VersionRef>,
        no_unlock: Option<VersionRef>,
        full_unlock: Option<VersionRef>,
        security_fix: Option<VersionRef>,
        vulnerable: bool,
        resolver_calls: AtomicUsize,
    }

    impl FixedChecker {
        fn new(current: Option<&str>, requirement: &str) -> Self {
            Self {
                dependency: Dependency::new(
                    "monolog/monolog",
                    current.map(|v| VersionRef::parse(v).unwrap()),
                    vec![Requirement::new("composer.json", Some(requirement.to_string()))
                        .with_groups(&["runtime"])],
                ),
                latest: None,
                resolvable: None,
                no_unlock: None,
                full_unlock: None,
                security_fix: None,
                vulnerable: false,
                resolver_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.resolver_calls.load(Ordering::SeqCst)
        }

        fn answer(&self, value: &Option<VersionRef>) -> Result<Option<VersionRef>, CheckerError> {
            self.resolver_calls.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }
    }

    fn v(raw: &str) -> Option<VersionRef> {
        Some(VersionRef::parse(raw).unwrap())
    }

    #[async_trait]
    impl UpdateChecker for FixedChecker {
        fn dependency(&self) -> &Dependency {
            &self.dependency
        }

        fn is_vulnerable(&self) -> bool {
            self.vulnerable
        }

        fn updated_requirements(&self, target: Option<&VersionRef>) -> UpdatedRequirements {
            RequirementsUpdater::new(
                self.dependency.requirements.clone(),
                target.cloned(),
                UpdateStrategy::BumpVersionsIfNecessary,
            )
            .updated_requirements()
        }

        async fn latest_version(&self) -> Result<Option<VersionRef>, CheckerError> {
            Ok(self.latest.clone())
        }

        async fn latest_resolvable_version(&self) -> Result<Option<VersionRef>, CheckerError> {
            self.answer(&self.resolvable)
        }

        async fn latest_resolvable_version_with_no_unlock(
            &self,
        ) -> Result<Option<VersionRef>, CheckerError> {
            self.answer(&self.no_unlock)
        }

        async fn lowest_resolvable_security_fix_version(
            &self,
        ) -> Result<Option<VersionRef>, CheckerError> {
            self.answer(&self.security_fix)
        }

        async fn latest_version_resolvable_with_full_unlock(
            &self,
        ) -> Result<Option<VersionRef>, CheckerError> {
            self.answer(&self.full_unlock)
        }
    }

    #[tokio::test]
    async fn test_up_to_date_without_resolver() {
        let mut checker = FixedChecker::new(Some("1.22.1"), "^1.0");
        checker.latest = v("1.22.1");
        assert!(checker.is_up_to_date().await.unwrap());
        assert!(!checker.can_update(RequirementsToUnlock::Own).await.unwrap());
        assert_eq!(checker.decide().await.unwrap(), UpdateDecision::UpToDate);
        assert_eq!(checker.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_latest_is_not_up_to_date() {
        let checker = FixedChecker::new(Some("1.0.1"), "1.0.*");
        assert!(!checker.is_up_to_date().await.unwrap());
        assert_eq!(checker.decide().await.unwrap(), UpdateDecision::CannotUpdate);
    }

    #[tokio::test]
    async fn test_commit_prefix_match_is_up_to_date() {
        let mut checker = FixedChecker::new(Some("5267b03b1e4861c4657ede17a88f13ef479db482"), "dev-main");
        checker.latest = Some(VersionRef::Commit(
            crate::version::CommitSha::parse("5267b03").unwrap(),
        ));
        assert!(checker.is_up_to_date().await.unwrap());
        assert_eq!(checker.calls(), 0);
    }

    #[tokio::test]
    async fn test_commit_falls_back_to_resolvable() {
        let mut checker = FixedChecker::new(Some("5267b03b1e4861c4657ede17a88f13ef479db482"), "dev-main");
        checker.latest = v("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        checker.resolvable = v("5267b03b1e4861c4657ede17a88f13ef479db482");
        assert!(checker.is_up_to_date().await.unwrap());
        assert_eq!(checker.calls(), 1);
    }

    #[tokio::test]
    async fn test_can_update_without_unlock() {
        let mut checker = FixedChecker::new(Some("1.0.1"), "1.0.*");
        checker.latest = v("1.22.1");
        checker.no_unlock = v("1.0.2");
        checker.resolvable = v("1.22.1");

        assert!(checker.can_update(RequirementsToUnlock::None).await.unwrap());
        let updated = checker
            .updated_dependencies(RequirementsToUnlock::None)
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].version, v("1.0.2"));
        assert_eq!(updated[0].requirements, checker.dependency.requirements);
        assert_eq!(updated[0].previous_version, v("1.0.1"));
        assert_eq!(
            checker.decide().await.unwrap(),
            UpdateDecision::CanUpdate(RequirementsToUnlock::None)
        );
    }

    #[tokio::test]
    async fn test_own_unlock_rewrites_requirement() {
        let mut checker = FixedChecker::new(Some("1.0.1"), "1.0.*");
        checker.latest = v("1.22.1");
        checker.resolvable = v("1.22.1");

        assert!(!checker.can_update(RequirementsToUnlock::None).await.unwrap());
        let updated = checker
            .updated_dependencies(RequirementsToUnlock::Own)
            .await
            .unwrap();
        assert_eq!(updated[0].version, v("1.22.1"));
        assert_eq!(updated[0].requirements[0].requirement.as_deref(), Some("1.22.*"));
        assert_eq!(
            updated[0].previous_requirements.as_ref().unwrap()[0]
                .requirement
                .as_deref(),
            Some("1.0.*")
        );
    }

    #[tokio::test]
    async fn test_own_unlock_prefers_security_fix_when_vulnerable() {
        let mut checker = FixedChecker::new(Some("1.0.1"), "^1.0");
        checker.latest = v("1.22.1");
        checker.resolvable = v("1.22.1");
        checker.security_fix = v("1.16.0");
        checker.vulnerable = true;

        let updated = checker
            .updated_dependencies(RequirementsToUnlock::Own)
            .await
            .unwrap();
        assert_eq!(updated[0].version, v("1.16.0"));
    }

    #[tokio::test]
    async fn test_all_unlock_uses_full_unlock() {
        let mut checker = FixedChecker::new(Some("1.0.1"), "1.0.*");
        checker.latest = v("2.0.0");
        checker.full_unlock = v("2.0.0");

        assert!(!checker.can_update(RequirementsToUnlock::Own).await.unwrap());
        assert!(checker.can_update(RequirementsToUnlock::All).await.unwrap());
        let updated = checker
            .updated_dependencies(RequirementsToUnlock::All)
            .await
            .unwrap();
        assert_eq!(updated[0].version, v("2.0.0"));
        assert_eq!(updated[0].requirements[0].requirement.as_deref(), Some("2.0.*"));
    }

    #[tokio::test]
    async fn test_cannot_update() {
        let mut checker = FixedChecker::new(Some("1.0.1"), "1.0.*");
        checker.latest = v("1.22.1");
        assert_eq!(checker.decide().await.unwrap(), UpdateDecision::CannotUpdate);
        assert!(checker
            .updated_dependencies(RequirementsToUnlock::All)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_requirement_only_dependency() {
        let mut checker = FixedChecker::new(None, "^1.0");
        checker.latest = v("1.22.1");
        // ^1.0 already admits 1.22.1
        assert!(checker.is_up_to_date().await.unwrap());

        let mut outdated = FixedChecker::new(None, "^1.0");
        outdated.latest = v("2.1.0");
        outdated.resolvable = v("2.1.0");
        assert!(!outdated.is_up_to_date().await.unwrap());
        assert!(!outdated.can_update(RequirementsToUnlock::None).await.unwrap());
        let updated = outdated
            .updated_dependencies(RequirementsToUnlock::Own)
            .await
            .unwrap();
        assert_eq!(updated[0].requirements[0].requirement.as_deref(), Some("^2.1"));
    }

    #[test]
    fn test_is_newer() {
        let current = VersionRef::parse("1.0.0").unwrap();
        assert!(is_newer(&VersionRef::parse("1.0.1").unwrap(), Some(&current)));
        assert!(!is_newer(&current, Some(&current)));
        assert!(is_newer(&current, None));
    }
}
