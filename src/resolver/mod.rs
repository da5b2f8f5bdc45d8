//! Resolver oracle boundary
//!
//! This module provides:
//! - The `ResolverOracle` trait the checker drives
//! - Request, resolution and failure types exchanged with it
//! - Platform relaxation policies applied before resolving
//! - `ComposerProcessResolver`, which runs the composer binary

mod composer;
mod relaxation;

pub use composer::{classify_failure, ComposerProcessResolver};
pub use relaxation::{
    default_policies, RelaxationPolicy, KNOWN_PHP_VERSIONS, MAX_PLATFORM_RELAXATIONS,
};

use crate::domain::Credential;
use crate::version::{CommitSha, VersionRef};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// Which locked packages may move during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockScope {
    /// The dependency and its own dependencies
    Dependency,
    /// Every package in the lockfile
    All,
}

/// One resolution attempt
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// composer.json content, already carrying the requirement under test
    pub manifest: String,
    /// composer.lock content
    pub lockfile: Option<String>,
    /// Package whose resolved version is wanted
    pub dependency_name: String,
    pub credentials: Vec<Credential>,
    /// Entries merged into `config.platform`
    pub platform_overrides: BTreeMap<String, String>,
    pub unlock: UnlockScope,
}

impl ResolveRequest {
    pub fn new(
        manifest: impl Into<String>,
        lockfile: Option<String>,
        dependency_name: impl Into<String>,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            lockfile,
            dependency_name: dependency_name.into(),
            credentials: Vec::new(),
            platform_overrides: BTreeMap::new(),
            unlock: UnlockScope::Dependency,
        }
    }

    pub fn with_credentials(mut self, credentials: Vec<Credential>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_platform_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.platform_overrides = overrides;
        self
    }

    pub fn with_unlock(mut self, unlock: UnlockScope) -> Self {
        self.unlock = unlock;
        self
    }
}

/// Outcome of a successful resolution, as locked by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Locked version string (`1.22.1`, `dev-main`, `1.x-dev`)
    pub version: String,
    /// Locked source reference
    pub reference: Option<String>,
}

impl Resolution {
    pub fn new(version: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            version: version.into(),
            reference,
        }
    }

    /// Returns true when a branch was locked rather than a release
    pub fn is_branch(&self) -> bool {
        let version = self.version.to_ascii_lowercase();
        version.starts_with("dev-") || version.ends_with("-dev")
    }

    /// The resolved version; branches resolve to their commit
    pub fn version_ref(&self) -> Option<VersionRef> {
        if self.is_branch() {
            return self
                .reference
                .as_deref()
                .and_then(|r| CommitSha::parse(r).ok())
                .map(VersionRef::Commit);
        }
        VersionRef::parse(&self.version).ok()
    }
}

/// Why a resolution attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The requirements cannot be satisfied together
    Conflict,
    /// A platform package (`ext-*`, `lib-*`) is missing
    MissingPlatformRequirement { name: String },
    /// A git remote or dist URL could not be fetched
    UnreachableSource { urls: Vec<String> },
    /// A private source rejected the credentials
    AuthenticationFailure { host: String },
    /// A private source did not answer in time
    TimedOut { url: String },
    Other,
}

/// A failed resolution with the resolver's own output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl ResolutionFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn other(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::Other, detail)
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Conflict => write!(f, "requirements conflict: {}", self.detail),
            FailureReason::MissingPlatformRequirement { name } => {
                write!(f, "missing platform requirement {}", name)
            }
            FailureReason::UnreachableSource { urls } => {
                write!(f, "unreachable source(s): {}", urls.join(", "))
            }
            FailureReason::AuthenticationFailure { host } => {
                write!(f, "authentication failed for {}", host)
            }
            FailureReason::TimedOut { url } => write!(f, "timed out fetching {}", url),
            FailureReason::Other => write!(f, "{}", self.detail),
        }
    }
}

/// Resolves a manifest/lockfile pair and reports the version chosen for one package
#[async_trait]
pub trait ResolverOracle: Send + Sync {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolutionFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_release_version() {
        let resolution = Resolution::new("v1.22.1", None);
        assert!(!resolution.is_branch());
        assert_eq!(resolution.version_ref().unwrap().to_string(), "1.22.1");
    }

    #[test]
    fn test_resolution_branch_resolves_to_commit() {
        let resolution = Resolution::new(
            "dev-main",
            Some("5267b03b1e4861c4657ede17a88f13ef479db482".to_string()),
        );
        assert!(resolution.is_branch());
        let version = resolution.version_ref().unwrap();
        assert!(version.is_commit());
        assert_eq!(version.to_string(), "5267b03b1e4861c4657ede17a88f13ef479db482");

        assert!(Resolution::new("1.x-dev", None).version_ref().is_none());
    }

    #[test]
    fn test_request_builder() {
        let request = ResolveRequest::new("{}", None, "monolog/monolog").with_unlock(UnlockScope::All);
        assert_eq!(request.unlock, UnlockScope::All);
        assert!(request.credentials.is_empty());
        assert!(request.platform_overrides.is_empty());
    }

    #[test]
    fn test_failure_display() {
        let failure = ResolutionFailure::new(
            FailureReason::AuthenticationFailure {
                host: "php.fury.io".to_string(),
            },
            "HTTP 401",
        );
        assert_eq!(failure.to_string(), "authentication failed for php.fury.io");
        assert_eq!(ResolutionFailure::other("boom").to_string(), "boom");
    }
}
