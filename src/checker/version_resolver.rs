//! Resolution orchestration
//!
//! Drives a `ResolverOracle` for one dependency:
//! - builds the manifest with the requirement under test
//! - applies the platform relaxation policies before the first call
//! - re-issues the request when a platform package is reported missing
//! - turns resolver failures into `Ok(None)` or a fatal `CheckerError`

use crate::domain::{Credential, Dependency};
use crate::error::CheckerError;
use crate::manifest::{DependencyFiles, ManifestWriter};
use crate::resolver::{
    default_policies, FailureReason, RelaxationPolicy, Resolution, ResolutionFailure,
    ResolveRequest, ResolverOracle, UnlockScope, MAX_PLATFORM_RELAXATIONS,
};
use crate::version::{Version, VersionRef};
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Lower bound used when nothing better is known
const MINIMUM_LOWER_BOUND: &str = "0.0.1";

static VERSION_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+){0,3}").unwrap());

static STABILITY_FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@(dev|alpha|beta|rc|stable)\b").unwrap());

/// Runs resolution attempts for one project
#[derive(Clone)]
pub struct VersionResolver {
    oracle: Arc<dyn ResolverOracle>,
    policies: Vec<RelaxationPolicy>,
}

impl VersionResolver {
    /// Create a resolver using the default relaxation policies
    pub fn new(oracle: Arc<dyn ResolverOracle>) -> Self {
        Self {
            oracle,
            policies: default_policies(),
        }
    }

    /// Replace the relaxation policies
    pub fn with_policies(mut self, policies: Vec<RelaxationPolicy>) -> Self {
        self.policies = policies;
        self
    }

    /// Resolve `dependency_name` with its requirement replaced by `requirement`
    ///
    /// `None` keeps the manifest untouched. Returns `Ok(None)` when the
    /// update is not resolvable.
    pub async fn resolve(
        &self,
        files: &DependencyFiles,
        credentials: &[Credential],
        dependency_name: &str,
        requirement: Option<&str>,
        unlock: UnlockScope,
    ) -> Result<Option<VersionRef>, CheckerError> {
        let manifest = match requirement {
            Some(requirement) => {
                let mut writer = ManifestWriter::parse(&files.manifest)?;
                writer.set_requirement(dependency_name, requirement);
                writer.render()?
            }
            None => files.manifest.clone(),
        };
        log::debug!(
            "resolving {} with requirement {:?}",
            dependency_name,
            requirement.unwrap_or("(unchanged)")
        );

        let request = self.request(files, credentials, dependency_name, manifest, unlock);
        match self.run_with_relaxation(files, request).await {
            Ok(resolution) => {
                let version = resolution.version_ref();
                if version.is_none() {
                    log::warn!(
                        "resolved {} to '{}', which is not a usable version",
                        dependency_name,
                        resolution.version
                    );
                }
                Ok(version)
            }
            Err(failure) => self.interpret(files, credentials, dependency_name, failure).await,
        }
    }

    fn request(
        &self,
        files: &DependencyFiles,
        credentials: &[Credential],
        dependency_name: &str,
        manifest: String,
        unlock: UnlockScope,
    ) -> ResolveRequest {
        ResolveRequest::new(manifest, files.lockfile.clone(), dependency_name)
            .with_credentials(credentials.to_vec())
            .with_platform_overrides(RelaxationPolicy::apply_all(&self.policies, files))
            .with_unlock(unlock)
    }

    /// Call the oracle, relaxing missing platform packages a bounded number of times
    async fn run_with_relaxation(
        &self,
        files: &DependencyFiles,
        mut request: ResolveRequest,
    ) -> Result<Resolution, ResolutionFailure> {
        let mut relaxations = 0;
        loop {
            let result = self.oracle.resolve(&request).await;
            let missing = match &result {
                Err(ResolutionFailure {
                    reason: FailureReason::MissingPlatformRequirement { name },
                    ..
                }) => name.clone(),
                _ => return result,
            };

            if relaxations >= MAX_PLATFORM_RELAXATIONS {
                log::warn!("giving up after {} platform relaxations", relaxations);
                return result;
            }
            if !RelaxationPolicy::relax_missing(files, &mut request.platform_overrides, &missing) {
                return result;
            }
            relaxations += 1;
            log::debug!(
                "retrying {} with {} assumed present ({}/{})",
                request.dependency_name,
                missing,
                relaxations,
                MAX_PLATFORM_RELAXATIONS
            );
        }
    }

    async fn interpret(
        &self,
        files: &DependencyFiles,
        credentials: &[Credential],
        dependency_name: &str,
        failure: ResolutionFailure,
    ) -> Result<Option<VersionRef>, CheckerError> {
        if failure.reason != FailureReason::Conflict {
            return Err(fatal(failure));
        }
        if files.has_lockfile() {
            log::debug!("update of {} is not resolvable: {}", dependency_name, failure.detail);
            return Ok(None);
        }

        // Without a lockfile a conflict may come from the project itself
        let request = self.request(
            files,
            credentials,
            dependency_name,
            files.manifest.clone(),
            UnlockScope::All,
        );
        match self.run_with_relaxation(files, request).await {
            Ok(_) => {
                log::debug!("update of {} is not resolvable: {}", dependency_name, failure.detail);
                Ok(None)
            }
            Err(original) => Err(fatal(original)),
        }
    }
}

/// Fatal error for a failure that cannot be reported as "not resolvable"
fn fatal(failure: ResolutionFailure) -> CheckerError {
    match failure.reason {
        FailureReason::Conflict => CheckerError::not_resolvable(failure.detail),
        FailureReason::MissingPlatformRequirement { name } => {
            CheckerError::not_resolvable(format!("missing platform requirement {}", name))
        }
        FailureReason::UnreachableSource { urls } => CheckerError::source_unreachable(urls),
        FailureReason::AuthenticationFailure { host } => CheckerError::auth_failure(host),
        FailureReason::TimedOut { url } => CheckerError::timed_out(url),
        FailureReason::Other => CheckerError::resolver_failed(failure.detail),
    }
}

/// Lower bound for an unlocked requirement
///
/// The current release; without one, the highest version named by the
/// existing requirements; otherwise `0.0.1`.
pub fn lower_bound(dependency: &Dependency) -> String {
    if let Some(current) = dependency.version.as_ref().and_then(VersionRef::as_release) {
        return current.to_string();
    }
    dependency
        .requirement_strings()
        .flat_map(|req| VERSION_MENTION_RE.find_iter(req))
        .filter_map(|m| Version::parse(m.as_str()).ok())
        .max()
        .map(|v| v.to_string())
        .unwrap_or_else(|| MINIMUM_LOWER_BOUND.to_string())
}

fn stability_flag(dependency: &Dependency) -> Option<String> {
    dependency
        .requirement_strings()
        .find_map(|req| STABILITY_FLAG_RE.find(req))
        .map(|m| m.as_str().to_string())
}

/// `>= <lower>, <= <upper>` keeping any stability flag of the original requirement
pub fn unlocked_requirement(dependency: &Dependency, upper: Option<&Version>) -> String {
    let mut requirement = format!(">= {}", lower_bound(dependency));
    if let Some(upper) = upper {
        requirement.push_str(&format!(", <= {}", upper));
    }
    if let Some(flag) = stability_flag(dependency) {
        requirement.push_str(&flag);
    }
    requirement
}

/// The original requirement capped at `upper`
///
/// `None` when the dependency declares no requirement. OR lists are kept
/// as written since a trailing cap would only bind their last alternative.
pub fn capped_requirement(dependency: &Dependency, upper: Option<&Version>) -> Option<String> {
    let original = dependency.requirement_strings().next()?.trim().to_string();
    match upper {
        Some(upper) if !original.contains('|') => Some(format!("{}, <= {}", original, upper)),
        _ => Some(original),
    }
}
