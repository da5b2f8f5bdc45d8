//! Platform relaxation policies
//!
//! Resolution runs on a machine that is not the project's production
//! platform. Before the first resolver call the policies below fill in
//! `config.platform` so PHP extensions and the PHP version declared by the
//! project are treated as present:
//! - `AssumeExtensionsPresent`: every `ext-*` / `lib-*` requirement
//! - `PlatformPhpFromManifest`: the lowest known PHP release satisfying the
//!   manifest's `php` requirement, when `config.platform.php` is unset

use crate::manifest::{is_platform_extension, DependencyFiles};
use crate::version::{Constraint, Version};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Upper bound on re-issuing a request after a missing platform requirement
pub const MAX_PLATFORM_RELAXATIONS: usize = 5;

/// Latest patch release of every PHP minor line, oldest first
pub const KNOWN_PHP_VERSIONS: [&str; 15] = [
    "5.3.29", "5.4.45", "5.5.38", "5.6.40", "7.0.33", "7.1.33", "7.2.34", "7.3.33", "7.4.33",
    "8.0.30", "8.1.31", "8.2.27", "8.3.15", "8.4.2", "8.5.0",
];

/// Version used for a platform package when no constraint names one
const FALLBACK_PLATFORM_VERSION: &str = "0.0.0";

static VERSION_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+){0,3}").unwrap());

/// A rule that adds entries to the platform overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationPolicy {
    AssumeExtensionsPresent,
    PlatformPhpFromManifest,
}

impl RelaxationPolicy {
    /// Add this policy's overrides for `files`
    pub fn apply(&self, files: &DependencyFiles, overrides: &mut BTreeMap<String, String>) {
        match self {
            RelaxationPolicy::AssumeExtensionsPresent => {
                for name in platform_requirement_names(files) {
                    if overrides.contains_key(&name) {
                        continue;
                    }
                    let version = platform_version(files, &name);
                    log::debug!("assuming {} {} is present", name, version);
                    overrides.insert(name, version);
                }
            }
            RelaxationPolicy::PlatformPhpFromManifest => {
                let manifest = files.composer_json();
                if manifest.platform_php().is_some() || overrides.contains_key("php") {
                    return;
                }
                let Some(requirement) = manifest.php_requirement() else {
                    return;
                };
                match lowest_php_for(requirement) {
                    Some(php) => {
                        log::debug!("pinning platform php to {} for '{}'", php, requirement);
                        overrides.insert("php".to_string(), php.to_string());
                    }
                    None => {
                        log::warn!("no known PHP release satisfies '{}'", requirement);
                    }
                }
            }
        }
    }

    /// Apply every policy in order, returning the resulting overrides
    pub fn apply_all(
        policies: &[RelaxationPolicy],
        files: &DependencyFiles,
    ) -> BTreeMap<String, String> {
        let mut overrides = BTreeMap::new();
        for policy in policies {
            policy.apply(files, &mut overrides);
        }
        overrides
    }

    /// Override for a platform package reported missing by the resolver
    ///
    /// Returns false when the package was already overridden.
    pub fn relax_missing(
        files: &DependencyFiles,
        overrides: &mut BTreeMap<String, String>,
        name: &str,
    ) -> bool {
        if overrides.contains_key(name) {
            return false;
        }
        let version = platform_version(files, name);
        log::info!("resolver reported {} missing, assuming {}", name, version);
        overrides.insert(name.to_string(), version);
        true
    }
}

impl fmt::Display for RelaxationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxationPolicy::AssumeExtensionsPresent => write!(f, "assume-extensions-present"),
            RelaxationPolicy::PlatformPhpFromManifest => write!(f, "platform-php-from-manifest"),
        }
    }
}

/// The policies applied before every resolution, in order
pub fn default_policies() -> Vec<RelaxationPolicy> {
    vec![
        RelaxationPolicy::AssumeExtensionsPresent,
        RelaxationPolicy::PlatformPhpFromManifest,
    ]
}

/// `ext-*` / `lib-*` names required by the manifest or any locked package
fn platform_requirement_names(files: &DependencyFiles) -> Vec<String> {
    let mut names: Vec<String> = files
        .composer_json()
        .platform_extensions()
        .map(|n| n.to_ascii_lowercase())
        .collect();
    if let Some(lock) = files.composer_lock() {
        names.extend(
            lock.all_packages()
                .flat_map(|p| p.require.keys())
                .filter(|n| is_platform_extension(n))
                .map(|n| n.to_ascii_lowercase()),
        );
    }
    names.sort();
    names.dedup();
    names
}

/// Constraint strings every file places on platform package `name`
fn platform_constraints<'a>(files: &'a DependencyFiles, name: &str) -> Vec<&'a str> {
    let manifest = files.composer_json();
    let mut constraints: Vec<&str> = manifest
        .require
        .iter()
        .chain(manifest.require_dev.iter())
        .filter(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
        .collect();
    if let Some(lock) = files.composer_lock() {
        constraints.extend(
            lock.all_packages()
                .flat_map(|p| p.require.iter())
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
        );
    }
    constraints
}

/// Lowest version mentioned by the constraints that satisfies all of them
fn platform_version(files: &DependencyFiles, name: &str) -> String {
    let constraints = platform_constraints(files, name);
    let parsed: Vec<Constraint> = constraints
        .iter()
        .filter_map(|c| Constraint::parse(c).ok())
        .collect();

    let mut candidates: Vec<Version> = vec![Version::new(&[0, 0, 0])];
    for constraint in &constraints {
        for mention in VERSION_MENTION_RE.find_iter(constraint) {
            if let Ok(version) = Version::parse(mention.as_str()) {
                let mut next = version.segments().to_vec();
                if let Some(last) = next.last_mut() {
                    *last += 1;
                }
                candidates.push(version);
                candidates.push(Version::new(&next));
            }
        }
    }
    candidates.sort();

    candidates
        .iter()
        .find(|v| parsed.iter().all(|c| c.matches(v)))
        .or_else(|| candidates.last())
        .map(|v| v.to_string())
        .unwrap_or_else(|| FALLBACK_PLATFORM_VERSION.to_string())
}

/// Lowest entry of `KNOWN_PHP_VERSIONS` admitted by `requirement`
pub fn lowest_php_for(requirement: &str) -> Option<&'static str> {
    let constraint = Constraint::parse(requirement).ok()?;
    KNOWN_PHP_VERSIONS.iter().copied().find(|raw| {
        Version::parse(raw)
            .map(|v| constraint.matches(&v))
            .unwrap_or(false)
    })
}
