//! Composer dependency files
//!
//! This module provides functionality to:
//! - Read composer.json and (optionally) composer.lock from a directory
//! - Expose typed views of both files
//! - Build the `Dependency` value for one package, including its source
//! - Rewrite composer.json for resolution attempts

mod composer_json;
mod composer_lock;
mod writer;

pub use composer_json::{
    is_platform_extension, normalize_git_url, ComposerConfig, ComposerJson, Repository,
};
pub use composer_lock::{ComposerLock, LockedPackage, PackageSource};
pub use writer::ManifestWriter;

use crate::domain::{Dependency, Requirement, Source, DEVELOPMENT_GROUP, RUNTIME_GROUP};
use crate::error::ManifestError;
use crate::version::{CommitSha, VersionRef};
use std::path::Path;

/// Manifest file name
pub const MANIFEST_FILENAME: &str = "composer.json";

/// Lockfile file name
pub const LOCKFILE_FILENAME: &str = "composer.lock";

/// The manifest and optional lockfile of one project
#[derive(Debug, Clone)]
pub struct DependencyFiles {
    /// composer.json content
    pub manifest: String,
    /// composer.lock content
    pub lockfile: Option<String>,
    composer_json: ComposerJson,
    composer_lock: Option<ComposerLock>,
}

impl DependencyFiles {
    /// Parse both files up front
    pub fn new(manifest: impl Into<String>, lockfile: Option<String>) -> Result<Self, ManifestError> {
        let manifest = manifest.into();
        let composer_json = serde_json::from_str(&manifest)
            .map_err(|e| ManifestError::json_parse_error(MANIFEST_FILENAME, e.to_string()))?;
        let composer_lock = lockfile
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| ManifestError::json_parse_error(LOCKFILE_FILENAME, e.to_string()))?;

        Ok(Self {
            manifest,
            lockfile,
            composer_json,
            composer_lock,
        })
    }

    /// Read `composer.json` (required) and `composer.lock` (optional) from `dir`
    pub fn from_dir(dir: &Path) -> Result<Self, ManifestError> {
        let manifest_path = dir.join(MANIFEST_FILENAME);
        if !manifest_path.is_file() {
            return Err(ManifestError::not_found(manifest_path));
        }
        let manifest = read_file(&manifest_path)?;

        let lock_path = dir.join(LOCKFILE_FILENAME);
        let lockfile = if lock_path.is_file() {
            Some(read_file(&lock_path)?)
        } else {
            None
        };

        Self::new(manifest, lockfile).map_err(|e| match e {
            ManifestError::JsonParseError { path, message } => {
                ManifestError::json_parse_error(dir.join(path), message)
            }
            other => other,
        })
    }

    pub fn composer_json(&self) -> &ComposerJson {
        &self.composer_json
    }

    pub fn composer_lock(&self) -> Option<&ComposerLock> {
        self.composer_lock.as_ref()
    }

    pub fn has_lockfile(&self) -> bool {
        self.lockfile.is_some()
    }
}

fn read_file(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
}

/// Build the `Dependency` for `name` from the manifest and lockfile
///
/// Transitive dependencies (locked but not declared) get no requirements.
pub fn parse_dependency(files: &DependencyFiles, name: &str) -> Result<Dependency, ManifestError> {
    let manifest = files.composer_json();
    let locked = files.composer_lock().and_then(|lock| lock.package(name));
    let declared = manifest.requirement_for(name);

    if declared.is_none() && locked.is_none() {
        return Err(ManifestError::dependency_not_found(name, MANIFEST_FILENAME));
    }

    let canonical_name = locked.map(|p| p.name.clone()).unwrap_or_else(|| name.to_string());
    let source = locked.and_then(|p| locked_source(manifest, p));

    let requirements = declared
        .map(|(constraint, is_dev)| {
            let group = if is_dev { DEVELOPMENT_GROUP } else { RUNTIME_GROUP };
            let mut req = Requirement::new(MANIFEST_FILENAME, Some(constraint.to_string()))
                .with_groups(&[group]);
            req.source = source.clone();
            vec![req]
        })
        .unwrap_or_default();

    let version = locked.and_then(locked_version);

    Ok(Dependency::new(canonical_name, version, requirements))
}

/// Version of a locked package; branches are pinned to their commit
fn locked_version(package: &LockedPackage) -> Option<VersionRef> {
    if package.is_branch() {
        return package
            .reference()
            .filter(|r| CommitSha::is_full_sha(r))
            .and_then(|r| VersionRef::parse(r).ok());
    }
    match VersionRef::parse(&package.version) {
        Ok(version) => Some(version),
        Err(err) => {
            log::warn!("ignoring locked version of {}: {}", package.name, err);
            None
        }
    }
}

/// Source of a locked package
///
/// Packages from Composer registries also carry a git `source`; a locked git
/// source only counts as a git dependency when it tracks a branch or the
/// manifest declares a VCS repository for it.
fn locked_source(manifest: &ComposerJson, package: &LockedPackage) -> Option<Source> {
    if let Some(dist) = &package.dist {
        if dist.kind == "path" {
            return Some(Source::Path {
                path: dist.url.clone().unwrap_or_default(),
            });
        }
    }

    let source = package.source.as_ref()?;
    match source.kind.as_str() {
        "git" => {
            let url = source.url.clone()?;
            if !package.is_branch() && !manifest.has_vcs_repository(&url) {
                return None;
            }
            let branch = package
                .version
                .strip_prefix("dev-")
                .map(str::to_string)
                .or_else(|| package.is_branch().then(|| package.version.clone()));
            Some(Source::Git {
                url,
                branch,
                reference: source.reference.clone(),
            })
        }
        "svn" | "hg" | "fossil" | "perforce" => Some(Source::Other {
            kind: source.kind.clone(),
        }),
        _ => None,
    }
}
