//! Dependency information structures

use super::Source;
use crate::version::VersionRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Package manager identifier carried by every Composer dependency
pub const COMPOSER: &str = "composer";

/// Requirement group for `require`
pub const RUNTIME_GROUP: &str = "runtime";

/// Requirement group for `require-dev`
pub const DEVELOPMENT_GROUP: &str = "development";

/// One declaration of a dependency in a manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Manifest file the declaration lives in (e.g. `composer.json`)
    pub file: String,
    /// Constraint string as written, if any
    pub requirement: Option<String>,
    /// `runtime` and/or `development`
    pub groups: Vec<String>,
    /// Where the package is fetched from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl Requirement {
    pub fn new(file: impl Into<String>, requirement: Option<String>) -> Self {
        Self {
            file: file.into(),
            requirement,
            groups: Vec::new(),
            source: None,
        }
    }

    /// Sets the groups (builder pattern)
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Sets the source (builder pattern)
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Copy with a different constraint string, metadata unchanged
    pub fn with_requirement(&self, requirement: impl Into<String>) -> Self {
        Self {
            requirement: Some(requirement.into()),
            ..self.clone()
        }
    }
}

/// A package dependency as seen before (or after) an update
///
/// The "after update" value is a fresh `Dependency` carrying
/// `previous_version` and `previous_requirements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name (`vendor/package`)
    pub name: String,
    /// Currently resolved version, absent for requirement-only dependencies
    pub version: Option<VersionRef>,
    /// Declarations across manifest files
    pub requirements: Vec<Requirement>,
    /// Always `composer`
    pub package_manager: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<VersionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_requirements: Option<Vec<Requirement>>,
}

impl Dependency {
    /// Creates a new Composer dependency
    pub fn new(
        name: impl Into<String>,
        version: Option<VersionRef>,
        requirements: Vec<Requirement>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            requirements,
            package_manager: COMPOSER.to_string(),
            previous_version: None,
            previous_requirements: None,
        }
    }

    /// Builds the updated value of `self`
    pub fn updated(&self, version: Option<VersionRef>, requirements: Vec<Requirement>) -> Self {
        Self {
            name: self.name.clone(),
            version,
            requirements,
            package_manager: self.package_manager.clone(),
            previous_version: self.version.clone(),
            previous_requirements: Some(self.requirements.clone()),
        }
    }

    /// Returns true if the current version is a git commit
    pub fn has_commit_version(&self) -> bool {
        self.version.as_ref().is_some_and(VersionRef::is_commit)
    }

    /// Sources attached to the requirements, in declaration order
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.requirements.iter().filter_map(|r| r.source.as_ref())
    }

    /// Non-empty requirement strings
    pub fn requirement_strings(&self) -> impl Iterator<Item = &str> {
        self.requirements
            .iter()
            .filter_map(|r| r.requirement.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Returns true when only declared under `require-dev`
    pub fn is_development_only(&self) -> bool {
        !self.requirements.is_empty()
            && self
                .requirements
                .iter()
                .all(|r| r.groups.iter().all(|g| g == DEVELOPMENT_GROUP))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{} (no version)", self.name),
        }
    }
}
