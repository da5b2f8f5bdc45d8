//! Source classification
//!
//! A dependency is fetched from a registry (Packagist or a private Composer
//! repository), a git remote, a local path, or something unrecognized.
//! Only registry dependencies go through the generic version lookup.

use super::{Dependency, Requirement};
use crate::manifest::DependencyFiles;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a requirement is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// A Composer registry
    Registry { url: String },
    /// A git remote, optionally tracking a branch
    Git {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    /// A local path repository
    Path { path: String },
    /// Any other repository type (svn, hg, artifact, ...)
    Other { kind: String },
}

/// Coarse classification of a [`Source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Registry,
    Git,
    Path,
    Unrecognized,
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Registry { .. } => SourceKind::Registry,
            Source::Git { .. } => SourceKind::Git,
            Source::Path { .. } => SourceKind::Path,
            Source::Other { .. } => SourceKind::Unrecognized,
        }
    }

    /// Remote URL for registry and git sources
    pub fn url(&self) -> Option<&str> {
        match self {
            Source::Registry { url } | Source::Git { url, .. } => Some(url),
            Source::Path { .. } | Source::Other { .. } => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Registry => write!(f, "registry"),
            SourceKind::Git => write!(f, "git"),
            SourceKind::Path => write!(f, "path"),
            SourceKind::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Classify a single requirement; no source means the default registry
pub fn classify(requirement: &Requirement) -> SourceKind {
    requirement
        .source
        .as_ref()
        .map(Source::kind)
        .unwrap_or(SourceKind::Registry)
}

/// Classify a dependency by the first non-registry source among its requirements
pub fn classify_dependency(dependency: &Dependency) -> SourceKind {
    dependency
        .requirements
        .iter()
        .map(classify)
        .find(|kind| *kind != SourceKind::Registry)
        .unwrap_or(SourceKind::Registry)
}

/// Returns true when the manifest or any locked package replaces `name`
pub fn is_replaced(name: &str, files: &DependencyFiles) -> bool {
    let in_manifest = files
        .composer_json()
        .replace
        .keys()
        .any(|replaced| replaced.eq_ignore_ascii_case(name));
    if in_manifest {
        return true;
    }

    files.composer_lock().is_some_and(|lock| {
        lock.all_packages().any(|package| {
            package
                .replace
                .keys()
                .any(|replaced| replaced.eq_ignore_ascii_case(name))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement_with(source: Option<Source>) -> Requirement {
        let mut req = Requirement::new("composer.json", Some("^1.0".to_string()));
        req.source = source;
        req
    }

    #[test]
    fn test_classify_without_source_is_registry() {
        assert_eq!(classify(&requirement_with(None)), SourceKind::Registry);
    }

    #[test]
    fn test_classify_each_kind() {
        let git = Source::Git {
            url: "https://github.com/acme/pkg.git".to_string(),
            branch: Some("master".to_string()),
            reference: None,
        };
        let path = Source::Path {
            path: "../pkg".to_string(),
        };
        let other = Source::Other {
            kind: "svn".to_string(),
        };
        assert_eq!(classify(&requirement_with(Some(git))), SourceKind::Git);
        assert_eq!(classify(&requirement_with(Some(path))), SourceKind::Path);
        assert_eq!(
            classify(&requirement_with(Some(other))),
            SourceKind::Unrecognized
        );
    }

    #[test]
    fn test_classify_dependency_prefers_non_registry() {
        let dep = Dependency::new(
            "acme/pkg",
            None,
            vec![
                requirement_with(None),
                requirement_with(Some(Source::Path {
                    path: "../pkg".to_string(),
                })),
            ],
        );
        assert_eq!(classify_dependency(&dep), SourceKind::Path);
    }

    #[test]
    fn test_source_serde_tagged() {
        let source = Source::Path {
            path: "../pkg".to_string(),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert_eq!(json, r#"{"type":"path","path":"../pkg"}"#);
    }

    #[test]
    fn test_is_replaced_by_manifest() {
        let files = DependencyFiles::new(
            r#"{"require": {"acme/a": "^1.0"}, "replace": {"acme/legacy": "self.version"}}"#,
            None,
        )
        .unwrap();
        assert!(is_replaced("acme/legacy", &files));
        assert!(is_replaced("ACME/Legacy", &files));
        assert!(!is_replaced("acme/a", &files));
    }

    #[test]
    fn test_is_replaced_by_locked_package() {
        let lock = r#"{
            "packages": [
                {"name": "laravel/framework", "version": "v5.2.0", "replace": {"illuminate/support": "self.version"}}
            ],
            "packages-dev": []
        }"#;
        let files = DependencyFiles::new(
            r#"{"require": {"laravel/framework": "5.2.*"}}"#,
            Some(lock.to_string()),
        )
        .unwrap();
        assert!(is_replaced("illuminate/support", &files));
        assert!(!is_replaced("laravel/framework", &files));
    }
}
