//! composer.json view
//!
//! Handles:
//! - require / require-dev sections
//! - replace section
//! - repositories (list or keyed form, `packagist.org: false`)
//! - config.platform overrides

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Git-backed repository types Composer understands
const VCS_TYPES: [&str; 7] = [
    "vcs",
    "git",
    "github",
    "gitlab",
    "bitbucket",
    "git-bitbucket",
    "fossil",
];

/// Typed subset of composer.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComposerJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    #[serde(default)]
    pub require_dev: BTreeMap<String, String>,
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
    #[serde(default)]
    pub repositories: Option<Value>,
    #[serde(default)]
    pub config: Option<ComposerConfig>,
    #[serde(default)]
    pub minimum_stability: Option<String>,
}

/// The `config` section; only platform overrides matter here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerConfig {
    /// `"php": "7.1.3"`, `"ext-foo": "1.0"` or `"ext-foo": false`
    #[serde(default)]
    pub platform: BTreeMap<String, Value>,
}

/// A repository declared in composer.json
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repository {
    /// A Composer repository (`packages.json` endpoint)
    Composer { url: String },
    /// A version-control repository
    Vcs { kind: String, url: String },
    /// A local path repository
    Path { url: String },
    /// `{"packagist.org": false}`
    PackagistDisabled,
    /// Anything else (`package`, `artifact`, ...)
    Other { kind: String },
}

impl Repository {
    fn from_value(key: Option<&str>, value: &Value) -> Option<Self> {
        if value == &Value::Bool(false) {
            return matches!(key, Some("packagist.org") | Some("packagist"))
                .then_some(Repository::PackagistDisabled);
        }

        let object = value.as_object()?;
        if object.get("packagist.org") == Some(&Value::Bool(false))
            || object.get("packagist") == Some(&Value::Bool(false))
        {
            return Some(Repository::PackagistDisabled);
        }

        let kind = object.get("type")?.as_str()?.to_ascii_lowercase();
        let url = object
            .get("url")
            .and_then(Value::as_str)
            .map(|s| s.trim_end_matches('/').to_string());

        Some(match (kind.as_str(), url) {
            ("composer", Some(url)) => Repository::Composer { url },
            ("path", Some(url)) => Repository::Path { url },
            (k, Some(url)) if VCS_TYPES.contains(&k) => Repository::Vcs {
                kind: kind.clone(),
                url,
            },
            _ => Repository::Other { kind },
        })
    }
}

impl ComposerJson {
    /// Constraint and group of `name`, `require` first
    pub fn requirement_for(&self, name: &str) -> Option<(&str, bool)> {
        find_in(&self.require, name)
            .map(|req| (req, false))
            .or_else(|| find_in(&self.require_dev, name).map(|req| (req, true)))
    }

    /// Declared repositories in order
    pub fn repositories(&self) -> Vec<Repository> {
        match &self.repositories {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| Repository::from_value(None, v))
                .collect(),
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| Repository::from_value(Some(k.as_str()), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true unless Packagist has been switched off
    pub fn uses_packagist(&self) -> bool {
        !self
            .repositories()
            .iter()
            .any(|r| *r == Repository::PackagistDisabled)
    }

    /// URLs of private Composer repositories
    pub fn composer_repository_urls(&self) -> Vec<String> {
        self.repositories()
            .into_iter()
            .filter_map(|r| match r {
                Repository::Composer { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Returns true if a VCS repository points at `url`
    pub fn has_vcs_repository(&self, url: &str) -> bool {
        let wanted = normalize_git_url(url);
        self.repositories().iter().any(|r| match r {
            Repository::Vcs { url, .. } => normalize_git_url(url) == wanted,
            _ => false,
        })
    }

    /// Platform PHP override from `config.platform.php`
    pub fn platform_php(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|c| c.platform.get("php"))
            .and_then(Value::as_str)
    }

    /// Names of `ext-*` and `lib-*` requirements in both sections
    pub fn platform_extensions(&self) -> impl Iterator<Item = &str> {
        self.require
            .keys()
            .chain(self.require_dev.keys())
            .map(String::as_str)
            .filter(|name| is_platform_extension(name))
    }

    /// The `php` requirement, if any
    pub fn php_requirement(&self) -> Option<&str> {
        self.require
            .get("php")
            .or_else(|| self.require_dev.get("php"))
            .map(String::as_str)
    }
}

fn find_in<'a>(section: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    section
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Returns true for `ext-*` and `lib-*` platform packages
pub fn is_platform_extension(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    lowered.starts_with("ext-") || lowered.starts_with("lib-")
}

/// Compare git URLs ignoring scheme noise and a trailing `.git`
pub fn normalize_git_url(url: &str) -> String {
    let lowered = url.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .or_else(|| lowered.strip_prefix("git@"))
        .unwrap_or(&lowered);
    without_scheme
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .replace(':', "/")
}
