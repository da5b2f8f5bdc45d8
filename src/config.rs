//! Project configuration file
//!
//! An optional `update-checker.toml` next to `composer.json` supplies what the
//! command line cannot carry comfortably:
//! - `composer_binary`: path to the composer executable
//! - `strategy`: default requirement update strategy
//! - `[[credentials]]`: private git hosts and Composer repositories
//! - `[[ignore]]`: version ranges never offered for a dependency
//! - `[[advisories]]`: known security advisories

use crate::domain::{Credential, SecurityAdvisory, UpdateStrategy};
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the project directory
pub const CONFIG_FILENAME: &str = "update-checker.toml";

/// Version ranges to ignore for one dependency
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IgnoreRule {
    pub dependency: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

/// Parsed `update-checker.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub composer_binary: Option<PathBuf>,
    pub strategy: Option<UpdateStrategy>,
    pub credentials: Vec<Credential>,
    pub ignore: Vec<IgnoreRule>,
    pub advisories: Vec<SecurityAdvisory>,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e: toml::de::Error| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read and parse the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::parse(&content, path)?;
        log::debug!(
            "loaded {} ({} credentials, {} ignore rules, {} advisories)",
            path.display(),
            config.credentials.len(),
            config.ignore.len(),
            config.advisories.len()
        );
        Ok(config)
    }

    /// Load the configuration for a project
    ///
    /// An explicit path must exist. Without one, `<project_dir>/update-checker.toml`
    /// is used when present and an empty configuration otherwise.
    pub fn load_for(project_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::InvalidPath {
                    path: path.to_path_buf(),
                    message: "config file does not exist".to_string(),
                });
            }
            return Self::load(path);
        }

        let default_path = project_dir.join(CONFIG_FILENAME);
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Ignored version ranges configured for `name`
    pub fn ignored_versions(&self, name: &str) -> Vec<String> {
        self.ignore
            .iter()
            .filter(|rule| rule.dependency.eq_ignore_ascii_case(name))
            .flat_map(|rule| rule.versions.iter().cloned())
            .collect()
    }

    /// Advisories concerning `name`
    pub fn advisories_for(&self, name: &str) -> Vec<SecurityAdvisory> {
        self.advisories
            .iter()
            .filter(|advisory| advisory.affects(name))
            .cloned()
            .collect()
    }
}
