//! composer.json rewriting
//!
//! This module provides:
//! - ManifestWriter for replacing one package's requirement string
//! - Platform overrides merged into `config.platform`
//!
//! Only the touched keys change; everything else in the document is kept.

use crate::error::ManifestError;
use crate::manifest::MANIFEST_FILENAME;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const REQUIRE: &str = "require";
const REQUIRE_DEV: &str = "require-dev";

/// Editable composer.json document
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    document: Map<String, Value>,
}

impl ManifestWriter {
    /// Parse manifest content into an editable document
    pub fn parse(manifest: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(manifest)
            .map_err(|e| ManifestError::json_parse_error(MANIFEST_FILENAME, e.to_string()))?;
        match value {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(ManifestError::json_parse_error(
                MANIFEST_FILENAME,
                "top-level value is not an object",
            )),
        }
    }

    /// Replace the requirement string of `name`
    ///
    /// The package keeps its section (require or require-dev) and its key
    /// spelling. Packages not declared yet are added to `require`.
    pub fn set_requirement(&mut self, name: &str, requirement: &str) -> &mut Self {
        for section in [REQUIRE, REQUIRE_DEV] {
            if let Some(Value::Object(map)) = self.document.get_mut(section) {
                if let Some(key) = map.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned() {
                    map.insert(key, Value::String(requirement.to_string()));
                    return self;
                }
            }
        }

        ensure_object(&mut self.document, REQUIRE);
        if let Some(map) = self.document.get_mut(REQUIRE).and_then(Value::as_object_mut) {
            map.insert(name.to_string(), Value::String(requirement.to_string()));
        }
        self
    }

    /// Merge platform overrides into `config.platform`
    ///
    /// Entries already configured by the project win.
    pub fn with_platform_overrides(&mut self, overrides: &BTreeMap<String, String>) -> &mut Self {
        if overrides.is_empty() {
            return self;
        }
        ensure_object(&mut self.document, "config");
        if let Some(config) = self.document.get_mut("config").and_then(Value::as_object_mut) {
            ensure_object(config, "platform");
            if let Some(platform) = config.get_mut("platform").and_then(Value::as_object_mut) {
                for (name, version) in overrides {
                    platform
                        .entry(name.clone())
                        .or_insert_with(|| Value::String(version.clone()));
                }
            }
        }
        self
    }

    /// Requirement currently declared for `name`
    pub fn requirement(&self, name: &str) -> Option<&str> {
        [REQUIRE, REQUIRE_DEV].iter().find_map(|section| {
            self.document
                .get(*section)
                .and_then(Value::as_object)?
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| v.as_str())
        })
    }

    /// Serialize the document back to pretty-printed JSON
    pub fn render(&self) -> Result<String, ManifestError> {
        serde_json::to_string_pretty(&self.document)
            .map_err(|e| ManifestError::json_parse_error(MANIFEST_FILENAME, e.to_string()))
    }
}

/// Make sure `key` holds an object, replacing any other value
fn ensure_object(map: &mut Map<String, Value>, key: &str) {
    if !matches!(map.get(key), Some(Value::Object(_))) {
        map.insert(key.to_string(), Value::Object(Map::new()));
    }
}
