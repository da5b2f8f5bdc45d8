//! Packagist Registry adapter
//!
//! Fetches package version information from Packagist and from private
//! Composer repositories declared in the manifest.
//! - Packagist endpoint: https://repo.packagist.org/p2/{vendor}/{package}.json
//! - Private repositories: `{url}/packages.json`, then inline `packages`,
//!   `metadata-url` (with `%package%`) and `includes`

use crate::domain::{credential_for, Credential};
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryAdapter, RegistrySet};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::Value;

/// Packagist repository base URL
pub const PACKAGIST_URL: &str = "https://repo.packagist.org";

/// Registry name used in errors for Packagist
const PACKAGIST_NAME: &str = "Packagist";

/// Packagist and private Composer repository adapter
pub struct PackagistAdapter {
    client: HttpClient,
}

impl PackagistAdapter {
    /// Create a new Packagist adapter
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the p2 metadata URL for a package
    /// Package names are in the format vendor/package
    fn build_url(&self, package: &str) -> String {
        format!("{}/p2/{}.json", PACKAGIST_URL, package.to_ascii_lowercase())
    }

    async fn fetch_from_packagist(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        log::debug!("fetching {} from {}", package, url);
        let body: Value = self
            .client
            .get_json(&url, package, PACKAGIST_NAME, None)
            .await?;
        Ok(parse_metadata_versions(&body, package))
    }

    async fn fetch_from_repository(
        &self,
        base: &str,
        package: &str,
        credentials: &[Credential],
    ) -> Result<Vec<VersionInfo>, RegistryError> {
        let credential = credential_for(credentials, base);
        let root_url = format!("{}/packages.json", base);
        log::debug!("fetching {} from {}", package, root_url);
        let root: Value = self
            .client
            .get_json(&root_url, package, base, credential)
            .await?;

        let mut versions = parse_metadata_versions(&root, package);

        let mut extra_urls = Vec::new();
        if let Some(template) = root.get("metadata-url").and_then(Value::as_str) {
            let path = template.replace("%package%", &package.to_ascii_lowercase());
            extra_urls.push(resolve_url(base, &path));
        }
        if let Some(includes) = root.get("includes").and_then(Value::as_object) {
            extra_urls.extend(includes.keys().map(|path| resolve_url(base, path)));
        }

        for url in extra_urls {
            match self.client.get_json::<Value>(&url, package, base, credential).await {
                Ok(body) => versions.extend(parse_metadata_versions(&body, package)),
                Err(RegistryError::PackageNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        if versions.is_empty() {
            return Err(RegistryError::package_not_found(package, base));
        }
        Ok(versions)
    }
}

#[async_trait]
impl RegistryAdapter for PackagistAdapter {
    fn registry_name(&self) -> &'static str {
        "packagist"
    }

    async fn fetch_versions(
        &self,
        package: &str,
        registries: &RegistrySet,
        credentials: &[Credential],
    ) -> Result<Vec<VersionInfo>, RegistryError> {
        let mut versions = Vec::new();
        let mut found = false;

        for base in &registries.composer_urls {
            match self.fetch_from_repository(base, package, credentials).await {
                Ok(list) => {
                    found = true;
                    versions.extend(list);
                }
                Err(RegistryError::PackageNotFound { .. }) => {
                    log::debug!("{} not found in {}", package, base);
                }
                Err(e) => return Err(e),
            }
        }

        if registries.packagist {
            match self.fetch_from_packagist(package).await {
                Ok(list) => {
                    found = true;
                    versions.extend(list);
                }
                Err(RegistryError::PackageNotFound { .. }) => {
                    log::debug!("{} not found on Packagist", package);
                }
                Err(e) => return Err(e),
            }
        }

        if !found {
            return Err(RegistryError::package_not_found(
                package,
                "configured Composer repositories",
            ));
        }
        Ok(versions)
    }
}

/// Versions of `package` listed in a Composer metadata document
///
/// Accepts both the v2 list form (possibly minified, where omitted fields
/// are inherited from the previous entry) and the v1 map form keyed by
/// version. Branches and unparseable versions are dropped.
pub fn parse_metadata_versions(body: &Value, package: &str) -> Vec<VersionInfo> {
    let Some(packages) = body.get("packages").and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(entry) = packages
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(package))
        .map(|(_, v)| v)
    else {
        return Vec::new();
    };

    match entry {
        Value::Array(items) => {
            let mut last_time: Option<DateTime<Utc>> = None;
            items
                .iter()
                .filter_map(|item| {
                    match item.get("time") {
                        Some(Value::String(t)) => last_time = parse_time(t),
                        Some(_) => last_time = None,
                        None => {}
                    }
                    let version = item.get("version").and_then(Value::as_str)?;
                    VersionInfo::parse(version, last_time)
                })
                .collect()
        }
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, item)| {
                let version = item.get("version").and_then(Value::as_str).unwrap_or(key);
                let time = item.get("time").and_then(Value::as_str).and_then(parse_time);
                VersionInfo::parse(version, time)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Resolve a metadata path against a repository base URL
fn resolve_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if path.starts_with('/') {
        if let Ok(joined) = Url::parse(base).and_then(|u| u.join(path)) {
            return joined.to_string();
        }
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
