//! Registry adapters for fetching package version information
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - Packagist and private Composer repository adapter

mod client;
mod packagist;

pub use client::{host_of, HttpClient};
pub use packagist::{parse_metadata_versions, PackagistAdapter, PACKAGIST_URL};

use crate::domain::Credential;
use crate::error::RegistryError;
use crate::manifest::ComposerJson;
use crate::update::VersionInfo;
use async_trait::async_trait;

/// Composer repositories a package may be published in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySet {
    /// Query repo.packagist.org
    pub packagist: bool,
    /// Private Composer repository base URLs
    pub composer_urls: Vec<String>,
}

impl RegistrySet {
    /// Packagist only
    pub fn packagist() -> Self {
        Self {
            packagist: true,
            composer_urls: Vec::new(),
        }
    }

    /// Repositories declared by a manifest, in lookup order (private first)
    pub fn from_manifest(manifest: &ComposerJson) -> Self {
        Self {
            packagist: manifest.uses_packagist(),
            composer_urls: manifest.composer_repository_urls(),
        }
    }

    /// Every base URL that will be queried
    pub fn urls(&self) -> Vec<String> {
        let mut urls = self.composer_urls.clone();
        if self.packagist {
            urls.push(PACKAGIST_URL.to_string());
        }
        urls
    }
}

/// Trait for registry adapters
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Fetch published versions of `package` from every repository in `registries`
    ///
    /// Returns `PackageNotFound` only when no repository knows the package.
    async fn fetch_versions(
        &self,
        package: &str,
        registries: &RegistrySet,
        credentials: &[Credential],
    ) -> Result<Vec<VersionInfo>, RegistryError>;
}
