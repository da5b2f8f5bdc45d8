//! Version information from registry
//!
//! This module provides the VersionInfo struct that represents
//! a published package version with its release date, when known.

use crate::version::Version;
use chrono::{DateTime, Utc};

/// Information about a package version from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// The parsed version
    pub version: Version,
    /// When this version was released (Composer metadata `time`)
    pub released_at: Option<DateTime<Utc>>,
}

impl VersionInfo {
    /// Create a new VersionInfo
    pub fn new(version: Version, released_at: Option<DateTime<Utc>>) -> Self {
        Self {
            version,
            released_at,
        }
    }

    /// Parse a registry version string, skipping anything that is not a release
    pub fn parse(raw: &str, released_at: Option<DateTime<Utc>>) -> Option<Self> {
        match Version::parse(raw) {
            Ok(version) => Some(Self::new(version, released_at)),
            Err(_) => {
                log::trace!("ignoring non-release version '{}'", raw);
                None
            }
        }
    }

    /// Returns true if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
