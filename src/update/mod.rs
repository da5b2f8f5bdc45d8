//! Update computation for a single dependency
//!
//! This module provides:
//! - Version info from registry with release date
//! - Candidate filtering (ignored ranges, prereleases, advisories)
//! - Requirement rewriting for a chosen target version

mod filter;
mod requirements;
mod version_info;

pub use filter::{filter_ignored, filter_prereleases, lowest_fix, wants_prerelease, VersionFilter};
pub use requirements::RequirementsUpdater;
pub use version_info::VersionInfo;
