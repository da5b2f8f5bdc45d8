//! Composer version model
//!
//! Handles:
//! - Release versions: `1.0.1`, `v2.3`, `1.0.0.0`
//! - Stability suffixes: `1.0.0-alpha2`, `1.0.0-beta.1`, `2.0.0-RC3`, `1.22.0.a`, `1.0.0-dev`
//! - Git commit pins (40-character SHA-1), compared by prefix only
//!
//! Wildcard segments (`1.0.*`) are only meaningful inside constraints, see [`Constraint`].

mod constraint;

pub use constraint::Constraint;

use crate::error::ParseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Release version: up to four numeric segments plus an optional stability suffix
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?(?:[._-]?(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*))?([.-]?dev)?$",
    )
    .unwrap()
});

/// Full or abbreviated git commit hash
static SHA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-f]{7,40}$").unwrap());

/// Number of numeric segments Composer compares
const NORMALIZED_SEGMENTS: usize = 4;

/// Minimum number of numeric segments used when reporting a version
const REPORTED_SEGMENTS: usize = 3;

/// Stability of a version, in ascending precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Dev,
    Alpha,
    Beta,
    #[serde(rename = "RC")]
    Rc,
    Stable,
    Patch,
}

impl Stability {
    fn from_suffix(suffix: &str) -> Self {
        match suffix.to_ascii_lowercase().as_str() {
            "alpha" | "a" => Stability::Alpha,
            "beta" | "b" => Stability::Beta,
            "rc" => Stability::Rc,
            "patch" | "pl" | "p" => Stability::Patch,
            _ => Stability::Stable,
        }
    }

    /// Parse a stability flag as used in constraints (`@dev`, `@beta`)
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.to_ascii_lowercase().as_str() {
            "dev" => Some(Stability::Dev),
            "alpha" => Some(Stability::Alpha),
            "beta" => Some(Stability::Beta),
            "rc" => Some(Stability::Rc),
            "stable" => Some(Stability::Stable),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Stability::Dev => "dev",
            Stability::Alpha => "alpha",
            Stability::Beta => "beta",
            Stability::Rc => "RC",
            Stability::Stable => "stable",
            Stability::Patch => "patch",
        }
    }
}

/// A Composer release version
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
    stability: Stability,
    stability_number: Option<u64>,
}

impl Version {
    /// Parse a version string as it appears in a registry listing or lockfile
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        let caps = VERSION_RE
            .captures(trimmed)
            .ok_or_else(|| ParseError::invalid_version(raw))?;

        let mut segments = Vec::with_capacity(NORMALIZED_SEGMENTS);
        for i in 1..=NORMALIZED_SEGMENTS {
            if let Some(m) = caps.get(i) {
                let n = m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| ParseError::invalid_version(raw))?;
                segments.push(n);
            }
        }

        let mut stability = caps
            .get(5)
            .map(|m| Stability::from_suffix(m.as_str()))
            .unwrap_or(Stability::Stable);
        let stability_number = caps.get(6).and_then(|m| {
            m.as_str()
                .split(['.', '-'])
                .find(|p| !p.is_empty())
                .and_then(|p| p.parse::<u64>().ok())
        });
        if caps.get(7).is_some() {
            stability = Stability::Dev;
        }

        Ok(Self {
            segments,
            stability,
            stability_number,
        })
    }

    /// Create a stable version from numeric segments
    pub fn new(segments: &[u64]) -> Self {
        Self {
            segments: segments.to_vec(),
            stability: Stability::Stable,
            stability_number: None,
        }
    }

    /// Numeric segments as written (between one and four)
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Numeric segment at `index`, zero when not written
    pub fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }

    pub fn stability(&self) -> Stability {
        self.stability
    }

    /// Returns true for dev, alpha, beta and RC versions
    pub fn is_prerelease(&self) -> bool {
        self.stability < Stability::Stable
    }

    /// The same numeric segments with stable stability
    pub fn release(&self) -> Self {
        Self::new(&self.segments)
    }

    /// The lowest version sharing these numeric segments (`X-dev`)
    pub fn lowest_of_release(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            stability: Stability::Dev,
            stability_number: None,
        }
    }

    fn padded(&self) -> [u64; NORMALIZED_SEGMENTS] {
        let mut out = [0; NORMALIZED_SEGMENTS];
        for (i, seg) in self.segments.iter().take(NORMALIZED_SEGMENTS).enumerate() {
            out[i] = *seg;
        }
        out
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.padded()
            .cmp(&other.padded())
            .then(self.stability.cmp(&other.stability))
            .then(
                self.stability_number
                    .unwrap_or(0)
                    .cmp(&other.stability_number.unwrap_or(0)),
            )
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.segments.len().max(REPORTED_SEGMENTS);
        let numeric: Vec<String> = (0..count).map(|i| self.segment(i).to_string()).collect();
        write!(f, "{}", numeric.join("."))?;

        if self.stability != Stability::Stable {
            write!(f, "-{}", self.stability.label())?;
            if let Some(n) = self.stability_number {
                write!(f, "{}", n)?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

/// A git commit hash, full or abbreviated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitSha(String);

impl CommitSha {
    /// Parse a full (40 characters) or abbreviated (at least 7) hex commit hash
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let lowered = raw.trim().to_ascii_lowercase();
        if SHA_RE.is_match(&lowered) {
            Ok(Self(lowered))
        } else {
            Err(ParseError::invalid_version(raw))
        }
    }

    /// Returns true if the string is a full 40-character SHA-1
    pub fn is_full_sha(raw: &str) -> bool {
        raw.len() == 40 && SHA_RE.is_match(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact or prefix equality; abbreviated hashes match their full form
    pub fn matches(&self, other: &CommitSha) -> bool {
        self.0.starts_with(&other.0) || other.0.starts_with(&self.0)
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved version: a release or a git commit pin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionRef {
    Release(Version),
    Commit(CommitSha),
}

impl VersionRef {
    /// Parse a resolved version, treating a 40-character hex string as a commit pin
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        if CommitSha::is_full_sha(&trimmed.to_ascii_lowercase()) {
            return CommitSha::parse(trimmed).map(VersionRef::Commit);
        }
        Version::parse(trimmed).map(VersionRef::Release)
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, VersionRef::Commit(_))
    }

    pub fn as_release(&self) -> Option<&Version> {
        match self {
            VersionRef::Release(v) => Some(v),
            VersionRef::Commit(_) => None,
        }
    }

    /// Returns true when `self` and `other` refer to the same release or commit
    pub fn same_as(&self, other: &VersionRef) -> bool {
        match (self, other) {
            (VersionRef::Release(a), VersionRef::Release(b)) => a == b,
            (VersionRef::Commit(a), VersionRef::Commit(b)) => a.matches(b),
            _ => false,
        }
    }

    /// Returns true when moving from `current` to `self` is an upgrade
    ///
    /// Commits have no order: any different commit counts as newer. A commit is
    /// never considered newer than a release, nor the other way round.
    pub fn is_newer_than(&self, current: &VersionRef) -> bool {
        match (self, current) {
            (VersionRef::Release(new), VersionRef::Release(old)) => new > old,
            (VersionRef::Commit(new), VersionRef::Commit(old)) => !new.matches(old),
            _ => false,
        }
    }
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRef::Release(v) => write!(f, "{}", v),
            VersionRef::Commit(sha) => write!(f, "{}", sha),
        }
    }
}

impl From<Version> for VersionRef {
    fn from(v: Version) -> Self {
        VersionRef::Release(v)
    }
}

impl From<VersionRef> for String {
    fn from(v: VersionRef) -> Self {
        v.to_string()
    }
}

impl TryFrom<String> for VersionRef {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        VersionRef::parse(&value)
    }
}
