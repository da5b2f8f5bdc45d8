//! Update decision result types

use super::Requirement;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How declared requirement strings may be rewritten
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// Always move requirements to the new version
    BumpVersions,
    /// Only rewrite requirements that do not already admit the new version
    #[default]
    BumpVersionsIfNecessary,
    /// Extend requirements so both old and new versions are admitted
    WidenRanges,
    /// Never touch requirements; only the lockfile moves
    LockfileOnly,
}

impl FromStr for UpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bump_versions" | "bump" => Ok(UpdateStrategy::BumpVersions),
            "bump_versions_if_necessary" | "bump_if_necessary" => {
                Ok(UpdateStrategy::BumpVersionsIfNecessary)
            }
            "widen_ranges" | "widen" => Ok(UpdateStrategy::WidenRanges),
            "lockfile_only" => Ok(UpdateStrategy::LockfileOnly),
            _ => Err(format!(
                "invalid strategy '{}': expected 'bump-versions', 'bump-versions-if-necessary', 'widen-ranges' or 'lockfile-only'",
                s
            )),
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStrategy::BumpVersions => write!(f, "bump-versions"),
            UpdateStrategy::BumpVersionsIfNecessary => write!(f, "bump-versions-if-necessary"),
            UpdateStrategy::WidenRanges => write!(f, "widen-ranges"),
            UpdateStrategy::LockfileOnly => write!(f, "lockfile-only"),
        }
    }
}

/// How many declared requirements an update may rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementsToUnlock {
    /// Lockfile-only move within the existing requirement
    None,
    /// The dependency's own requirement may change
    Own,
    /// Any requirement in the project may change
    All,
}

impl RequirementsToUnlock {
    /// Unlock levels in the order they are tried
    pub const ALL_LEVELS: [RequirementsToUnlock; 3] = [
        RequirementsToUnlock::None,
        RequirementsToUnlock::Own,
        RequirementsToUnlock::All,
    ];
}

impl FromStr for RequirementsToUnlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(RequirementsToUnlock::None),
            "own" => Ok(RequirementsToUnlock::Own),
            "all" => Ok(RequirementsToUnlock::All),
            _ => Err(format!(
                "invalid unlock level '{}': expected 'none', 'own' or 'all'",
                s
            )),
        }
    }
}

impl fmt::Display for RequirementsToUnlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementsToUnlock::None => write!(f, "none"),
            RequirementsToUnlock::Own => write!(f, "own"),
            RequirementsToUnlock::All => write!(f, "all"),
        }
    }
}

/// Outcome of rewriting a dependency's requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "requirements", rename_all = "snake_case")]
pub enum UpdatedRequirements {
    /// Rewritten requirements, one per original requirement
    Updated(Vec<Requirement>),
    /// No rewrite admits the target version
    Unfixable,
}

impl UpdatedRequirements {
    pub fn is_unfixable(&self) -> bool {
        matches!(self, UpdatedRequirements::Unfixable)
    }

    pub fn requirements(&self) -> Option<&[Requirement]> {
        match self {
            UpdatedRequirements::Updated(reqs) => Some(reqs),
            UpdatedRequirements::Unfixable => None,
        }
    }
}

/// Final verdict for a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "unlock", rename_all = "snake_case")]
pub enum UpdateDecision {
    UpToDate,
    /// Updatable at the given (lowest sufficient) unlock level
    CanUpdate(RequirementsToUnlock),
    CannotUpdate,
}

impl fmt::Display for UpdateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateDecision::UpToDate => write!(f, "up to date"),
            UpdateDecision::CanUpdate(unlock) => write!(f, "can update (unlock: {})", unlock),
            UpdateDecision::CannotUpdate => write!(f, "cannot update"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "bump-versions".parse::<UpdateStrategy>().unwrap(),
            UpdateStrategy::BumpVersions
        );
        assert_eq!(
            "widen_ranges".parse::<UpdateStrategy>().unwrap(),
            UpdateStrategy::WidenRanges
        );
        assert_eq!(
            "Lockfile-Only".parse::<UpdateStrategy>().unwrap(),
            UpdateStrategy::LockfileOnly
        );
        assert!("sideways".parse::<UpdateStrategy>().is_err());
    }

    #[test]
    fn test_strategy_default_and_display_round_trip() {
        let strategy = UpdateStrategy::default();
        assert_eq!(strategy, UpdateStrategy::BumpVersionsIfNecessary);
        assert_eq!(strategy.to_string().parse::<UpdateStrategy>().unwrap(), strategy);
    }

    #[test]
    fn test_unlock_from_str() {
        assert_eq!(
            "own".parse::<RequirementsToUnlock>().unwrap(),
            RequirementsToUnlock::Own
        );
        assert!("some".parse::<RequirementsToUnlock>().is_err());
    }

    #[test]
    fn test_unlock_levels_are_ordered() {
        assert!(RequirementsToUnlock::None < RequirementsToUnlock::Own);
        assert!(RequirementsToUnlock::Own < RequirementsToUnlock::All);
    }

    #[test]
    fn test_updated_requirements_accessors() {
        assert!(UpdatedRequirements::Unfixable.is_unfixable());
        assert!(UpdatedRequirements::Unfixable.requirements().is_none());
        let updated = UpdatedRequirements::Updated(vec![]);
        assert_eq!(updated.requirements().map(|r| r.len()), Some(0));
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&UpdateDecision::CanUpdate(RequirementsToUnlock::Own)).unwrap();
        assert_eq!(json, r#"{"decision":"can_update","unlock":"own"}"#);
        let json = serde_json::to_string(&UpdateDecision::UpToDate).unwrap();
        assert_eq!(json, r#"{"decision":"up_to_date"}"#);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(UpdateDecision::UpToDate.to_string(), "up to date");
        assert_eq!(
            UpdateDecision::CanUpdate(RequirementsToUnlock::All).to_string(),
            "can update (unlock: all)"
        );
    }
}
