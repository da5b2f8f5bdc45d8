//! Requirement rewriting
//!
//! Given a dependency's requirements and a target version, produce the new
//! requirement strings for the chosen update strategy:
//! - Single constraints keep their shape (`^1.0` -> `^1.6`, `1.0.*` -> `1.6.*`)
//! - Ranges move their upper bound (`<2.0` -> `<3.0`)
//! - OR lists collapse to their highest alternative, or gain a new one when widening
//!
//! Any rewritten string that fails to admit the target makes the whole set
//! unfixable.

use crate::domain::{Requirement, UpdateStrategy, UpdatedRequirements};
use crate::version::{Constraint, Version, VersionRef};
use regex::Regex;
use std::sync::LazyLock;

static OR_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").unwrap());

static ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)(\s+as\s+)(\S+)$").unwrap());

/// Version token inside a single constraint, wildcards allowed
static VERSION_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+(?:\.(?:\d+|\*|x))*").unwrap());

/// Upper bound inside a range alternative
static UPPER_BOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<=?)(\s*)(v?)(\d+(?:\.\d+)*)").unwrap());

static HYPHEN_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+\s+-\s+)(v?)(\d+(?:\.\d+)*)$").unwrap());

const DEFAULT_OR_SEPARATOR: &str = " || ";

/// Rewrites requirement strings so they admit a target version
#[derive(Debug, Clone)]
pub struct RequirementsUpdater {
    requirements: Vec<Requirement>,
    target: Option<VersionRef>,
    strategy: UpdateStrategy,
}

impl RequirementsUpdater {
    pub fn new(
        requirements: Vec<Requirement>,
        target: Option<VersionRef>,
        strategy: UpdateStrategy,
    ) -> Self {
        Self {
            requirements,
            target,
            strategy,
        }
    }

    /// Rewritten requirements, one per input, metadata preserved
    pub fn updated_requirements(&self) -> UpdatedRequirements {
        if self.strategy == UpdateStrategy::LockfileOnly {
            return UpdatedRequirements::Updated(self.requirements.clone());
        }
        let Some(target) = self.target.as_ref().and_then(VersionRef::as_release) else {
            return UpdatedRequirements::Updated(self.requirements.clone());
        };

        let mut updated = Vec::with_capacity(self.requirements.len());
        for req in &self.requirements {
            match self.updated_requirement(req, target) {
                Some(new_req) => updated.push(new_req),
                None => {
                    log::debug!(
                        "requirement '{}' cannot be rewritten to admit {}",
                        req.requirement.as_deref().unwrap_or_default(),
                        target
                    );
                    return UpdatedRequirements::Unfixable;
                }
            }
        }
        UpdatedRequirements::Updated(updated)
    }

    /// `None` when the rewritten string does not admit the target
    fn updated_requirement(&self, req: &Requirement, target: &Version) -> Option<Requirement> {
        let Some(raw) = req.requirement.as_deref().map(str::trim) else {
            return Some(req.clone());
        };
        if !raw.chars().any(|c| c.is_ascii_digit()) || only_dev_branches(raw) {
            return Some(req.clone());
        }

        if let Some(caps) = ALIAS_RE.captures(raw) {
            return Some(match Version::parse(&caps[1]) {
                Ok(_) => req.with_requirement(format!("{}{}{}", target, &caps[2], &caps[3])),
                Err(_) => req.clone(),
            });
        }

        let satisfied = Constraint::parse(raw)
            .map(|c| c.matches(target))
            .unwrap_or(false);

        // Ranges that already admit the target are left alone even when bumping
        let unchanged = match self.strategy {
            UpdateStrategy::BumpVersions => satisfied && is_range(raw),
            UpdateStrategy::BumpVersionsIfNecessary | UpdateStrategy::WidenRanges => satisfied,
            UpdateStrategy::LockfileOnly => true,
        };
        if unchanged {
            return Some(req.clone());
        }

        let rewritten = match self.strategy {
            UpdateStrategy::WidenRanges => widen(raw, target),
            _ => bump(raw, target),
        };

        let admits = Constraint::parse(&rewritten)
            .map(|c| c.matches(target))
            .unwrap_or(false);
        admits.then(|| req.with_requirement(rewritten))
    }
}

fn is_dev_branch(alternative: &str) -> bool {
    alternative.trim().to_ascii_lowercase().starts_with("dev-")
}

fn only_dev_branches(raw: &str) -> bool {
    OR_SEPARATOR_RE.split(raw).all(is_dev_branch)
}

fn is_range(alternative: &str) -> bool {
    alternative.contains(['<', '>', ','])
        || alternative.contains("!=")
        || HYPHEN_RANGE_RE.is_match(alternative.trim())
        || alternative.trim().split_whitespace().count() > 1
}

/// Highest numeric version written in an alternative
fn highest_mentioned(alternative: &str) -> Option<Version> {
    VERSION_TOKEN_RE
        .find_iter(alternative)
        .filter_map(|m| {
            let numeric: Vec<u64> = m
                .as_str()
                .split('.')
                .map_while(|p| p.parse::<u64>().ok())
                .collect();
            (!numeric.is_empty()).then(|| Version::new(&numeric))
        })
        .max()
}

/// Index of the highest-versioned non-dev alternative
fn highest_alternative(alternatives: &[&str]) -> Option<usize> {
    alternatives
        .iter()
        .enumerate()
        .filter(|(_, alt)| !is_dev_branch(alt))
        .filter_map(|(i, alt)| highest_mentioned(alt).map(|v| (i, v)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
}

fn or_separator(raw: &str) -> &str {
    OR_SEPARATOR_RE
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_OR_SEPARATOR)
}

/// Move the requirement to the target, collapsing OR lists
fn bump(raw: &str, target: &Version) -> String {
    let alternatives: Vec<&str> = OR_SEPARATOR_RE.split(raw).collect();
    if alternatives.len() == 1 {
        return rewrite_alternative(raw, target);
    }

    let Some(highest) = highest_alternative(&alternatives) else {
        return raw.to_string();
    };
    let kept: Vec<String> = alternatives
        .iter()
        .enumerate()
        .filter_map(|(i, alt)| {
            if i == highest {
                Some(rewrite_alternative(alt, target))
            } else if is_dev_branch(alt) {
                Some(alt.to_string())
            } else {
                None
            }
        })
        .collect();
    kept.join(or_separator(raw))
}

/// Extend the requirement so it also admits the target
fn widen(raw: &str, target: &Version) -> String {
    let alternatives: Vec<&str> = OR_SEPARATOR_RE.split(raw).collect();
    let Some(highest) = highest_alternative(&alternatives) else {
        return raw.to_string();
    };

    if is_range(alternatives[highest]) {
        let mut parts: Vec<String> = alternatives.iter().map(|a| a.to_string()).collect();
        parts[highest] = update_range(alternatives[highest], target);
        return parts.join(or_separator(raw));
    }

    let addition = rewrite_alternative(alternatives[highest], target);
    format!("{}{}{}", raw, or_separator(raw), addition)
}

fn rewrite_alternative(alternative: &str, target: &Version) -> String {
    let alternative = alternative.trim();
    if is_dev_branch(alternative) {
        return alternative.to_string();
    }
    if is_range(alternative) {
        return update_range(alternative, target);
    }

    let (body, flag) = match alternative.find('@') {
        Some(at) => alternative.split_at(at),
        None => (alternative, ""),
    };

    if body.starts_with(['^', '~']) || body.contains(['*', 'x', 'X']) {
        mirror_precision(body, target) + flag
    } else {
        let (op, rest) = split_exact_operator(body);
        let prefix = if rest.starts_with(['v', 'V']) { &rest[..1] } else { "" };
        format!("{}{}{}{}", op, prefix, target, flag)
    }
}

fn split_exact_operator(body: &str) -> (&str, &str) {
    for op in ["==", "="] {
        if let Some(rest) = body.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", body)
}

/// Replace the version token keeping its segment count and wildcards
fn mirror_precision(body: &str, target: &Version) -> String {
    VERSION_TOKEN_RE
        .replace(body, |caps: &regex::Captures| {
            caps[0]
                .split('.')
                .enumerate()
                .map(|(i, part)| match part {
                    "*" | "x" | "X" => part.to_string(),
                    _ => target.segment(i).to_string(),
                })
                .collect::<Vec<_>>()
                .join(".")
        })
        .into_owned()
}

/// Raise upper bounds below the target
fn update_range(alternative: &str, target: &Version) -> String {
    if let Some(caps) = HYPHEN_RANGE_RE.captures(alternative.trim()) {
        let precision = caps[3].split('.').count();
        let upper: Vec<String> = (0..precision).map(|i| target.segment(i).to_string()).collect();
        return format!("{}{}{}", &caps[1], &caps[2], upper.join("."));
    }

    UPPER_BOUND_RE
        .replace_all(alternative, |caps: &regex::Captures| {
            let op = &caps[1];
            let Ok(bound) = Version::parse(&caps[4]) else {
                return caps[0].to_string();
            };
            let new_bound = match op {
                "<=" if *target > bound => target.to_string(),
                "<" if *target >= bound => update_greatest_version(&caps[4], target),
                _ => return caps[0].to_string(),
            };
            format!("{}{}{}{}", op, &caps[2], &caps[3], new_bound)
        })
        .into_owned()
}

/// New exclusive upper bound with the same precision as `old_bound`
///
/// The last non-zero segment is the one that moves: `<2.0` becomes `<3.0`
/// for target 2.5.0 and `<1.5` becomes `<1.8` for target 1.7.2.
fn update_greatest_version(old_bound: &str, target: &Version) -> String {
    let segments: Vec<u64> = old_bound
        .split('.')
        .map(|s| s.parse::<u64>().unwrap_or(0))
        .collect();
    let index_to_update = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| **s != 0)
        .map(|(i, _)| i)
        .max()
        .unwrap_or(0);

    (0..segments.len())
        .map(|i| {
            if i < index_to_update {
                target.segment(i)
            } else if i == index_to_update {
                target.segment(i).saturating_add(1)
            } else {
                0
            }
        })
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
