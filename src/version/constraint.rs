//! Composer constraint parsing and matching
//!
//! Supported syntax:
//! - Exact: `1.0.1`, `=1.0.1`, `==1.0.1`
//! - Comparison: `>=1.0`, `< 2.0`, `<=1.5`, `>1.0`, `!=1.3`, `<>1.3`
//! - Wildcard: `*`, `1.*`, `1.0.*`, `1.0.x`
//! - Caret/tilde: `^1.2`, `~1.2`, `~1.2.3`
//! - Hyphen range: `1.0 - 2.0`
//! - AND by comma or whitespace, OR by `||` or `|`
//! - Stability flags (`@dev`) are accepted and ignored for matching
//! - `dev-<branch>` and `X.Y.x-dev` atoms never match a release

use super::{Stability, Version};
use crate::error::ParseError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static OR_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").unwrap());

static AND_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*|\s+").unwrap());

static HYPHEN_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").unwrap());

static OPERATOR_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|<>|!=|==|>|<|=|\^|~)\s+").unwrap());

static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\S+)\s+as\s+\S+$").unwrap());

/// Partial version with optional wildcard tail: `1`, `1.2`, `v1.2.3-beta1`, `1.2.*`
static PARTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?(\d+)(?:\.(\d+|\*|x))?(?:\.(\d+|\*|x))?(?:\.(\d+|\*|x))?((?:[._-]?(?:stable|beta|b|rc|alpha|a|patch|pl|p)(?:[.-]?\d+)*)?(?:[.-]?dev)?)$")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Any,
    /// Branch reference; never satisfied by a release
    Branch,
    Compare(Op, Version),
}

impl Atom {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Atom::Any => true,
            Atom::Branch => false,
            Atom::Compare(op, bound) => match op {
                Op::Eq => version == bound,
                Op::Ne => version != bound,
                Op::Lt => version < bound,
                Op::Le => version <= bound,
                Op::Gt => version > bound,
                Op::Ge => version >= bound,
            },
        }
    }
}

/// A parsed partial version used inside constraints
struct Partial {
    /// Numeric segments written before any wildcard
    numbers: Vec<u64>,
    wildcard: bool,
    /// Full version when the text carried a stability suffix
    explicit: Option<Version>,
}

impl Partial {
    fn parse(raw: &str, whole: &str) -> Result<Self, ParseError> {
        let caps = PARTIAL_RE
            .captures(raw)
            .ok_or_else(|| ParseError::invalid_constraint(whole, format!("invalid version '{}'", raw)))?;

        let mut numbers = Vec::new();
        let mut wildcard = false;
        for i in 1..=4 {
            let Some(m) = caps.get(i) else { break };
            let text = m.as_str();
            if wildcard {
                // Nothing may follow a wildcard segment except more wildcards
                if !matches!(text, "*" | "x" | "X") {
                    return Err(ParseError::invalid_constraint(whole, "segment after wildcard"));
                }
                continue;
            }
            match text {
                "*" | "x" | "X" => wildcard = true,
                digits => numbers.push(
                    digits
                        .parse::<u64>()
                        .map_err(|_| ParseError::invalid_constraint(whole, "segment overflow"))?,
                ),
            }
        }

        let suffix = caps.get(5).map(|m| m.as_str()).unwrap_or("");
        if wildcard && !suffix.is_empty() {
            return Err(ParseError::invalid_constraint(whole, "suffix after wildcard"));
        }
        let explicit = if suffix.is_empty() {
            None
        } else {
            Some(Version::parse(raw).map_err(|_| {
                ParseError::invalid_constraint(whole, format!("invalid version '{}'", raw))
            })?)
        };

        Ok(Self {
            numbers,
            wildcard,
            explicit,
        })
    }

    fn version(&self) -> Version {
        match &self.explicit {
            Some(v) => v.clone(),
            None => Version::new(&self.numbers),
        }
    }

    /// Lower bound at `-dev` stability unless a stability was written
    fn lower(&self) -> Version {
        match &self.explicit {
            Some(v) => v.clone(),
            None => Version::new(&self.numbers).lowest_of_release(),
        }
    }
}

/// `X-dev` for the version obtained by incrementing `segments[index]` and
/// dropping everything after it
fn bumped(numbers: &[u64], index: usize, whole: &str) -> Result<Version, ParseError> {
    let mut out: Vec<u64> = (0..=index)
        .map(|i| numbers.get(i).copied().unwrap_or(0))
        .collect();
    out[index] = out[index]
        .checked_add(1)
        .ok_or_else(|| ParseError::invalid_constraint(whole, "segment overflow"))?;
    Ok(Version::new(&out).lowest_of_release())
}

/// A parsed Composer version constraint
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    alternatives: Vec<Vec<Atom>>,
}

impl Constraint {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseError::invalid_constraint(raw, "empty constraint"));
        }

        let mut alternatives = Vec::new();
        for alternative in OR_SPLIT_RE.split(trimmed) {
            if alternative.is_empty() {
                return Err(ParseError::invalid_constraint(raw, "empty alternative"));
            }
            alternatives.push(Self::parse_conjunction(alternative, raw)?);
        }

        Ok(Self {
            raw: trimmed.to_string(),
            alternatives,
        })
    }

    fn parse_conjunction(text: &str, whole: &str) -> Result<Vec<Atom>, ParseError> {
        let text = match ALIAS_RE.captures(text) {
            Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(text),
            None => text,
        };

        if let Some(caps) = HYPHEN_RANGE_RE.captures(text) {
            let from = Partial::parse(&caps[1], whole)?;
            let to = Partial::parse(&caps[2], whole)?;
            let upper = if to.explicit.is_none() && to.numbers.len() < 3 {
                let last = to.numbers.len().saturating_sub(1);
                Atom::Compare(Op::Lt, bumped(&to.numbers, last, whole)?)
            } else {
                Atom::Compare(Op::Le, to.version())
            };
            return Ok(vec![Atom::Compare(Op::Ge, from.lower()), upper]);
        }

        let normalized = OPERATOR_SPACE_RE.replace_all(text, "$1");
        let mut atoms = Vec::new();
        for token in AND_SPLIT_RE.split(normalized.trim()) {
            if token.is_empty() {
                continue;
            }
            atoms.extend(Self::parse_atom(token, whole)?);
        }
        if atoms.is_empty() {
            return Err(ParseError::invalid_constraint(whole, "empty alternative"));
        }
        Ok(atoms)
    }

    fn parse_atom(token: &str, whole: &str) -> Result<Vec<Atom>, ParseError> {
        let token = match token.split_once('@') {
            Some((head, flag)) => {
                if Stability::from_flag(flag).is_none() {
                    return Err(ParseError::invalid_constraint(
                        whole,
                        format!("unknown stability flag '@{}'", flag),
                    ));
                }
                head
            }
            None => token,
        };

        if token.is_empty() || matches!(token, "*" | "x" | "X" | "v*") {
            return Ok(vec![Atom::Any]);
        }

        let lowered = token.to_ascii_lowercase();
        if lowered.starts_with("dev-") || (lowered.ends_with("-dev") && lowered.contains(".x")) {
            return Ok(vec![Atom::Branch]);
        }

        if let Some(rest) = token.strip_prefix('^') {
            let partial = Partial::parse(rest, whole)?;
            let n = &partial.numbers;
            let index = if n.first().copied().unwrap_or(0) != 0 || n.len() == 1 {
                0
            } else if n.get(1).copied().unwrap_or(0) != 0 || n.len() == 2 {
                1
            } else {
                2
            };
            return Ok(vec![
                Atom::Compare(Op::Ge, partial.lower()),
                Atom::Compare(Op::Lt, bumped(n, index, whole)?),
            ]);
        }

        if let Some(rest) = token.strip_prefix('~') {
            let partial = Partial::parse(rest, whole)?;
            let index = partial.numbers.len().saturating_sub(2);
            return Ok(vec![
                Atom::Compare(Op::Ge, partial.lower()),
                Atom::Compare(Op::Lt, bumped(&partial.numbers, index, whole)?),
            ]);
        }

        let (op, rest) = split_operator(token);
        let partial = Partial::parse(rest, whole)?;

        if partial.wildcard {
            if op != Op::Eq {
                return Err(ParseError::invalid_constraint(whole, "operator with wildcard"));
            }
            if partial.numbers.is_empty() {
                return Ok(vec![Atom::Any]);
            }
            let index = partial.numbers.len() - 1;
            return Ok(vec![
                Atom::Compare(Op::Ge, partial.lower()),
                Atom::Compare(Op::Lt, bumped(&partial.numbers, index, whole)?),
            ]);
        }

        let bound = match op {
            Op::Lt | Op::Ge => partial.lower(),
            _ => partial.version(),
        };
        Ok(vec![Atom::Compare(op, bound)])
    }

    /// Returns true if `version` satisfies any alternative
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|atoms| atoms.iter().all(|atom| atom.matches(version)))
    }

    /// The constraint text as written (trimmed)
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn split_operator(token: &str) -> (Op, &str) {
    const OPERATORS: [(&str, Op); 8] = [
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("<>", Op::Ne),
        ("!=", Op::Ne),
        ("==", Op::Eq),
        (">", Op::Gt),
        ("<", Op::Lt),
        ("=", Op::Eq),
    ];
    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (Op::Eq, token)
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for Constraint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Constraint::parse(s)
    }
}
