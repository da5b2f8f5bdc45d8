//! Text output formatter for human-readable display
//!
//! This module provides:
//! - The decision with current, latest and target versions
//! - Semantic version change type indication (major/minor/patch)
//! - Requirement rewrites per manifest file (verbose)

use crate::domain::{Requirement, UpdateDecision};
use crate::orchestrator::CheckReport;
use crate::output::{OutputFormatter, Verbosity};
use crate::version::VersionRef;
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Commit moves, or no previous version
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: Option<&VersionRef>, new: &VersionRef) -> Self {
        let (Some(VersionRef::Release(old)), VersionRef::Release(new)) = (old, new) else {
            return VersionChangeType::Unknown;
        };
        if old.segment(0) != new.segment(0) {
            VersionChangeType::Major
        } else if old.segment(1) != new.segment(1) {
            VersionChangeType::Minor
        } else {
            VersionChangeType::Patch
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn display(version: Option<&VersionRef>) -> String {
        version
            .map(ToString::to_string)
            .unwrap_or_else(|| "none".to_string())
    }

    fn decision_label(&self, decision: &UpdateDecision) -> String {
        let label = decision.to_string();
        if !self.color {
            return label;
        }
        match decision {
            UpdateDecision::UpToDate => label.green().to_string(),
            UpdateDecision::CanUpdate(_) => label.cyan().bold().to_string(),
            UpdateDecision::CannotUpdate => label.yellow().to_string(),
        }
    }

    /// One-line summary used in quiet mode
    fn format_quiet(&self, report: &CheckReport, writer: &mut dyn Write) -> std::io::Result<()> {
        match report.target_version() {
            Some(target) => writeln!(
                writer,
                "{}: {} -> {}",
                report.dependency,
                Self::display(report.current_version.as_ref()),
                target
            ),
            None => writeln!(writer, "{}: {}", report.dependency, report.decision),
        }
    }

    fn format_update_line(
        &self,
        current: Option<&VersionRef>,
        target: &VersionRef,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let change_type = VersionChangeType::from_versions(current, target);
        let current = Self::display(current);
        if self.color {
            writeln!(
                writer,
                "  update:   {} {} {} [{}]",
                current.dimmed(),
                "→".dimmed(),
                target.to_string().bright_white().bold(),
                change_type.colored_label()
            )
        } else {
            writeln!(
                writer,
                "  update:   {} -> {} [{}]",
                current,
                target,
                change_type.label()
            )
        }
    }

    fn format_requirement_changes(
        &self,
        before: &[Requirement],
        after: &[Requirement],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        for (old, new) in before.iter().zip(after) {
            let old_req = old.requirement.as_deref().unwrap_or("(none)");
            let new_req = new.requirement.as_deref().unwrap_or("(none)");
            if old_req == new_req {
                writeln!(writer, "  {}: {} (unchanged)", new.file, new_req)?;
            } else if self.color {
                writeln!(
                    writer,
                    "  {}: {} {} {}",
                    new.file,
                    old_req.dimmed(),
                    "→".dimmed(),
                    new_req.bold()
                )?;
            } else {
                writeln!(writer, "  {}: {} -> {}", new.file, old_req, new_req)?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &CheckReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return self.format_quiet(report, writer);
        }

        let current = Self::display(report.current_version.as_ref());
        if self.color {
            writeln!(writer, "{} {}", report.dependency.bold(), current.dimmed())?;
        } else {
            writeln!(writer, "{} {}", report.dependency, current)?;
        }

        if report.vulnerable {
            let warning = "  vulnerable: current version is affected by a security advisory";
            if self.color {
                writeln!(writer, "{}", warning.red())?;
            } else {
                writeln!(writer, "{}", warning)?;
            }
        }

        if self.verbosity == Verbosity::Verbose {
            writeln!(writer, "  source:   {}", report.source)?;
            writeln!(writer, "  strategy: {}", report.strategy)?;
        }

        writeln!(
            writer,
            "  latest:   {}",
            Self::display(report.latest_version.as_ref())
        )?;
        writeln!(writer, "  decision: {}", self.decision_label(&report.decision))?;

        if let Some(updated) = &report.updated_dependency {
            if let Some(target) = &updated.version {
                self.format_update_line(report.current_version.as_ref(), target, writer)?;
            }
            if self.verbosity == Verbosity::Verbose {
                if let Some(previous) = &updated.previous_requirements {
                    self.format_requirement_changes(previous, &updated.requirements, writer)?;
                }
            }
        }
        Ok(())
    }
}
