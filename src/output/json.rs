//! JSON output formatter for machine processing

use crate::domain::{RequirementsToUnlock, SourceKind, UpdateDecision};
use crate::orchestrator::CheckReport;
use crate::output::OutputFormatter;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    dependency: &'a str,
    current_version: Option<String>,
    source: SourceKind,
    strategy: String,
    vulnerable: bool,
    latest_version: Option<String>,
    /// `up_to_date`, `can_update` or `cannot_update`
    decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unlock: Option<RequirementsToUnlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<JsonUpdate<'a>>,
}

#[derive(Serialize)]
struct JsonUpdate<'a> {
    from: Option<String>,
    to: Option<String>,
    requirements: Vec<JsonRequirement<'a>>,
}

#[derive(Serialize)]
struct JsonRequirement<'a> {
    file: &'a str,
    from: Option<&'a str>,
    to: Option<&'a str>,
}

impl<'a> JsonReport<'a> {
    fn from_report(report: &'a CheckReport) -> Self {
        let (decision, unlock) = match report.decision {
            UpdateDecision::UpToDate => ("up_to_date", None),
            UpdateDecision::CanUpdate(level) => ("can_update", Some(level)),
            UpdateDecision::CannotUpdate => ("cannot_update", None),
        };

        let update = report.updated_dependency.as_ref().map(|updated| {
            let previous = updated.previous_requirements.as_deref().unwrap_or_default();
            JsonUpdate {
                from: updated.previous_version.as_ref().map(ToString::to_string),
                to: updated.version.as_ref().map(ToString::to_string),
                requirements: updated
                    .requirements
                    .iter()
                    .enumerate()
                    .map(|(i, req)| JsonRequirement {
                        file: &req.file,
                        from: previous.get(i).and_then(|p| p.requirement.as_deref()),
                        to: req.requirement.as_deref(),
                    })
                    .collect(),
            }
        });

        Self {
            dependency: &report.dependency,
            current_version: report.current_version.as_ref().map(ToString::to_string),
            source: report.source,
            strategy: report.strategy.to_string(),
            vulnerable: report.vulnerable,
            latest_version: report.latest_version.as_ref().map(ToString::to_string),
            decision,
            unlock,
            update,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &CheckReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = JsonReport::from_report(report);
        serde_json::to_writer_pretty(&mut *writer, &json)?;
        writeln!(writer)
    }
}
