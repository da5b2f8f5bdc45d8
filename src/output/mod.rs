//! Rendering of check reports
//!
//! `--json` selects the machine-readable formatter; otherwise a text report
//! is written, shortened by `--quiet` and extended by `--verbose`.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::{TextFormatter, VersionChangeType};

use crate::cli::CliArgs;
use crate::orchestrator::CheckReport;
use std::io::Write;

/// How much of a report the text formatter prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Single summary line
    Quiet,
    #[default]
    Normal,
    /// Adds source, strategy and requirement details
    Verbose,
}

impl Verbosity {
    fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Verbosity::Quiet,
            (true, false) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }
}

/// Formatter selection derived from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub json: bool,
    pub verbosity: Verbosity,
    /// ANSI colors in text output; `colored` also honours `NO_COLOR`
    pub color: bool,
}

impl OutputConfig {
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            json: args.json,
            verbosity: Verbosity::from_flags(args.verbose, args.quiet),
            color: colored::control::SHOULD_COLORIZE.should_colorize(),
        }
    }
}

/// Writes a `CheckReport` in one output format
pub trait OutputFormatter {
    fn format(&self, report: &CheckReport, writer: &mut dyn Write) -> std::io::Result<()>;
}

pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    if config.json {
        Box::new(JsonFormatter::new())
    } else {
        Box::new(TextFormatter::with_color(config.verbosity, config.color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(flags: &[&str]) -> OutputConfig {
        let mut argv = vec!["composer-update-checker", "monolog/monolog"];
        argv.extend_from_slice(flags);
        OutputConfig::from_cli(&CliArgs::parse_from(argv))
    }

    #[test]
    fn test_default_is_normal_text() {
        let config = config(&[]);
        assert!(!config.json);
        assert_eq!(config.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_json_flag() {
        assert!(config(&["--json"]).json);
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(config(&["--verbose"]).verbosity, Verbosity::Verbose);
        assert_eq!(config(&["-q"]).verbosity, Verbosity::Quiet);
    }
}
