//! CLI argument parsing module for composer-update-checker

use crate::domain::{RequirementsToUnlock, UpdateStrategy};
use crate::error::ConfigError;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

fn parse_strategy(s: &str) -> Result<UpdateStrategy, String> {
    s.parse()
}

fn parse_unlock(s: &str) -> Result<RequirementsToUnlock, String> {
    s.parse()
}

/// Check whether a Composer dependency can be updated
#[derive(Parser, Debug, Clone)]
#[command(
    name = "composer-update-checker",
    version,
    about = "Check whether a Composer dependency can be updated"
)]
pub struct CliArgs {
    /// Package name as declared in composer.json (e.g. monolog/monolog)
    pub dependency: String,

    /// Project directory containing composer.json (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Version range to ignore (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Requirement update strategy: bump-versions, bump-versions-if-necessary,
    /// widen-ranges or lockfile-only
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<UpdateStrategy>,

    /// Only check a single unlock level: none, own or all
    #[arg(long, value_parser = parse_unlock)]
    pub unlock: Option<RequirementsToUnlock>,

    /// Configuration file (default: <PATH>/update-checker.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the composer executable
    #[arg(long)]
    pub composer: Option<PathBuf>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Reject flag combinations that cannot be honoured together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verbose && self.quiet {
            return Err(ConfigError::ConflictingOptions {
                message: "--quiet and --verbose cannot be used together".to_string(),
            });
        }
        Ok(())
    }

    /// Log level filter implied by `--verbose` / `--quiet`
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Error
        } else {
            log::LevelFilter::Warn
        }
    }
}
