//! composer-update-checker - Composer dependency update checker CLI tool
//!
//! Checks whether one dependency of a Composer project can be updated and
//! how many requirements the update needs to unlock.

use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use update_checker::cli::CliArgs;
use update_checker::orchestrator::Orchestrator;
use update_checker::output::{create_formatter, OutputConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    args.validate()?;

    if args.verbose {
        eprintln!("composer-update-checker v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Project: {}", args.path.display());
    }

    let orchestrator = Orchestrator::new(args.clone())?;
    let report = orchestrator.run().await?;

    let formatter = create_formatter(OutputConfig::from_cli(&args));
    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    Ok(ExitCode::SUCCESS)
}
