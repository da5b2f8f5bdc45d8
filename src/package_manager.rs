//! Composer binary integration
//!
//! This module provides:
//! - Detection of the composer executable
//! - Asynchronous execution of composer commands in a working directory

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Default composer executable name, resolved through `PATH`
pub const DEFAULT_COMPOSER_BINARY: &str = "composer";

/// Result of a composer invocation
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command that was executed
    pub command: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
}

impl CommandResult {
    /// Create a successful command result
    pub fn success(command: String, stdout: String, stderr: String) -> Self {
        Self {
            command,
            success: true,
            stdout,
            stderr,
        }
    }

    /// Create a failed command result
    pub fn failure(command: String, stdout: String, stderr: String) -> Self {
        Self {
            command,
            success: false,
            stdout,
            stderr,
        }
    }

    /// stderr followed by stdout; composer reports errors on both
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stderr, self.stdout)
    }
}

/// Trait for running composer commands
#[async_trait]
pub trait ComposerRunner: Send + Sync {
    /// Run `composer <args>` in `working_dir` with extra environment variables
    async fn run(
        &self,
        args: &[String],
        working_dir: &Path,
        env: &[(String, String)],
    ) -> std::io::Result<CommandResult>;
}

/// Default runner that executes the real composer binary
#[derive(Debug, Clone)]
pub struct SystemComposer {
    binary: PathBuf,
}

impl SystemComposer {
    /// Create a runner for the given composer executable
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.binary.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for SystemComposer {
    fn default() -> Self {
        Self::new(DEFAULT_COMPOSER_BINARY)
    }
}

#[async_trait]
impl ComposerRunner for SystemComposer {
    async fn run(
        &self,
        args: &[String],
        working_dir: &Path,
        env: &[(String, String)],
    ) -> std::io::Result<CommandResult> {
        let command = self.command_line(args);
        log::debug!("running `{}` in {}", command, working_dir.display());

        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .current_dir(working_dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(CommandResult::success(command, stdout, stderr))
        } else {
            log::debug!("`{}` exited with {}", command, output.status);
            Ok(CommandResult::failure(command, stdout, stderr))
        }
    }
}
