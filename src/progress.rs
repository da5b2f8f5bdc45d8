//! Terminal spinner for the check workflow
//!
//! A check runs composer several times; the spinner names the step in flight.
//! It is disabled in quiet and JSON modes and draws nothing when stderr is
//! not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(80);

/// Spinner that is created on the first step and cleared when finished or dropped
pub struct Progress {
    enabled: bool,
    spinner: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            spinner: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    fn start(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(TICK_INTERVAL);
        spinner
    }

    /// Show `message` as the current step
    pub fn step(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        match &self.spinner {
            Some(spinner) => spinner.set_message(message.to_string()),
            None => self.spinner = Some(Self::start(message)),
        }
    }

    /// Clear the spinner from the terminal
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.spinner.is_some()
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}
