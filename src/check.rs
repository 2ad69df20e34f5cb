use std::io::Write;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::gemini::ReviewEngine;
use crate::git::DiffSource;
use crate::report::{self, ExitStatus, OutputFormat};

pub const NO_CHANGES: &str = "No staged changes detected.";

/// One review of the staged diff: fetch, review, render, decide exit status.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    format: OutputFormat,
    strict: bool,
}

impl Check {
    pub fn new(format: OutputFormat, strict: bool) -> Self {
        Self { format, strict }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(OutputFormat::from_json_flag(config.json), config.strict)
    }

    /// Run the check, writing the rendered result to `out`.
    ///
    /// `engine` is only built once there is something to review, so a
    /// missing API key does not matter when nothing is staged, and git
    /// failures never reach the review client.
    pub fn run<D, E, F>(&self, source: &D, engine: F, out: &mut impl Write) -> Result<ExitStatus>
    where
        D: DiffSource + ?Sized,
        E: ReviewEngine,
        F: FnOnce() -> Result<E>,
    {
        let diff = source.staged_diff()?;

        if diff.is_empty() {
            info!("no staged changes");
            out.write_all(report::render_no_changes(self.format, NO_CHANGES)?.as_bytes())?;
            out.flush()?;
            return Ok(ExitStatus::Clean);
        }

        info!(files = diff.files.len(), bytes = diff.text.len(), "collected staged diff");

        let result = engine()?.review(&diff)?;
        let status = report::exit_status(&result, self.strict);
        let counts = result.counts();
        info!(
            errors = counts.errors,
            warnings = counts.warnings,
            notes = counts.notes,
            ?status,
            "review complete"
        );

        out.write_all(report::render(&result, self.format)?.as_bytes())?;
        out.flush()?;
        Ok(status)
    }
}
