use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::git::StagedDiff;

const DEFAULT_REVIEW: &str = include_str!("default_prompts/review.md");
const REVIEW_TEMPLATE: &str = "review";

#[derive(Serialize)]
struct ReviewVars<'a> {
    diff: &'a str,
    files: &'a [String],
}

/// Review prompt renderer with an embedded default and an optional user
/// override file.
pub struct PromptEngine {
    override_file: Option<PathBuf>,
}

impl PromptEngine {
    pub fn new(override_file: Option<PathBuf>) -> Self {
        Self { override_file }
    }

    /// Load the review template. An override file, when configured, must exist.
    pub fn load_template(&self) -> Result<String> {
        match self.override_file {
            Some(ref path) => std::fs::read_to_string(path).map_err(|e| {
                Error::Prompt(format!(
                    "failed to read prompt template {}: {e}",
                    path.display()
                ))
            }),
            None => Ok(DEFAULT_REVIEW.to_string()),
        }
    }

    pub fn render_review(&self, diff: &StagedDiff) -> Result<String> {
        let template = self.load_template()?;
        render_template(&template, diff)
    }
}

/// Render a review template against a staged diff.
///
/// Templates see `diff` (the full diff text) and `files` (changed paths).
/// Referencing anything else is an error.
pub fn render_template(template: &str, diff: &StagedDiff) -> Result<String> {
    let mut engine = upon::Engine::new();
    engine
        .add_template(REVIEW_TEMPLATE, template)
        .map_err(|e| Error::Prompt(format!("invalid prompt template: {e}")))?;

    engine
        .template(REVIEW_TEMPLATE)
        .render(ReviewVars {
            diff: &diff.text,
            files: &diff.files,
        })
        .to_string()
        .map_err(|e| Error::Prompt(format!("failed to render prompt: {e}")))
}
