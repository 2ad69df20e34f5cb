use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static FILE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^diff --git a/.+ b/(.+)$").expect("file header regex is valid")
});

/// Staged changes captured from the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDiff {
    pub text: String,
    pub files: Vec<String>,
}

impl StagedDiff {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        let files = changed_files(&text);
        Self { text, files }
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Paths named by the `diff --git` headers of a unified diff, in order.
pub fn changed_files(diff: &str) -> Vec<String> {
    FILE_HEADER_RE
        .captures_iter(diff)
        .map(|cap| cap[1].trim_end().to_string())
        .collect()
}

/// Source of the staged diff to review.
pub trait DiffSource {
    fn staged_diff(&self) -> Result<StagedDiff>;
}

/// Reads the staged diff by shelling out to git.
pub struct GitDiffSource {
    git_binary: String,
    repo_dir: PathBuf,
}

impl GitDiffSource {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: "git".to_string(),
            repo_dir: repo_dir.into(),
        }
    }

    /// Use a different git executable (tests point this at missing binaries).
    pub fn with_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        debug!(binary = %self.git_binary, ?args, dir = %self.repo_dir.display(), "running git");
        let output = Command::new(&self.git_binary)
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| Error::Git(format!("failed to run '{}': {e}", self.git_binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(Error::Git(match output.status.code() {
                Some(code) if detail.is_empty() => {
                    format!("git {} exited with code {code}", args.join(" "))
                }
                Some(code) => format!("git {} exited with code {code}: {detail}", args.join(" ")),
                None => format!("git {} terminated by signal", args.join(" ")),
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DiffSource for GitDiffSource {
    fn staged_diff(&self) -> Result<StagedDiff> {
        let raw = self.git(&["diff", "--staged", "--no-color", "--no-ext-diff"])?;
        Ok(StagedDiff::new(raw))
    }
}
