use std::io::IsTerminal;

use colored::{ColoredString, Colorize};

use crate::error::{Error, Result};
use crate::review_schema::{Finding, ReviewResult, Severity};

const SEPARATOR: &str = "---";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Process exit status for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// No blocking findings.
    Clean,
    /// Error findings, or warnings in strict mode.
    Findings,
    /// git, config, or API failure.
    ToolError,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Findings => 1,
            ExitStatus::ToolError => 2,
        }
    }
}

pub fn exit_status(result: &ReviewResult, strict: bool) -> ExitStatus {
    let counts = result.counts();
    if counts.errors > 0 || (strict && counts.warnings > 0) {
        ExitStatus::Findings
    } else {
        ExitStatus::Clean
    }
}

/// Disable colors when stdout is not a terminal. `colored` already honors
/// `NO_COLOR` and `CLICOLOR_FORCE`.
pub fn configure_color() {
    apply_color_override(std::io::stdout().is_terminal());
}

/// Re-decide colors for stderr before printing a tool error, which may be
/// going to a terminal even when stdout is redirected.
pub fn configure_stderr_color() {
    colored::control::unset_override();
    apply_color_override(std::io::stderr().is_terminal());
}

fn apply_color_override(is_terminal: bool) {
    if force_plain(is_terminal, std::env::var_os("CLICOLOR_FORCE").is_some()) {
        colored::control::set_override(false);
    }
}

fn force_plain(is_terminal: bool, clicolor_force: bool) -> bool {
    !is_terminal && !clicolor_force
}

fn paint(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Error => text.red(),
        Severity::Warning => text.yellow(),
        Severity::Note => text.cyan(),
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// `file lines` for a finding. Blank strings count as absent.
fn location(finding: &Finding) -> Option<String> {
    let file = non_blank(finding.file.as_deref())?;
    Some(match non_blank(finding.lines.as_deref()) {
        Some(lines) => format!("{file} {lines}"),
        None => file.to_string(),
    })
}

/// Render a review for the terminal: summary, findings in response order,
/// then per-severity counts.
pub fn render_text(result: &ReviewResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{} {}\n\n{SEPARATOR}\n\n",
        "Summary:".bold(),
        result.summary
    ));

    for finding in &result.findings {
        out.push_str(&format!(
            "{}: {}\n",
            paint(finding.severity, finding.severity.label()),
            finding.message
        ));
        if let Some(loc) = location(finding) {
            out.push_str(&format!("{}\n", format!("  → {loc}").bold()));
        }
        out.push('\n');
    }

    let counts = result.counts();
    out.push_str(&format!(
        "{SEPARATOR}\n\n{} {}, {}, {}\n",
        "Found:".bold(),
        plural(counts.errors, "error"),
        plural(counts.warnings, "warning"),
        plural(counts.notes, "note")
    ));
    out
}

pub fn render_json(result: &ReviewResult) -> Result<String> {
    let mut json = serde_json::to_string_pretty(result)?;
    json.push('\n');
    Ok(json)
}

/// Message shown when nothing is staged.
pub fn render_no_changes(format: OutputFormat, message: &str) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(&ReviewResult::empty(message)),
        OutputFormat::Text => Ok(format!("{}\n", message.green())),
    }
}

pub fn render(result: &ReviewResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(result),
        OutputFormat::Text => Ok(render_text(result)),
    }
}

/// Format a tool-level failure for stderr.
pub fn render_error(err: &Error) -> String {
    format!("{} {err}", "error:".red().bold())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review_schema::parse_review_output;
    use serial_test::serial;

    fn finding(
        severity: Severity,
        message: &str,
        file: Option<&str>,
        lines: Option<&str>,
    ) -> Finding {
        Finding {
            severity,
            message: message.to_string(),
            file: file.map(str::to_string),
            lines: lines.map(str::to_string),
        }
    }

    fn sample() -> ReviewResult {
        ReviewResult {
            summary: "Adds retry logic to the uploader.".to_string(),
            findings: vec![
                finding(
                    Severity::Warning,
                    "backoff never resets",
                    Some("src/upload.rs"),
                    Some("40-52"),
                ),
                finding(
                    Severity::Error,
                    "unwrap on network result",
                    Some("src/upload.rs"),
                    None,
                ),
                finding(Severity::Note, "consider a constant for 3", None, None),
            ],
        }
    }

    #[test]
    #[serial]
    fn test_render_text_layout() {
        colored::control::set_override(false);
        let text = render_text(&sample());
        colored::control::unset_override();

        let expected = "\nSummary: Adds retry logic to the uploader.\n\n---\n\n\
WARNING: backoff never resets\n  → src/upload.rs 40-52\n\n\
ERROR: unwrap on network result\n  → src/upload.rs\n\n\
NOTE: consider a constant for 3\n\n\
---\n\nFound: 1 error, 1 warning, 1 note\n";
        assert_eq!(text, expected);
    }

    #[test]
    #[serial]
    fn test_render_text_empty_location_omitted() {
        let result = ReviewResult {
            summary: "s".to_string(),
            findings: vec![
                finding(Severity::Note, "m", Some(""), Some("")),
                finding(Severity::Warning, "w", Some("a.rs"), Some(" ")),
            ],
        };
        colored::control::set_override(false);
        let text = render_text(&result);
        colored::control::unset_override();

        assert!(text.contains("NOTE: m\n\nWARNING: w\n  → a.rs\n\n---"));
        assert!(!text.contains("  →  "));
    }

    #[test]
    fn test_force_plain_only_without_terminal() {
        assert!(force_plain(false, false));
        assert!(!force_plain(true, false));
        assert!(!force_plain(false, true));
    }

    #[test]
    #[serial]
    fn test_render_text_no_findings() {
        colored::control::set_override(false);
        let text = render_text(&ReviewResult::empty("Docs only."));
        colored::control::unset_override();

        assert!(text.contains("Summary: Docs only."));
        assert!(text.ends_with("Found: 0 errors, 0 warnings, 0 notes\n"));
    }

    #[test]
    #[serial]
    fn test_render_text_colors_severities() {
        colored::control::set_override(true);
        let text = render_text(&sample());
        colored::control::unset_override();

        assert!(text.contains("\u{1b}[31mERROR\u{1b}[0m"));
        assert!(text.contains("\u{1b}[33mWARNING\u{1b}[0m"));
        assert!(text.contains("\u{1b}[36mNOTE\u{1b}[0m"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let result = sample();
        let json = render_json(&result).unwrap();
        assert_eq!(parse_review_output(&json).unwrap(), result);
    }

    #[test]
    fn test_render_json_keeps_null_locations() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["findings"][2]["file"], serde_json::Value::Null);
        assert_eq!(value["findings"][0]["severity"], "warning");
    }

    #[test]
    fn test_render_no_changes_json() {
        let json = render_no_changes(OutputFormat::Json, "No staged changes detected.").unwrap();
        let result = parse_review_output(&json).unwrap();
        assert_eq!(result.summary, "No staged changes detected.");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_exit_status_clean_without_errors() {
        let result = ReviewResult {
            summary: String::new(),
            findings: vec![finding(Severity::Warning, "w", None, None)],
        };
        assert_eq!(exit_status(&result, false), ExitStatus::Clean);
        assert_eq!(exit_status(&ReviewResult::empty(""), true), ExitStatus::Clean);
    }

    #[test]
    fn test_exit_status_errors_fail() {
        assert_eq!(exit_status(&sample(), false), ExitStatus::Findings);
        assert_eq!(ExitStatus::Findings.code(), 1);
    }

    #[test]
    fn test_exit_status_strict_warnings_fail() {
        let result = ReviewResult {
            summary: String::new(),
            findings: vec![
                finding(Severity::Warning, "w", None, None),
                finding(Severity::Note, "n", None, None),
            ],
        };
        assert_eq!(exit_status(&result, true), ExitStatus::Findings);
    }

    #[test]
    fn test_exit_status_strict_notes_pass() {
        let result = ReviewResult {
            summary: String::new(),
            findings: vec![finding(Severity::Note, "n", None, None)],
        };
        assert_eq!(exit_status(&result, true), ExitStatus::Clean);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Clean.code(), 0);
        assert_eq!(ExitStatus::Findings.code(), 1);
        assert_eq!(ExitStatus::ToolError.code(), 2);
    }

    #[test]
    fn test_output_format_from_flag() {
        assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
    }
}
