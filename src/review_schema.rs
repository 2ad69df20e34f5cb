use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Note => "NOTE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub file: Option<String>,
    /// Free-form range such as `"42"` or `"12-18"`.
    #[serde(default)]
    pub lines: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub summary: String,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub notes: usize,
}

impl ReviewResult {
    /// Result reported when there is nothing to review.
    pub fn empty(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            findings: Vec::new(),
        }
    }

    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for finding in &self.findings {
            match finding.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Note => counts.notes += 1,
            }
        }
        counts
    }
}

/// Strip markdown code fences the model sometimes wraps output in, then
/// parse as `ReviewResult`.
pub fn parse_review_output(raw: &str) -> Result<ReviewResult> {
    let json = strip_markdown_fences(raw);
    serde_json::from_str(&json)
        .map_err(|e| Error::Response(format!("failed to parse review JSON: {e}")))
}

/// Remove markdown code fences from a string, returning the inner content.
/// Handles ` ```json `, ` ``` `, and bare JSON.
fn strip_markdown_fences(input: &str) -> String {
    let trimmed = input.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Opening fence line may carry a language tag
        let Some(pos) = rest.find('\n') else {
            return String::new();
        };
        let body = &rest[pos + 1..];

        if let Some(end) = body.rfind("```") {
            return body[..end].trim().to_string();
        }
        return body.trim().to_string();
    }

    trimmed.to_string()
}

/// Structured-output schema sent with every review request.
///
/// Uses the OpenAPI subset accepted by Gemini's `responseSchema`.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "One or two sentences describing the staged change."
            },
            "findings": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "severity": {
                            "type": "STRING",
                            "enum": ["error", "warning", "note"]
                        },
                        "message": { "type": "STRING" },
                        "file": { "type": "STRING", "nullable": true },
                        "lines": { "type": "STRING", "nullable": true }
                    },
                    "required": ["severity", "message"],
                    "propertyOrdering": ["severity", "message", "file", "lines"]
                }
            }
        },
        "required": ["summary", "findings"],
        "propertyOrdering": ["summary", "findings"]
    })
}
