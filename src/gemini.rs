use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_API_KEY_ENV};
use crate::error::{Error, Result};
use crate::git::StagedDiff;
use crate::prompts::PromptEngine;
use crate::review_schema::{ReviewResult, parse_review_output, response_schema};

/// Also consulted when the default key variable is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GOOGLE_API_KEY";
const INITIAL_BACKOFF_MS: u64 = 500;
const TEMPERATURE: f64 = 0.2;

/// Resolve the Gemini API key from the environment.
///
/// `lookup` maps a variable name to its value; empty values count as unset.
pub fn resolve_api_key(
    api_key_env: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(api_key_env) {
        return Ok(key);
    }
    if api_key_env == DEFAULT_API_KEY_ENV
        && let Some(key) = non_empty(FALLBACK_API_KEY_ENV)
    {
        debug!("using API key from ${FALLBACK_API_KEY_ENV}");
        return Ok(key);
    }

    Err(Error::MissingApiKey(api_key_env.to_string()))
}

/// Produces a review for a staged diff.
pub trait ReviewEngine {
    /// `diff` is expected to be non-empty.
    fn review(&self, diff: &StagedDiff) -> Result<ReviewResult>;
}

// ---------------------------------------------------------------------------
// Client abstraction (for testability)
// ---------------------------------------------------------------------------

pub trait GeminiClient {
    /// Send a `generateContent` request body for `model`, returning the raw
    /// JSON response.
    fn generate(&self, model: &str, body: &serde_json::Value) -> Result<serde_json::Value>;
}

struct HttpGeminiClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiClient for HttpGeminiClient {
    fn generate(&self, model: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.api_base);

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 1..=self.max_retries {
            match self
                .agent
                .post(&url)
                .set("x-goog-api-key", &self.api_key)
                .set("Content-Type", "application/json")
                .send_json(body)
            {
                Ok(response) => {
                    return response.into_json().map_err(|e| {
                        Error::Api(format!("failed to read Gemini response: {e}"))
                    });
                }
                Err(ref e) if attempt < self.max_retries && is_retryable(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        backoff_ms,
                        "retrying Gemini API after transient error"
                    );
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(ureq::Error::Status(code, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    return Err(Error::Api(format!(
                        "Gemini returned HTTP {code}: {}",
                        api_error_message(&body)
                    )));
                }
                Err(e) => {
                    return Err(Error::Api(format!("Gemini request failed: {e}")));
                }
            }
        }
        Err(Error::Api(format!(
            "Gemini request failed after {} attempts",
            self.max_retries
        )))
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport/network errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// ---------------------------------------------------------------------------
// generateContent wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Build a `generateContent` body that asks for JSON matching the review schema.
pub fn build_request(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
            "temperature": TEMPERATURE,
        },
    })
}

/// Turn a raw `generateContent` response into a `ReviewResult`.
pub fn extract_review(response: serde_json::Value) -> Result<ReviewResult> {
    let response: GenerateResponse = serde_json::from_value(response)
        .map_err(|e| Error::Response(format!("unexpected Gemini response shape: {e}")))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::Response(format!("prompt blocked by Gemini: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Response("Gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Response(format!(
            "Gemini returned no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    parse_review_output(&text)
}

// ---------------------------------------------------------------------------
// GeminiEngine
// ---------------------------------------------------------------------------

pub struct GeminiEngine {
    model: String,
    prompts: PromptEngine,
    client: Box<dyn GeminiClient>,
}

impl GeminiEngine {
    /// Build an engine from config. Fails without touching the network when
    /// no API key is set.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_key_env, |name| std::env::var(name).ok())?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        Ok(Self {
            model: config.model.clone(),
            prompts: PromptEngine::new(config.prompt_file.clone()),
            client: Box::new(HttpGeminiClient {
                agent,
                api_base: config.api_base.clone(),
                api_key,
                max_retries: config.max_retries,
            }),
        })
    }

    pub fn with_client(
        model: &str,
        prompts: PromptEngine,
        client: Box<dyn GeminiClient>,
    ) -> Self {
        Self {
            model: model.to_string(),
            prompts,
            client,
        }
    }
}

impl ReviewEngine for GeminiEngine {
    fn review(&self, diff: &StagedDiff) -> Result<ReviewResult> {
        let prompt = self.prompts.render_review(diff)?;
        let body = build_request(&prompt);

        info!(
            model = %self.model,
            files = diff.files.len(),
            bytes = diff.text.len(),
            "requesting review"
        );
        let response = self.client.generate(&self.model, &body)?;
        let result = extract_review(response)?;
        debug!(findings = result.findings.len(), "review received");
        Ok(result)
    }
}
