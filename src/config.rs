use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = ".diffaid.toml";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub api_base: Option<String>,
    pub strict: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub prompt_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model: String,
    pub api_key_env: String,
    pub api_base: String,
    pub strict: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub prompt_file: Option<PathBuf>,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        merge(ConfigFile::default(), &Cli::default())
    }
}

impl Config {
    /// Load config for a run started in `cwd`.
    ///
    /// An explicit `--config` path must exist. Otherwise `.diffaid.toml` in
    /// `cwd` is used when present, and defaults apply when it is not.
    pub fn load(cli: &Cli, cwd: &Path) -> Result<Self> {
        let file_config = match cli.config {
            Some(ref explicit) => {
                let path = Path::new(explicit);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = cwd.join(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(&path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let config = merge(file_config, cli);
        validate_model(&config.model)?;
        Ok(config)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref model) = config.model {
        validate_model(model)?;
    }
    if let Some(ref env) = config.api_key_env
        && env.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "api_key_env must not be empty".to_string(),
        ));
    }
    if let Some(ref base) = config.api_base
        && !(base.starts_with("http://") || base.starts_with("https://"))
    {
        return Err(Error::ConfigValidation(format!(
            "api_base must be an http(s) URL: {base}"
        )));
    }
    if let Some(timeout) = config.timeout_secs
        && timeout == 0
    {
        return Err(Error::ConfigValidation(
            "timeout_secs must be > 0".to_string(),
        ));
    }
    if let Some(retries) = config.max_retries
        && retries == 0
    {
        return Err(Error::ConfigValidation(
            "max_retries must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(Error::ConfigValidation(
            "model must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    Config {
        model: cli
            .model
            .clone()
            .or(file.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        api_key_env: file
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
        api_base: file
            .api_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        strict: cli.strict || file.strict.unwrap_or(false),
        timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        max_retries: file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        prompt_file: file.prompt_file.map(PathBuf::from),
        json: cli.json,
    }
}
