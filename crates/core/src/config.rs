use crate::error::ConfigError;
use crate::models::CompletionOptions;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const OCR_COMMAND_VAR: &str = "TESSERACT_CMD";
pub const BASE_URL_VAR: &str = "STUDYGENIE_BASE_URL";
pub const MODEL_VAR: &str = "STUDYGENIE_MODEL";
pub const TEMPERATURE_VAR: &str = "STUDYGENIE_TEMPERATURE";
pub const MAX_TOKENS_VAR: &str = "STUDYGENIE_MAX_TOKENS";
pub const TIMEOUT_VAR: &str = "STUDYGENIE_TIMEOUT_SECS";
pub const OCR_TIMEOUT_VAR: &str = "STUDYGENIE_OCR_TIMEOUT_SECS";
pub const WORKDIR_VAR: &str = "STUDYGENIE_WORKDIR";

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WORKDIR: &str = "temp";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are StudyGenie, an AI study assistant. \
Explain concepts clearly, step by step, in simple language.";

const WINDOWS_TESSERACT: &str = r"C:\Program Files\Tesseract-OCR\tesseract.exe";

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub ocr_command: PathBuf,
    pub ocr_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ocr_command: PathBuf::from("tesseract"),
            ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
        }
    }
}

impl ExtractorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = parse_or(&lookup, OCR_TIMEOUT_VAR, DEFAULT_OCR_TIMEOUT_SECS)?;
        Ok(Self {
            ocr_command: resolve_ocr_command(lookup(OCR_COMMAND_VAR).as_deref()),
            ocr_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Picks the OCR executable: an existing override path, then the Windows
/// install location, then whatever `tesseract` resolves to on `PATH`.
pub fn resolve_ocr_command(override_path: Option<&str>) -> PathBuf {
    if let Some(candidate) = non_blank(override_path.map(str::to_string)) {
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            return candidate;
        }
    }

    if cfg!(windows) && Path::new(WINDOWS_TESSERACT).exists() {
        return PathBuf::from(WINDOWS_TESSERACT);
    }

    PathBuf::from("tesseract")
}

#[derive(Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub options: CompletionOptions,
    pub timeout: Duration,
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CompletionConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            api_key: api_key.into(),
            options: CompletionOptions::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key =
            non_blank(lookup(API_KEY_VAR)).ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;
        let base_url =
            non_blank(lookup(BASE_URL_VAR)).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let defaults = CompletionOptions::default();
        let temperature = parse_or(&lookup, TEMPERATURE_VAR, defaults.temperature)?;
        let options = CompletionOptions {
            model: non_blank(lookup(MODEL_VAR)).unwrap_or(defaults.model),
            temperature: validate_temperature(temperature)?,
            max_tokens: parse_or(&lookup, MAX_TOKENS_VAR, defaults.max_tokens)?,
        };

        Ok(Self {
            base_url: validate_base_url(&base_url)?,
            api_key,
            options,
            timeout: Duration::from_secs(parse_or(&lookup, TIMEOUT_VAR, DEFAULT_TIMEOUT_SECS)?),
        })
    }

    pub fn set_base_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.base_url = validate_base_url(raw)?;
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ConfigError> {
        self.options.temperature = validate_temperature(temperature)?;
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub completion: CompletionConfig,
    pub extractor: ExtractorConfig,
    pub workdir: PathBuf,
    pub system_prompt: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            completion: CompletionConfig::from_lookup(&lookup)?,
            extractor: ExtractorConfig::from_lookup(&lookup)?,
            workdir: non_blank(lookup(WORKDIR_VAR))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKDIR)),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_blank(lookup(name)) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

fn validate_temperature(value: f32) -> Result<f32, ConfigError> {
    if (0.0..=2.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            name: TEMPERATURE_VAR,
            value: value.to_string(),
        })
    }
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw.trim())?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
