//! Configuration management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};

/// Default OpenAI-compatible gateway
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Prefix for environment overrides, e.g. `LATEX_TRANSLATE_API_KEY`
pub const ENV_PREFIX: &str = "LATEX_TRANSLATE";

/// Configuration for translator
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Token budget per chunk
    pub chunk_size: usize,
    /// Response token cap sent with every request
    pub max_tokens: u32,
    pub temperature: f64,
    pub dry_run: bool,
    /// Worker count for the chunk dispatcher
    pub max_concurrent: usize,
    /// Transport attempts per request, first try included
    pub max_retries: u32,
    /// Base backoff delay, doubled on every further attempt
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    /// How many 429 responses a single request may wait out
    pub max_rate_limit_retries: u32,
    /// Wait used when a 429 carries no usable `Retry-After`
    pub default_retry_after_secs: u64,
    /// Fail the file instead of keeping untranslated chunks
    pub strict: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            source_lang: String::new(),
            target_lang: String::new(),
            chunk_size: 3000,
            max_tokens: 4000,
            temperature: 0.1,
            dry_run: false,
            max_concurrent: 3,
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 60000,
            max_rate_limit_retries: 5,
            default_retry_after_secs: 60,
            strict: false,
        }
    }
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("api_endpoint", &self.api_endpoint)
            .field("model", &self.model)
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("chunk_size", &self.chunk_size)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("dry_run", &self.dry_run)
            .field("max_concurrent", &self.max_concurrent)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .field("default_retry_after_secs", &self.default_retry_after_secs)
            .field("strict", &self.strict)
            .finish()
    }
}

impl TranslatorConfig {
    /// Create a configuration with the three required values and defaults elsewhere
    pub fn new(
        api_key: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    /// Load defaults, then an optional settings file, then `LATEX_TRANSLATE_*` variables.
    ///
    /// The result is not validated; callers apply their own overrides first and
    /// then call [`TranslatorConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.is_file() {
                return Err(TranslationError::config(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TranslationError::config("API key is required"));
        }

        if self.source_lang.trim().is_empty() || self.target_lang.trim().is_empty() {
            return Err(TranslationError::config(
                "Both source and target languages are required",
            ));
        }

        if self.api_endpoint.trim().is_empty() {
            return Err(TranslationError::config("API endpoint is required"));
        }

        if self.chunk_size == 0 {
            return Err(TranslationError::config("Chunk size must be positive"));
        }

        if self.max_tokens == 0 {
            return Err(TranslationError::config("Max tokens must be positive"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TranslationError::config(
                "Temperature must be between 0 and 2",
            ));
        }

        if self.max_concurrent == 0 {
            return Err(TranslationError::config(
                "max_concurrent must be greater than 0",
            ));
        }

        if self.max_retries == 0 {
            return Err(TranslationError::config(
                "max_retries must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Full URL of the chat completions route
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_endpoint.trim_end_matches('/'))
    }

    /// Whether the endpoint is the OpenRouter gateway, which accepts attribution headers
    pub fn is_openrouter(&self) -> bool {
        reqwest::Url::parse(&self.api_endpoint)
            .ok()
            .and_then(|url| {
                url.host_str()
                    .map(|host| host == "openrouter.ai" || host.ends_with(".openrouter.ai"))
            })
            .unwrap_or(false)
    }
}
