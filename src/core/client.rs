//! Async translation client with retry and fallback logic

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::ChunkOutcome;

/// Lead-ins some models put in front of the answer despite the prompt
const BOILERPLATE_PREFIXES: &[&str] = &[
    "TRANSLATION:",
    "Translation:",
    "Here is the translation:",
    "The translation is:",
];

const OPENROUTER_REFERER: &str = "https://github.com/latex-translate/latex-translate";
const OPENROUTER_TITLE: &str = "LaTeX Translation Tool";

const CONNECTION_TEST_TEXT: &str = "Hello world";

/// Number of characters of a chunk shown in log lines
const LOG_PREVIEW_CHARS: usize = 100;

/// Translates one chunk of a document.
///
/// Implementations never fail: a chunk that cannot be translated comes back
/// as [`ChunkOutcome::Fallback`] carrying the original text.
#[async_trait]
pub trait ChunkTranslator: Send + Sync {
    async fn translate(&self, text: &str) -> ChunkOutcome;
}

/// Client for OpenAI-compatible chat completion endpoints
#[derive(Debug, Clone)]
pub struct AsyncTranslator {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl AsyncTranslator {
    /// Create a new async translator
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        Self::with_shared_config(Arc::new(config))
    }

    /// Create a translator that shares an already wrapped configuration
    pub fn with_shared_config(config: Arc<TranslatorConfig>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(config.max_concurrent)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Build the instruction prompt for one chunk
    pub fn build_prompt(&self, text: &str) -> String {
        format!(
            "Translate from {source} to {target}. Preserve ALL LaTeX commands, citations, \
             references, labels, and math exactly as they are. Only translate the readable \
             text content.\n\n\
             Return ONLY the translated LaTeX code with no explanations, no \"Here is the \
             translation:\", no prefixes - just start directly with the translated content.\n\n\
             {text}",
            source = self.config.source_lang,
            target = self.config.target_lang,
            text = text,
        )
    }

    /// Check that the endpoint answers with a usable completion.
    ///
    /// Unlike chunk translation, every failure here is returned to the caller,
    /// including a response body without a completion in it.
    pub async fn test_connection(&self) -> Result<()> {
        if self.config.dry_run {
            info!("[DRY RUN] Skipping connection test");
            return Ok(());
        }

        match self.translate_text(CONNECTION_TEST_TEXT).await {
            Ok(_) => {
                info!("API connection test successful");
                Ok(())
            }
            Err(e) => {
                error!("API connection test failed: {}", e);
                Err(e)
            }
        }
    }

    /// Translate text and return every failure as an error
    pub async fn translate_text(&self, text: &str) -> Result<String> {
        let prompt = self.build_prompt(text);
        let response = self.complete(&prompt).await?;
        extract_translation(&response)
    }

    /// Send a prompt, waiting out rate limits a bounded number of times
    async fn complete(&self, prompt: &str) -> Result<Value> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": prompt
            }],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let mut waits = 0;
        loop {
            match self.send_with_retry(&body).await {
                Err(TranslationError::RateLimitError { retry_after })
                    if waits < self.config.max_rate_limit_retries =>
                {
                    waits += 1;
                    let wait = retry_after.unwrap_or(self.config.default_retry_after_secs);
                    warn!(
                        "Rate limited. Waiting {} seconds... ({}/{})",
                        wait, waits, self.config.max_rate_limit_retries
                    );
                    sleep(Duration::from_secs(wait)).await;
                }
                other => return other,
            }
        }
    }

    /// Retry transient failures with exponential backoff
    async fn send_with_retry(&self, body: &Value) -> Result<Value> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self
                    .config
                    .retry_delay_ms
                    .saturating_mul(2_u64.saturating_pow(attempt - 1));
                debug!("Retry attempt {} in {} ms", attempt + 1, delay);
                sleep(Duration::from_millis(delay)).await;
            }

            match self.send_request(body).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!("Request succeeded after {} retries", attempt);
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    warn!("Request attempt {}/{} failed: {}", attempt + 1, attempts, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TranslationError::InternalError("no request attempts were made".to_string())
        }))
    }

    /// Send actual HTTP request
    async fn send_request(&self, body: &Value) -> Result<Value> {
        let url = self.config.completions_url();
        debug!("Making API call to {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body);

        for (name, value) in vendor_headers(&self.config) {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();

        if status.is_success() {
            // A body cut short is a transport failure; only undecodable bytes are malformed
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TranslationError::NetworkError {
                    message: e.to_string(),
                })?;
            return serde_json::from_slice(&bytes).map_err(|e| {
                TranslationError::InvalidResponseError {
                    message: e.to_string(),
                }
            });
        }

        let status_code = status.as_u16();

        if status_code == 429 {
            let retry_after = parse_retry_after(response.headers());
            return Err(TranslationError::RateLimitError { retry_after });
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(TranslationError::ApiError {
            status: status_code,
            message: error_text,
        })
    }
}

#[async_trait]
impl ChunkTranslator for AsyncTranslator {
    async fn translate(&self, text: &str) -> ChunkOutcome {
        if self.config.dry_run {
            info!("[DRY RUN] Would translate: {}...", preview(text));
            return ChunkOutcome::Placeholder(format!("[TRANSLATED] {}", text));
        }

        match self.translate_text(text).await {
            Ok(translated) => {
                debug!("Translated: '{}...'", preview(&translated));
                ChunkOutcome::Translated(restore_surrounding_whitespace(text, &translated))
            }
            Err(e) => {
                error!("Translation failed for text: {}...", preview(text));
                error!("Error: {}", e);
                ChunkOutcome::fallback(text, e.to_string())
            }
        }
    }
}

/// Pull the first completion out of a chat response and strip model chatter
pub fn extract_translation(response: &Value) -> Result<String> {
    let content = response["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: format!("No translation in response: {}", response),
        })?;

    let mut content = content.trim();
    for prefix in BOILERPLATE_PREFIXES {
        if let Some(rest) = content.strip_prefix(prefix) {
            content = rest.trim();
        }
    }

    Ok(content.to_string())
}

/// Attribution headers the OpenRouter gateway accepts; other endpoints get none
fn vendor_headers(config: &TranslatorConfig) -> Vec<(&'static str, &'static str)> {
    if config.is_openrouter() {
        vec![("HTTP-Referer", OPENROUTER_REFERER), ("X-Title", OPENROUTER_TITLE)]
    } else {
        Vec::new()
    }
}

/// `Retry-After` as whole seconds; HTTP-date values are not supported
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Put the chunk's own leading and trailing whitespace back around a trimmed translation
fn restore_surrounding_whitespace(original: &str, translated: &str) -> String {
    let trimmed_start = original.trim_start();
    let leading = &original[..original.len() - trimmed_start.len()];
    let trailing = &trimmed_start[trimmed_start.trim_end().len()..];
    format!("{}{}{}", leading, translated, trailing)
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}
