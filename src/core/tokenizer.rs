//! Token estimation for chunk sizing
//!
//! Counts are only used to decide where chunks end, so an approximate answer
//! is always preferred over an error.

use std::fmt;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Tokens per whitespace-separated word when no BPE table is available
const WORDS_PER_TOKEN_MULTIPLIER: f64 = 1.3;

enum Backend {
    /// Encoding registered for the configured model
    Model(CoreBPE),
    /// `cl100k_base`, used when the model is unknown to tiktoken
    Generic(CoreBPE),
    WordHeuristic,
}

/// Estimates model tokens for a text fragment
pub struct TokenEstimator {
    backend: Backend,
}

impl fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl TokenEstimator {
    /// Pick the most precise tokenizer available for `model`
    pub fn for_model(model: &str) -> Self {
        let backend = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Backend::Model(bpe),
            Err(e) => {
                debug!("No tokenizer registered for model {}: {}", model, e);
                match tiktoken_rs::cl100k_base() {
                    Ok(bpe) => Backend::Generic(bpe),
                    Err(e) => {
                        warn!("cl100k_base unavailable, estimating from word count: {}", e);
                        Backend::WordHeuristic
                    }
                }
            }
        };

        let estimator = Self { backend };
        debug!(
            "Token estimator for {} uses {}",
            model,
            estimator.backend_name()
        );
        estimator
    }

    /// Estimator that never loads a BPE table
    pub fn word_heuristic() -> Self {
        Self {
            backend: Backend::WordHeuristic,
        }
    }

    /// Estimate the token cost of `text`
    pub fn estimate(&self, text: &str) -> usize {
        match &self.backend {
            Backend::Model(bpe) | Backend::Generic(bpe) => {
                bpe.encode_with_special_tokens(text).len()
            }
            Backend::WordHeuristic => estimate_from_words(text),
        }
    }

    /// Name of the active backend, for logs
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Model(_) => "model tokenizer",
            Backend::Generic(_) => "cl100k_base",
            Backend::WordHeuristic => "word heuristic",
        }
    }
}

fn estimate_from_words(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * WORDS_PER_TOKEN_MULTIPLIER).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_heuristic() {
        let estimator = TokenEstimator::word_heuristic();
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("   \n\t "), 0);
        // 10 words * 1.3 = 13
        assert_eq!(estimator.estimate("one two three four five six seven eight nine ten"), 13);
        // 3 * 1.3 = 3.9 -> 4
        assert_eq!(estimator.estimate("\\section{Intro} some text"), 4);
        assert_eq!(estimator.backend_name(), "word heuristic");
    }

    #[test]
    fn test_known_model_uses_its_encoding() {
        let estimator = TokenEstimator::for_model("gpt-4");
        assert_eq!(estimator.backend_name(), "model tokenizer");
        assert!(estimator.estimate("Hello world") > 0);
    }

    #[test]
    fn test_unknown_model_falls_back_to_generic_encoding() {
        let estimator = TokenEstimator::for_model("anthropic/claude-3.5-sonnet");
        assert_eq!(estimator.backend_name(), "cl100k_base");

        let short = estimator.estimate("Hola mundo");
        let long = estimator.estimate(&"Hola mundo. ".repeat(50));
        assert!(short > 0);
        assert!(long > short);
    }
}
