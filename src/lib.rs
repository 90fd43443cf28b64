//! LaTeX Translator - concurrent LaTeX translation over LLM APIs
//!
//! Documents are split into token-budgeted chunks along sectioning commands
//! and paragraphs, translated concurrently through an OpenAI-compatible chat
//! completions endpoint, and reassembled in their original order. Chunks that
//! cannot be translated keep their original text.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod processors;

// Re-export key types for convenience
pub use crate::core::{
    client::{AsyncTranslator, ChunkTranslator},
    config::TranslatorConfig,
    dispatcher::Dispatcher,
    errors::{Result, TranslationError},
    models::{ChunkOutcome, Document, FileReport},
    tokenizer::TokenEstimator,
};

pub use crate::processors::{chunker::LatexChunker, latex::LatexProcessor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
