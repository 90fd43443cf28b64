//! Bounded concurrent dispatch of chunk translations

use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, Instrument};

use crate::core::client::ChunkTranslator;
use crate::core::models::ChunkOutcome;

/// Runs a [`ChunkTranslator`] over every chunk of a document with at most
/// `workers` translations in flight.
#[derive(Clone)]
pub struct Dispatcher {
    translator: Arc<dyn ChunkTranslator>,
    workers: usize,
    progress: Option<ProgressBar>,
}

impl Dispatcher {
    pub fn new(translator: Arc<dyn ChunkTranslator>, workers: usize) -> Self {
        Self {
            translator,
            workers: workers.max(1),
            progress: None,
        }
    }

    /// Advance `progress` once per finished chunk
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Translate all chunks, returning one outcome per chunk in input order.
    ///
    /// Whitespace-only chunks are passed through without a request. A worker
    /// that panics or is cancelled yields a fallback for its chunk only.
    pub async fn translate_all(&self, chunks: &[String]) -> Vec<ChunkOutcome> {
        let total = chunks.len();
        let mut results: Vec<Option<ChunkOutcome>> = Vec::with_capacity(total);
        results.resize_with(total, || None);

        if let Some(progress) = &self.progress {
            progress.set_length(total as u64);
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut pending = FuturesUnordered::new();

        for (index, chunk) in chunks.iter().enumerate() {
            if chunk.trim().is_empty() {
                results[index] = Some(ChunkOutcome::Skipped(chunk.clone()));
                continue;
            }

            let translator = Arc::clone(&self.translator);
            let semaphore = Arc::clone(&semaphore);
            let text = chunk.clone();

            let handle = tokio::spawn(
                async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return ChunkOutcome::fallback(text, e.to_string()),
                    };
                    info!("Translating chunk {}/{}", index + 1, total);
                    translator.translate(&text).await
                }
                .instrument(info_span!("chunk", index = index + 1)),
            );

            pending.push(async move { (index, handle.await) });
        }

        let mut completed = total - pending.len();
        if let Some(progress) = &self.progress {
            progress.set_position(completed as u64);
        }

        while let Some((index, joined)) = pending.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to translate chunk {}: {}", index + 1, e);
                    ChunkOutcome::fallback(chunks[index].clone(), format!("worker failed: {}", e))
                }
            };

            completed += 1;
            info!("Completed {}/{} chunks", completed, total);
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }

            results[index] = Some(outcome);
        }

        results
            .into_iter()
            .zip(chunks)
            .map(|(outcome, chunk)| {
                outcome.unwrap_or_else(|| ChunkOutcome::fallback(chunk.clone(), "no result recorded"))
            })
            .collect()
    }
}
