//! LaTeX file processor: read, chunk, translate, reassemble, write

use indicatif::ProgressBar;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::core::client::ChunkTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::dispatcher::Dispatcher;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ChunkOutcome, Document, FileReport};
use crate::core::tokenizer::TokenEstimator;
use crate::processors::chunker::LatexChunker;

const TEX_EXTENSION: &str = "tex";

/// Translates `.tex` files one at a time
#[derive(Clone)]
pub struct LatexProcessor {
    config: Arc<TranslatorConfig>,
    chunker: LatexChunker,
    translator: Arc<dyn ChunkTranslator>,
}

impl LatexProcessor {
    /// Create a new LaTeX processor
    pub fn new(config: Arc<TranslatorConfig>, translator: Arc<dyn ChunkTranslator>) -> Self {
        let estimator = Arc::new(TokenEstimator::for_model(&config.model));
        Self::with_estimator(config, translator, estimator)
    }

    /// Create a processor with an explicit token estimator
    pub fn with_estimator(
        config: Arc<TranslatorConfig>,
        translator: Arc<dyn ChunkTranslator>,
        estimator: Arc<TokenEstimator>,
    ) -> Self {
        let chunker = LatexChunker::new(config.chunk_size, estimator);
        Self {
            config,
            chunker,
            translator,
        }
    }

    pub fn chunker(&self) -> &LatexChunker {
        &self.chunker
    }

    /// Translate one file and write the result to `output`.
    ///
    /// Nothing is written in dry-run mode. In strict mode the first chunk that
    /// fell back turns into an error and nothing is written either.
    pub async fn translate_file(
        &self,
        input: &Path,
        output: &Path,
        progress: Option<ProgressBar>,
    ) -> Result<FileReport> {
        let span = info_span!("file", path = %input.display());
        self.translate_file_inner(input, output, progress)
            .instrument(span)
            .await
    }

    async fn translate_file_inner(
        &self,
        input: &Path,
        output: &Path,
        progress: Option<ProgressBar>,
    ) -> Result<FileReport> {
        info!("Starting translation: {} -> {}", input.display(), output.display());

        let document = Document::new(
            input.to_path_buf(),
            output.to_path_buf(),
            read_document(input).await?,
        );

        let chunks = self.chunker.chunk(&document.content);
        info!("Created {} chunks", chunks.len());

        let mut dispatcher = Dispatcher::new(Arc::clone(&self.translator), self.config.max_concurrent);
        if let Some(progress) = progress {
            dispatcher = dispatcher.with_progress(progress);
        }
        let outcomes = dispatcher.translate_all(&chunks).await;

        if self.config.strict {
            if let Some((index, outcome)) = outcomes
                .iter()
                .enumerate()
                .find(|(_, outcome)| outcome.is_fallback())
            {
                return Err(TranslationError::ChunkFailed {
                    index: index + 1,
                    reason: outcome.reason().unwrap_or_default().to_string(),
                });
            }
        }

        let mut report =
            FileReport::from_outcomes(document.source.clone(), document.output.clone(), &outcomes);

        let translated = if outcomes.is_empty() {
            document.content.clone()
        } else {
            outcomes.into_iter().map(ChunkOutcome::into_text).collect()
        };

        if report.fallbacks > 0 {
            warn!(
                "{} of {} chunks kept their original text",
                report.fallbacks, report.chunks
            );
        }

        if self.config.dry_run {
            info!(
                "[DRY RUN] Would write {} characters to {}",
                translated.chars().count(),
                document.output.display()
            );
        } else {
            write_document(&document.output, translated).await?;
            report.written = true;
            info!("Translation completed: {}", document.output.display());
        }

        Ok(report)
    }
}

/// Expand input arguments into the `.tex` files to translate, in argument order.
///
/// Files must exist and carry the `.tex` extension; directories contribute
/// every `.tex` file below them.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(TranslationError::InputError {
                path: path.display().to_string(),
                message: "Path not found".to_string(),
            });
        }

        if path.is_file() {
            if !is_tex_file(path) {
                return Err(TranslationError::InputError {
                    path: path.display().to_string(),
                    message: "File must have .tex extension".to_string(),
                });
            }
            files.push(path.clone());
        } else if path.is_dir() {
            let found = find_tex_files(path)?;
            if found.is_empty() {
                warn!("No .tex files found in directory: {}", path.display());
            } else {
                info!("Found {} .tex files in {}", found.len(), path.display());
                files.extend(found);
            }
        } else {
            return Err(TranslationError::InputError {
                path: path.display().to_string(),
                message: "Path is neither file nor directory".to_string(),
            });
        }
    }

    Ok(files)
}

/// Find `.tex` files recursively, sorted by path
pub fn find_tex_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TranslationError::FileError {
            path: dir.display().to_string(),
            message: "Not a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && is_tex_file(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Check if file is LaTeX source
fn is_tex_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(TEX_EXTENSION))
        .unwrap_or(false)
}

/// `<out_dir>/<stem>_<target_lang>.<ext>`
pub fn output_path(input: &Path, out_dir: &Path, target_lang: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, target_lang, ext.to_string_lossy()),
        None => format!("{}_{}", stem, target_lang),
    };

    out_dir.join(file_name)
}

/// Read a source file as UTF-8, falling back to Latin-1
pub async fn read_document(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TranslationError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    Ok(decode_text(bytes, path))
}

fn decode_text(bytes: Vec<u8>, path: &Path) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("{} is not valid UTF-8, decoding as Latin-1", path.display());
            // Every Latin-1 byte is the code point of the same value
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// Write UTF-8 through a temporary file in the target directory, then rename
pub async fn write_document(path: &Path, content: String) -> Result<()> {
    let path = path.to_path_buf();
    let display = path.display().to_string();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut file = tempfile::NamedTempFile::new_in(&parent)?;
        file.write_all(content.as_bytes())?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| TranslationError::InternalError(e.to_string()))?
    .map_err(|e| TranslationError::FileError {
        path: display,
        message: e.to_string(),
    })
}
