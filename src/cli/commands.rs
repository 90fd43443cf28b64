//! CLI argument definitions and the translate handler

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::core::client::AsyncTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::models::FileReport;
use crate::processors::latex::{collect_inputs, output_path, LatexProcessor};

const EXAMPLES: &str = "\
Examples:
  latex-translator -i file1.tex file2.tex -o translated/ --source-lang galician --target-lang english
  latex-translator -i chapter_directory/ --api-key sk-xxx --source-lang spanish --target-lang english
  latex-translator -i *.tex --api-key sk-xxx --endpoint https://openrouter.ai/api/v1 --model openai/gpt-4o";

/// Translate LaTeX files using LLM APIs while preserving structure
#[derive(Parser, Debug)]
#[command(name = "latex-translator", version, about, long_about = None, after_help = EXAMPLES)]
pub struct Args {
    /// Input .tex files or directories containing .tex files
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Output directory for translated files
    #[arg(short, long, default_value = "./translated")]
    pub output: PathBuf,

    /// Source language (e.g. "galician", "spanish")
    #[arg(long)]
    pub source_lang: String,

    /// Target language (e.g. "english", "french")
    #[arg(long)]
    pub target_lang: String,

    /// API key for the LLM service
    #[arg(long, env = "LATEX_TRANSLATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API endpoint URL [default: https://openrouter.ai/api/v1]
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Model to use for translation [default: anthropic/claude-3.5-sonnet]
    #[arg(long)]
    pub model: Option<String>,

    /// Target chunk size in tokens [default: 3000]
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum tokens for the API response [default: 4000]
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, 0 to 2 [default: 0.1]
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: Option<f64>,

    /// Number of parallel translation workers [default: 3]
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Settings file (JSON, TOML or YAML) for any configuration field
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show what would be translated without making API calls
    #[arg(long)]
    pub dry_run: bool,

    /// Fail a file if any chunk cannot be translated
    #[arg(long)]
    pub strict: bool,
}

impl Args {
    /// Merge settings file, environment and flags into a validated configuration
    pub fn to_config(&self) -> crate::core::errors::Result<TranslatorConfig> {
        let mut config = TranslatorConfig::load(self.config.as_deref())?;

        config.source_lang = self.source_lang.clone();
        config.target_lang = self.target_lang.clone();

        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.api_endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(parallel) = self.parallel {
            config.max_concurrent = parallel;
        }
        config.dry_run |= self.dry_run;
        config.strict |= self.strict;

        config.validate()?;
        Ok(config)
    }
}

/// Handle the translate command
pub async fn handle_translate(args: Args) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let files = collect_inputs(&args.input)?;
    info!("Found {} .tex files to translate", files.len());

    let config = Arc::new(args.to_config()?);

    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;
    info!("Output directory: {}", args.output.display());

    let translator = Arc::new(AsyncTranslator::with_shared_config(Arc::clone(&config))?);
    translator
        .test_connection()
        .await
        .context("Failed to connect to LLM API")?;

    let processor = LatexProcessor::new(Arc::clone(&config), translator);
    info!(
        "Chunk budget {} tokens, {} workers",
        processor.chunker().budget(),
        config.max_concurrent
    );

    let reports = run_files(&processor, &files, &args.output, &config.target_lang).await?;

    let duration = start_time.elapsed();
    let fallbacks: usize = reports.iter().map(|r| r.fallbacks).sum();
    info!("Translation completed successfully!");

    println!("\n✅ Translation completed!");
    println!("   Files: {}", reports.len());
    println!("   Chunks kept untranslated: {}", fallbacks);
    println!("   Time: {:?}", duration);

    Ok(())
}

/// Translate files one after another, in order.
///
/// The first file that fails stops the batch; later files are not attempted.
pub async fn run_files(
    processor: &LatexProcessor,
    files: &[PathBuf],
    out_dir: &Path,
    target_lang: &str,
) -> anyhow::Result<Vec<FileReport>> {
    let mut reports = Vec::with_capacity(files.len());

    for (i, input) in files.iter().enumerate() {
        info!("Processing ({}/{}): {}", i + 1, files.len(), input.display());

        let output = output_path(input, out_dir, target_lang);
        let progress = chunk_progress_bar(input)?;

        let report = processor
            .translate_file(input, &output, Some(progress.clone()))
            .await
            .with_context(|| format!("Failed to translate {}", input.display()))?;

        progress.finish_with_message("Completed");
        info!(
            "{}: {} chunks, {} translated, {} skipped, {} fallbacks",
            input.display(),
            report.chunks,
            report.translated,
            report.skipped,
            report.fallbacks
        );
        reports.push(report);
    }

    Ok(reports)
}

fn chunk_progress_bar(input: &Path) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")?
            .progress_chars("=>-"),
    );
    pb.set_message(
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    Ok(pb)
}
