//! Main entry point for the LaTeX Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use latex_translator::cli::commands::{handle_translate, Args};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();
    let verbose = args.verbose;

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("latex_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tokio::select! {
        result = handle_translate(args) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Translation failed: {:#}", e);
                if verbose {
                    debug!("Full error details: {:?}", e);
                }
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Translation interrupted by user");
            ExitCode::FAILURE
        }
    }
}
