// src/main.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use crate::classifier::ollama::{fetch_models, OllamaSource};
use crate::config::Settings;

mod classifier;
mod config;
mod gui;
mod picker;
mod state;
mod trigger;
mod worker;

#[derive(Parser)]
#[command(name = "snapclassify")]
#[command(about = "Pick a photo and classify it with a local Ollama vision model", long_about = None)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct BackendArgs {
    /// Ollama model name (e.g., "llava:latest")
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// Ollama server URL (default: $OLLAMA_HOST or http://localhost:11434)
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Number of ranked labels to ask the model for
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// HTTP timeout for a classification request, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the graphical picker (default)
    Gui,
    /// Classify a single image file and print the result
    Classify {
        /// Path to the image
        path: PathBuf,
    },
    /// Check that the Ollama server is reachable
    CheckOllama,
    /// List available Ollama models
    ListModels,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info")
    );

    let cli = Cli::parse();
    let settings = Settings::resolve(
        cli.backend.ollama_url,
        cli.backend.model,
        cli.backend.top_k,
        cli.backend.timeout_secs,
    );

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => gui::run_gui(settings),
        Commands::Classify { path } => run_classify(settings, path),
        Commands::CheckOllama => check_ollama_status(&settings),
        Commands::ListModels => list_ollama_models(&settings),
    }
}

fn run_classify(settings: Settings, path: PathBuf) -> Result<()> {
    info!("Classifying {} headless", path.display());

    let image = picker::decode_image(&path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let source = OllamaSource::new(settings);
    let outcome = trigger::classify_image(&source, &image);

    match outcome.display_text() {
        Some(text) => println!("{}", text),
        None => println!("No results"),
    }

    Ok(())
}

fn list_ollama_models(settings: &Settings) -> Result<()> {
    info!("Listing Ollama models at {}...", settings.ollama_url);

    match fetch_models(settings) {
        Ok(models) => {
            println!("\nAvailable models:");
            if models.is_empty() {
                println!("  No models found");
            }
            for model in &models {
                let size_gb = model.size as f64 / (1024.0 * 1024.0 * 1024.0);
                println!("  - {} ({:.1} GB)", model.name, size_gb);
            }
            println!();

            println!("Suggested vision models for classification:");
            println!("  - llava:latest (general vision model)");
            println!("  - llava:13b (larger, more accurate)");
            println!("  - llava:7b (smaller, faster)");
        }
        Err(e) => {
            error!("{:#}", e);
            println!("\nMake sure Ollama is running: ollama serve");
        }
    }

    Ok(())
}

fn check_ollama_status(settings: &Settings) -> Result<()> {
    info!("Checking Ollama status at {}...", settings.ollama_url);

    match fetch_models(settings) {
        Ok(models) => {
            println!("✓ Ollama is running at {}", settings.ollama_url);
            println!("✓ {} model(s) available", models.len());
            if models.iter().any(|m| m.name == settings.model_name) {
                println!("✓ Model {} is pulled", settings.model_name);
            } else {
                println!("✗ Model {} is missing. Pull it with: ollama pull {}", settings.model_name, settings.model_name);
            }
        }
        Err(e) => {
            println!("✗ Could not connect to Ollama at {}", settings.ollama_url);
            println!("  Error: {:#}", e);
            println!("\nTroubleshooting:");
            println!("  1. Install Ollama: https://ollama.ai");
            println!("  2. Start Ollama: ollama serve");
            println!("  3. Pull a vision model: ollama pull {}", settings.model_name);
        }
    }

    Ok(())
}
