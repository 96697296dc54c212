//! rollama - stream a local Ollama completion to the terminal.
//!
//! Starts the daemon, sends the prompt given on the command line, prints the
//! generated text as it arrives and stops the daemon again.

mod client;
mod config;
mod daemon;
mod error;
mod pipeline;
mod protocol;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use client::{StreamClient, StreamEnd};
use config::Config;
use daemon::{Supervisor, SystemLauncher};
use pipeline::Pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rollama")]
#[command(author, version, about = "Interact with a local Ollama model")]
#[command(long_about = "Interact with a local Ollama model.\n\nAll arguments are joined into one prompt; the completion is streamed to stdout.")]
struct Cli {
    /// Prompt text; all words are joined with spaces
    #[arg(value_name = "PROMPT", trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Reserved; has no effect
    #[arg(short = 't', long)]
    #[allow(dead_code)]
    toggle: bool,

    /// Override the configured model
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = run(cli).await;
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    ExitCode::from(exit_status(&result))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = cli.model {
        config.model = model;
    }
    let supervisor = Supervisor::new(SystemLauncher, &config.daemon, config.model.as_str());
    let client = StreamClient::new(config.generate_url())?;
    debug!("Using model {} at {}", config.model, client.url());
    let pipeline = Pipeline::new(supervisor, client, config.model.as_str());

    let mut stdout = tokio::io::stdout();
    let outcome = pipeline.run(cli.prompt.as_slice(), &mut stdout).await?;
    match &outcome.end {
        StreamEnd::Done => {}
        StreamEnd::Closed => debug!("Stream closed without a final chunk"),
        StreamEnd::Failed(reason) => debug!("Stream cut short: {}", reason),
    }
    Ok(())
}

/// 0 once the pipeline returned, however the stream ended; 1 on any error.
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Diagnostics go to stderr; stdout carries only generated text.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rollama=warn,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
