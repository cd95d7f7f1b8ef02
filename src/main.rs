mod args;
mod audio;
mod config;
mod error;
mod output;
mod server;
mod tts;
mod utils;

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::config::Config;
use crate::tts::GeminiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let args = Args::parse();
    let config = match Config::from_env(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting TTS service: model {}, speakers [{}], output mode {:?}",
        config.model,
        config
            .speakers
            .iter()
            .map(|s| format!("{}={}", s.speaker, s.voice_name))
            .collect::<Vec<_>>()
            .join(", "),
        config.output_mode
    );

    let client = GeminiClient::new(
        &config.api_base,
        config.api_key.clone(),
        config.model.clone(),
        config.speakers.clone(),
        config.timeout,
    )?;

    server::serve(config, Arc::new(client)).await
}
