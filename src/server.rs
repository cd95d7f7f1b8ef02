use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::args::OutputMode;
use crate::audio::{PcmFormat, encode, ensure_whole_frames};
use crate::config::Config;
use crate::error::AppError;
use crate::output::{FIXED_OUTPUT_NAME, deliver};
use crate::tts::{GeneratedAudio, GenerationError, SpeechGenerator};
use crate::utils::preview;

#[derive(Clone)]
pub struct AppState {
    generator: Arc<dyn SpeechGenerator>,
    limiter: Arc<Semaphore>,
    format: PcmFormat,
    timeout: Duration,
    output_mode: OutputMode,
    output_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, generator: Arc<dyn SpeechGenerator>) -> Self {
        Self {
            generator,
            limiter: Arc::new(Semaphore::new(config.max_concurrent)),
            format: config.format,
            timeout: config.timeout,
            output_mode: config.output_mode,
            output_dir: config.output_dir.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub result: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/audio", post(audio))
        .route("/api/ping", post(ping))
        .with_state(state)
}

pub async fn serve(config: Config, generator: Arc<dyn SpeechGenerator>) -> anyhow::Result<()> {
    if config.output_mode == OutputMode::FixedPath {
        warn!(
            "Fixed-path output writes every response to {}; concurrent requests can clobber each other",
            config.output_dir.join(FIXED_OUTPUT_NAME).display()
        );
    }
    let app = router(AppState::new(&config, generator));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse { result: "pong" })
}

async fn audio(
    State(state): State<AppState>,
    payload: Result<Json<AudioRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("prompt is required"))?;

    info!("Request received: /audio ({})", preview(&prompt, 50));
    if let Some(content) = req.content.as_deref() {
        debug!("Request content: {}", preview(content, 50));
    }

    let started = Instant::now();
    let wav = synthesize(&state, &prompt).await?;
    info!(
        "Audio ready: {} bytes in {:.2}s",
        wav.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(deliver(wav, state.output_mode, &state.output_dir).await?)
}

/// Runs generation under the concurrency limit and timeout, then frames the
/// PCM as WAV on the blocking pool.
async fn synthesize(state: &AppState, prompt: &str) -> Result<Vec<u8>, AppError> {
    let generation = async {
        let _permit = state
            .limiter
            .acquire()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok::<_, AppError>(state.generator.generate(prompt).await?)
    };
    // The bound covers queueing for a permit as well as the provider call.
    let audio = tokio::time::timeout(state.timeout, generation)
        .await
        .map_err(|_| GenerationError::Timeout(state.timeout))??;

    let format = resolve_format(state.format, &audio);
    let GeneratedAudio { pcm, .. } = audio;
    let wav = tokio::task::spawn_blocking(move || {
        ensure_whole_frames(&pcm, format)?;
        let wav = encode(&pcm, format.channels, format.sample_rate, format.sample_width)?;
        info!(
            "WAV encoded: {} bytes, {:.2}s of audio",
            wav.len(),
            format.duration_secs(pcm.len())
        );
        Ok::<_, AppError>(wav)
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))??;
    Ok(wav)
}

/// Prefers the rate the provider advertised over the configured one.
fn resolve_format(configured: PcmFormat, audio: &GeneratedAudio) -> PcmFormat {
    match audio.sample_rate {
        Some(rate) if rate != configured.sample_rate => {
            warn!(
                "Provider reported {} Hz audio, expected {} Hz; using provider rate",
                rate, configured.sample_rate
            );
            configured.with_sample_rate(rate)
        }
        _ => configured,
    }
}
