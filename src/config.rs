use anyhow::{Context, bail};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::{Args, OutputMode};
use crate::audio::PcmFormat;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// One speaker label in the prompt and the prebuilt voice that reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerVoice {
    pub speaker: String,
    pub voice_name: String,
}

impl SpeakerVoice {
    pub fn new(speaker: impl Into<String>, voice_name: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            voice_name: voice_name.into(),
        }
    }
}

/// Parses `A=Leda,B=Gacrux` into an ordered speaker mapping.
pub fn parse_speakers(spec: &str) -> anyhow::Result<Vec<SpeakerVoice>> {
    let mut seen = HashSet::new();
    let mut speakers = Vec::new();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (speaker, voice) = pair
            .split_once('=')
            .with_context(|| format!("speaker entry '{}' is not of the form label=voice", pair))?;
        let (speaker, voice) = (speaker.trim(), voice.trim());
        if speaker.is_empty() || voice.is_empty() {
            bail!("speaker entry '{}' has an empty label or voice", pair);
        }
        if !seen.insert(speaker.to_string()) {
            bail!("speaker label '{}' appears more than once", speaker);
        }
        speakers.push(SpeakerVoice::new(speaker, voice));
    }
    if speakers.is_empty() {
        bail!("at least one speaker=voice pair is required");
    }
    Ok(speakers)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub speakers: Vec<SpeakerVoice>,
    pub format: PcmFormat,
    pub output_mode: OutputMode,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub max_concurrent: usize,
}

impl Config {
    pub fn from_args(args: Args, api_key: Option<String>) -> anyhow::Result<Self> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .with_context(|| format!("{} must be set", API_KEY_ENV))?;
        if args.max_concurrent == 0 {
            bail!("--max-concurrent must be at least 1");
        }
        if args.timeout_secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }
        if args.sample_rate == 0 {
            bail!("--sample-rate must be greater than 0");
        }

        Ok(Self {
            bind_addr: format!("{}:{}", args.host, args.port),
            api_key,
            api_base: args.api_base,
            model: args.model,
            speakers: parse_speakers(&args.speakers)?,
            format: PcmFormat::mono16(args.sample_rate),
            output_mode: args.output_mode,
            output_dir: args.output_dir.unwrap_or_else(std::env::temp_dir),
            timeout: Duration::from_secs(args.timeout_secs),
            max_concurrent: args.max_concurrent,
        })
    }

    pub fn from_env(args: Args) -> anyhow::Result<Self> {
        Self::from_args(args, std::env::var(API_KEY_ENV).ok())
    }
}
