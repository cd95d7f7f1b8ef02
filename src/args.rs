use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Respond straight from the encoded buffer.
    Memory,
    /// Write each response to its own temporary file and send that back.
    TempFile,
    /// Overwrite `output.wav` in the output directory on every request.
    FixedPath,
}

#[derive(Parser, Debug)]
#[clap(about = "HTTP service turning multi-speaker prompts into WAV audio")]
pub struct Args {
    #[clap(long, env = "TTS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[clap(long, env = "TTS_PORT", default_value_t = 8000)]
    pub port: u16,

    #[clap(long, env = "GEMINI_TTS_MODEL", default_value = "gemini-2.5-flash-preview-tts")]
    pub model: String,

    #[clap(
        long,
        env = "GEMINI_API_BASE",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub api_base: String,

    /// Comma separated `speaker=voice` pairs.
    #[clap(long, env = "TTS_SPEAKERS", default_value = "A=Leda,B=Gacrux")]
    pub speakers: String,

    #[clap(long, env = "TTS_OUTPUT_MODE", value_enum, default_value_t = OutputMode::Memory)]
    pub output_mode: OutputMode,

    /// Defaults to the system temp directory.
    #[clap(long, env = "TTS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[clap(long, env = "TTS_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    #[clap(long, env = "TTS_MAX_CONCURRENT", default_value_t = 4)]
    pub max_concurrent: usize,

    #[clap(long, env = "TTS_SAMPLE_RATE", default_value_t = 24_000)]
    pub sample_rate: u32,
}
