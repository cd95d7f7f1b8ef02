use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SpeakerVoice;
use crate::utils::{preview, sample_rate_from_mime};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("could not parse provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("provider returned no candidates")]
    NoCandidates,
    #[error("provider response has no content parts")]
    NoContentParts,
    #[error("no audio data received from provider")]
    NoAudioData,
    #[error("audio payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),
}

/// Raw PCM returned by a generator, with the sample rate the provider
/// advertised for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: Option<u32>,
}

#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedAudio, GenerationError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    multi_speaker_voice_config: MultiSpeakerVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiSpeakerVoiceConfig<'a> {
    speaker_voice_configs: Vec<SpeakerVoiceConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerVoiceConfig<'a> {
    speaker: &'a str,
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request<'a>(prompt: &'a str, speakers: &'a [SpeakerVoice]) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![RequestContent {
            parts: vec![TextPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["AUDIO"],
            speech_config: SpeechConfig {
                multi_speaker_voice_config: MultiSpeakerVoiceConfig {
                    speaker_voice_configs: speakers
                        .iter()
                        .map(|s| SpeakerVoiceConfig {
                            speaker: &s.speaker,
                            voice_config: VoiceConfig {
                                prebuilt_voice_config: PrebuiltVoiceConfig {
                                    voice_name: &s.voice_name,
                                },
                            },
                        })
                        .collect(),
                },
            },
        },
    }
}

/// Pulls the first inline audio payload out of a `generateContent` response.
pub fn extract_audio(response: GenerateContentResponse) -> Result<GeneratedAudio, GenerationError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::NoCandidates)?;
    let part = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .ok_or(GenerationError::NoContentParts)?;
    let inline = part
        .inline_data
        .filter(|d| !d.data.is_empty())
        .ok_or(GenerationError::NoAudioData)?;

    let pcm = STANDARD.decode(inline.data.as_bytes())?;
    if pcm.is_empty() {
        return Err(GenerationError::NoAudioData);
    }
    Ok(GeneratedAudio {
        pcm,
        sample_rate: sample_rate_from_mime(&inline.mime_type),
    })
}

/// Gemini `generateContent` client configured for multi-speaker audio output.
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    speakers: Vec<SpeakerVoice>,
}

impl GeminiClient {
    pub fn new(
        api_base: &str,
        api_key: String,
        model: String,
        speakers: Vec<SpeakerVoice>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
            speakers,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl SpeechGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedAudio, GenerationError> {
        info!("Generating speech: {}", preview(prompt, 50));
        let body = build_request(prompt, &self.speakers);

        let res = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(GenerationError::Status { status, message });
        }
        debug!("Provider responded with {} bytes of JSON", text.len());

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        let audio = extract_audio(parsed)?;
        info!("Received PCM: {} bytes", audio.pcm.len());
        Ok(audio)
    }
}
