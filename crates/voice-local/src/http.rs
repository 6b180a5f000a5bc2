//! Hosted speech backends on the HuggingFace inference API.
//!
//! Both backends read the API token from `HUGGINGFACEHUB_API_TOKEN`. The
//! model URLs can be overridden with `HF_INFERENCE_URL` (speech-to-text)
//! and `HF_TTS_URL` (text-to-speech).

use crate::recording::{decode_wav, encode_wav};
use crate::resample::resample_linear;
use crate::{Result, SpeechToText, SttConfig, TtsConfig, TtsEngine, VoiceError};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_STT_URL: &str = "https://api-inference.huggingface.co/models/openai/whisper-large-v3";
pub const DEFAULT_TTS_URL: &str = "https://api-inference.huggingface.co/models/facebook/mms-tts-eng";

const TOKEN_VAR: &str = "HUGGINGFACEHUB_API_TOKEN";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn token_from_env() -> Result<String> {
    std::env::var(TOKEN_VAR)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| VoiceError::Config(format!("{TOKEN_VAR} is not set")))
}

fn client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| VoiceError::Config(format!("http client: {e}")))
}

/// Pull the transcript out of an inference response. Most ASR models
/// answer `{"text": "..."}`; anything else is taken as plain text.
fn parse_transcript(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("text")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        Err(_) => body.trim().to_string(),
    }
}

pub struct HfInferenceStt {
    client: Client,
    url: String,
    token: String,
    config: SttConfig,
}

impl HfInferenceStt {
    pub fn new(config: SttConfig) -> Result<Self> {
        let url = std::env::var("HF_INFERENCE_URL").unwrap_or_else(|_| DEFAULT_STT_URL.to_string());
        Ok(Self {
            client: client()?,
            url,
            token: token_from_env()?,
            config,
        })
    }
}

impl SpeechToText for HfInferenceStt {
    fn transcribe(&mut self, pcm: &[i16], sample_rate: u32) -> Result<String> {
        if pcm.is_empty() {
            return Ok(String::new());
        }
        let target = self.config.sample_rate_hz;
        let audio = resample_linear(pcm, sample_rate, target);
        let bytes = encode_wav(&audio, target)?;

        let resp = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "audio/wav")
            .body(bytes)
            .send()
            .map_err(|e| VoiceError::Recognition(format!("inference request: {e}")))?;

        if !resp.status().is_success() {
            return Err(VoiceError::Recognition(format!("HF inference error: {}", resp.status())));
        }

        let body = resp
            .text()
            .map_err(|e| VoiceError::Recognition(format!("inference response: {e}")))?;
        debug!("HF API response: {}", body);
        Ok(parse_transcript(&body))
    }
}

pub struct HfInferenceTts {
    client: Client,
    url: String,
    token: String,
    config: TtsConfig,
}

impl TtsEngine for HfInferenceTts {
    fn new(config: TtsConfig) -> Result<Self> {
        let url = std::env::var("HF_TTS_URL").unwrap_or_else(|_| DEFAULT_TTS_URL.to_string());
        Ok(Self {
            client: client()?,
            url,
            token: token_from_env()?,
            config,
        })
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn synthesize(&mut self, text: &str) -> Result<Vec<i16>> {
        let resp = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "audio/wav")
            .json(&serde_json::json!({ "inputs": text }))
            .send()
            .map_err(|e| VoiceError::Synthesis(format!("inference request: {e}")))?;

        if !resp.status().is_success() {
            return Err(VoiceError::Synthesis(format!("HF inference error: {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| VoiceError::Synthesis(format!("inference response: {e}")))?;
        let (pcm, rate) = decode_wav(&bytes)?;
        Ok(resample_linear(&pcm, rate, self.config.sample_rate_hz))
    }
}
