use crate::{Result, VoiceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Capture rate expected by the bundled wake detectors.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
/// Samples per frame (32 ms at 16 kHz).
pub const DEFAULT_FRAME_LENGTH: usize = 512;
pub const DEFAULT_SENSITIVITY: f32 = 0.5;

/// Wake phrases that ship with a keyword resource.
pub const BUILTIN_KEYWORDS: &[&str] = &[
    "alexa",
    "americano",
    "blueberry",
    "bumblebee",
    "computer",
    "grapefruit",
    "grasshopper",
    "hey google",
    "hey siri",
    "jarvis",
    "ok google",
    "picovoice",
    "porcupine",
    "terminator",
];

const KEYWORD_RESOURCE_DIR: &str = "resources/keyword_files";

/// One capture period of mono signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Box<[i16]>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }

    /// Silent frame of `len` samples.
    pub fn silence(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    /// Decode little-endian S16 bytes as delivered by raw capture APIs.
    /// A trailing odd byte is ignored.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root-mean-square level normalized to `[0, 1]`.
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }
}

pub(crate) fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let v = f64::from(s) / 32768.0;
            v * v
        })
        .sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// A wake phrase and the detection resource backing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakePhrase {
    pub name: String,
    pub resource: PathBuf,
}

impl WakePhrase {
    /// Look up a phrase from the built-in catalogue.
    pub fn builtin(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        BUILTIN_KEYWORDS
            .iter()
            .find(|k| **k == name)
            .map(|k| Self {
                name: (*k).to_string(),
                resource: Path::new(KEYWORD_RESOURCE_DIR).join(format!("{}.ppn", k.replace(' ', "_"))),
            })
    }

    /// Derive the phrase name from a keyword file such as
    /// `resources/jarvis_linux_compressed.ppn` (-> `jarvis`).
    pub fn from_resource_path(path: impl Into<PathBuf>) -> Self {
        let resource = path.into();
        let stem = resource
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stripped = stem.replace(".ppn", "").replace("_compressed", "");
        let name = stripped.split('_').next().unwrap_or_default().to_string();
        Self { name, resource }
    }
}

/// Immutable wake-word configuration, one sensitivity per phrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeConfig {
    phrases: Vec<WakePhrase>,
    sensitivities: Vec<f32>,
    #[serde(default)]
    model_path: Option<PathBuf>,
}

impl WakeConfig {
    pub fn new(phrases: Vec<WakePhrase>, sensitivities: Vec<f32>) -> Result<Self> {
        let config = Self {
            phrases,
            sensitivities,
            model_path: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build from built-in phrase names. `None` sensitivities default to
    /// [`DEFAULT_SENSITIVITY`] for every phrase.
    pub fn from_keywords(names: &[String], sensitivities: Option<Vec<f32>>) -> Result<Self> {
        let mut phrases = Vec::with_capacity(names.len());
        for name in names {
            let phrase = WakePhrase::builtin(name).ok_or_else(|| {
                VoiceError::Config(format!(
                    "unknown wake phrase '{}'; available: {}",
                    name.trim(),
                    BUILTIN_KEYWORDS.join(", ")
                ))
            })?;
            phrases.push(phrase);
        }
        let sensitivities = sensitivities.unwrap_or_else(|| vec![DEFAULT_SENSITIVITY; phrases.len()]);
        Self::new(phrases, sensitivities)
    }

    pub fn from_resource_paths(paths: &[PathBuf], sensitivities: Option<Vec<f32>>) -> Result<Self> {
        let phrases: Vec<WakePhrase> = paths.iter().cloned().map(WakePhrase::from_resource_path).collect();
        let sensitivities = sensitivities.unwrap_or_else(|| vec![DEFAULT_SENSITIVITY; phrases.len()]);
        Self::new(phrases, sensitivities)
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Check phrase/sensitivity pairing. Deserialized configs are not
    /// validated until this is called.
    pub fn validate(&self) -> Result<()> {
        if self.phrases.is_empty() {
            return Err(VoiceError::Config("no wake phrases configured".into()));
        }
        if self.phrases.len() != self.sensitivities.len() {
            return Err(VoiceError::Config(format!(
                "{} wake phrases but {} sensitivities",
                self.phrases.len(),
                self.sensitivities.len()
            )));
        }
        if let Some(s) = self.sensitivities.iter().find(|s| !(0.0..=1.0).contains(*s)) {
            return Err(VoiceError::Config(format!("sensitivity {s} outside [0, 1]")));
        }
        if let Some(p) = self.phrases.iter().find(|p| p.name.trim().is_empty()) {
            return Err(VoiceError::Config(format!(
                "cannot derive a phrase name from {}",
                p.resource.display()
            )));
        }
        Ok(())
    }

    pub fn phrases(&self) -> &[WakePhrase] {
        &self.phrases
    }

    pub fn phrase(&self, index: usize) -> Option<&WakePhrase> {
        self.phrases.get(index)
    }

    pub fn sensitivities(&self) -> &[f32] {
        &self.sensitivities
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// A positive wake-word detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub phrase_index: usize,
    pub phrase: String,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    pub language: Option<String>,
    pub sample_rate_hz: u32,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            language: Some("en-US".to_string()),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    pub voice: Option<String>,
    pub sample_rate_hz: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice: None,
            sample_rate_hz: 22_050,
        }
    }
}
