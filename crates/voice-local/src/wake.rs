//! Transcript-based wake word spotting.
//!
//! Frames are collected into a short sliding window. Windows with enough
//! energy are transcribed and each configured phrase is fuzzy-matched
//! against the words heard. Sensitivity scales how many character edits a
//! match may tolerate: `0.0` only accepts an exact spelling.

use crate::types::rms;
use crate::{AudioFrame, Result, SpeechToText, WakeConfig, WakeWordDetector};
use tracing::{debug, trace, warn};

/// Window length handed to the recognizer.
const WINDOW_MS: u32 = 1500;

/// Windows quieter than this are not worth a transcription.
const ENERGY_GATE: f32 = 0.01;

pub struct TranscriptWakeDetector<S> {
    stt: S,
    phrases: Vec<Vec<String>>,
    sensitivities: Vec<f32>,
    sample_rate_hz: u32,
    frame_length: usize,
    window: Vec<i16>,
    window_samples: usize,
}

impl<S: SpeechToText> TranscriptWakeDetector<S> {
    pub fn new(
        config: &WakeConfig,
        stt: S,
        sample_rate_hz: u32,
        frame_length: usize,
    ) -> Result<Self> {
        config.validate()?;
        let phrases = config
            .phrases()
            .iter()
            .map(|p| p.name.to_lowercase().split_whitespace().map(String::from).collect())
            .collect();
        let window_samples = (sample_rate_hz * WINDOW_MS / 1000) as usize;
        debug!(
            phrases = ?config.phrases().iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            window_samples,
            "transcript wake detector initialized"
        );
        Ok(Self {
            stt,
            phrases,
            sensitivities: config.sensitivities().to_vec(),
            sample_rate_hz,
            frame_length,
            window: Vec::with_capacity(window_samples),
            window_samples,
        })
    }

    fn match_phrase(&self, text: &str) -> Option<usize> {
        let heard: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
            .filter(|w| !w.is_empty())
            .collect();

        self.phrases.iter().enumerate().find_map(|(index, words)| {
            if words.is_empty() || heard.len() < words.len() {
                return None;
            }
            let sensitivity = self.sensitivities.get(index).copied().unwrap_or_default();
            heard
                .windows(words.len())
                .any(|candidate| {
                    candidate
                        .iter()
                        .zip(words)
                        .all(|(spoken, expected)| fuzzy_match(expected, spoken, sensitivity))
                })
                .then_some(index)
        })
    }
}

impl<S: SpeechToText> WakeWordDetector for TranscriptWakeDetector<S> {
    fn sample_rate(&self) -> u32 {
        self.sample_rate_hz
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &AudioFrame) -> Result<Option<usize>> {
        self.window.extend_from_slice(frame.samples());
        if self.window.len() < self.window_samples {
            return Ok(None);
        }

        let level = rms(&self.window);
        if level < ENERGY_GATE {
            trace!(level, "quiet window skipped");
            self.slide();
            return Ok(None);
        }

        let text = match self.stt.transcribe(&self.window, self.sample_rate_hz) {
            Ok(text) => text,
            Err(e) => {
                warn!("wake window transcription failed: {e}");
                String::new()
            }
        };
        trace!(text = %text, "wake window transcript");

        match self.match_phrase(&text) {
            Some(index) => {
                self.window.clear();
                Ok(Some(index))
            }
            None => {
                self.slide();
                Ok(None)
            }
        }
    }
}

impl<S> TranscriptWakeDetector<S> {
    // Keep the newer half so a phrase straddling two windows is still heard.
    fn slide(&mut self) {
        let keep = self.window_samples / 2;
        if self.window.len() > keep {
            let drop = self.window.len() - keep;
            self.window.drain(..drop);
        }
    }
}

fn fuzzy_match(expected: &str, actual: &str, sensitivity: f32) -> bool {
    if expected == actual {
        return true;
    }
    let max_dist = ((expected.chars().count() as f32) * sensitivity / 3.0).round() as usize;
    max_dist > 0 && levenshtein(expected, actual) <= max_dist
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut cur = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        prev = cur;
    }
    prev[b.len()]
}
