use crate::{
    AudioFrame, AudioSink, AudioSource, Result, Speaker, SpeechToText, TtsConfig, TtsEngine,
    VoiceError, WakeWordDetector, DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE_HZ,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counts how many times a mock resource has been released.
pub type ReleaseCounter = Arc<AtomicUsize>;

/// Detector that fires on scripted frame numbers (1-based).
pub struct MockDetector {
    sample_rate_hz: u32,
    frame_length: usize,
    frames_seen: u64,
    matches: HashMap<u64, usize>,
    released: Option<ReleaseCounter>,
}

impl MockDetector {
    pub fn new() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            frame_length: DEFAULT_FRAME_LENGTH,
            frames_seen: 0,
            matches: HashMap::new(),
            released: None,
        }
    }

    pub fn with_frame_length(mut self, frame_length: usize) -> Self {
        self.frame_length = frame_length;
        self
    }

    /// Report `phrase_index` when the `frame`-th frame is processed.
    pub fn match_at(mut self, frame: u64, phrase_index: usize) -> Self {
        self.matches.insert(frame, phrase_index);
        self
    }

    pub fn with_release_counter(mut self, counter: ReleaseCounter) -> Self {
        self.released = Some(counter);
        self
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeWordDetector for MockDetector {
    fn sample_rate(&self) -> u32 {
        self.sample_rate_hz
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &AudioFrame) -> Result<Option<usize>> {
        if frame.len() != self.frame_length {
            return Err(VoiceError::Capture(format!(
                "expected {} samples per frame, got {}",
                self.frame_length,
                frame.len()
            )));
        }
        self.frames_seen += 1;
        Ok(self.matches.get(&self.frames_seen).copied())
    }
}

impl Drop for MockDetector {
    fn drop(&mut self) {
        if let Some(counter) = &self.released {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Amplitude of the frames a [`MockSource`] backlog is filled with.
pub const BACKLOG_LEVEL: i16 = 12_000;

/// Endless silent capture, optionally failing after a fixed number of frames.
pub struct MockSource {
    sample_rate_hz: u32,
    frame_length: usize,
    frames_read: u64,
    limit: Option<u64>,
    pace: bool,
    backlog: usize,
    released: Option<ReleaseCounter>,
}

impl MockSource {
    pub fn new(sample_rate_hz: u32, frame_length: usize) -> Self {
        Self {
            sample_rate_hz,
            frame_length,
            frames_read: 0,
            limit: None,
            pace: false,
            backlog: 0,
            released: None,
        }
    }

    /// Queue `frames` loud frames that only [`AudioSource::drain`] returns,
    /// as if audio piled up while nobody was reading.
    pub fn with_backlog(mut self, frames: usize) -> Self {
        self.backlog = frames;
        self
    }

    /// Fail with a capture error once `frames` frames have been delivered.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Sleep one frame period per read, like a real device.
    pub fn realtime(mut self) -> Self {
        self.pace = true;
        self
    }

    pub fn with_release_counter(mut self, counter: ReleaseCounter) -> Self {
        self.released = Some(counter);
        self
    }
}

impl AudioSource for MockSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate_hz
    }

    fn read_frame(&mut self) -> Result<AudioFrame> {
        if self.limit.is_some_and(|limit| self.frames_read >= limit) {
            return Err(VoiceError::Capture("mock stream exhausted".into()));
        }
        if self.pace {
            let micros = self.frame_length as u64 * 1_000_000 / u64::from(self.sample_rate_hz.max(1));
            std::thread::sleep(Duration::from_micros(micros));
        }
        self.frames_read += 1;
        Ok(AudioFrame::silence(self.frame_length))
    }

    fn drain(&mut self) -> Result<Vec<AudioFrame>> {
        let frames = std::mem::take(&mut self.backlog);
        Ok((0..frames)
            .map(|_| AudioFrame::new(vec![BACKLOG_LEVEL; self.frame_length]))
            .collect())
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        if let Some(counter) = &self.released {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Recognizer that replays a script of transcripts. Once the script runs
/// out every call yields an empty transcript.
#[derive(Debug, Default)]
pub struct MockStt {
    script: VecDeque<core::result::Result<String, String>>,
}

impl MockStt {
    pub fn new<I, T>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            script: transcripts.into_iter().map(|t| Ok(t.into())).collect(),
        }
    }

    pub fn push(&mut self, transcript: impl Into<String>) {
        self.script.push_back(Ok(transcript.into()));
    }

    /// Queue a recognition failure.
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.script.push_back(Err(reason.into()));
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SpeechToText for MockStt {
    fn transcribe(&mut self, _pcm: &[i16], _sample_rate: u32) -> Result<String> {
        match self.script.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(VoiceError::Recognition(reason)),
            None => Ok(String::new()),
        }
    }
}

pub struct MockTts {
    cfg: TtsConfig,
}

impl TtsEngine for MockTts {
    fn new(config: TtsConfig) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(Self { cfg: config })
    }

    fn sample_rate(&self) -> u32 {
        self.cfg.sample_rate_hz.max(8000)
    }

    fn synthesize(&mut self, text: &str) -> Result<Vec<i16>> {
        // Produce a short 440Hz sine placeholder based on text length
        let sr = self.sample_rate();
        let dur_s = (text.len() as f32 / 10.0).clamp(0.2, 1.0);
        let frames = (sr as f32 * dur_s) as usize;
        let freq = 440.0_f32;
        let out = (0..frames)
            .map(|n| {
                let t = n as f32 / sr as f32;
                ((2.0 * std::f32::consts::PI * freq * t).sin() * 3000.0) as i16
            })
            .collect();
        Ok(out)
    }
}

/// Sink that records the length of every clip instead of playing it.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    played: Arc<Mutex<Vec<usize>>>,
}

impl MockSink {
    pub fn played(&self) -> Vec<usize> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl AudioSink for MockSink {
    fn play(&mut self, pcm: &[i16], _sample_rate: u32) -> Result<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(pcm.len());
        }
        Ok(())
    }
}

/// Speaker that records every line. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MockSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl MockSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A speaker whose playback always fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Speaker for MockSpeaker {
    fn speak(&mut self, text: &str) -> Result<()> {
        if self.failing {
            return Err(VoiceError::Playback("mock speaker offline".into()));
        }
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_fires_on_scripted_frame() {
        let mut det = MockDetector::new().with_frame_length(4).match_at(3, 1);
        let frame = AudioFrame::silence(4);
        assert_eq!(det.process(&frame).unwrap(), None);
        assert_eq!(det.process(&frame).unwrap(), None);
        assert_eq!(det.process(&frame).unwrap(), Some(1));
        assert_eq!(det.process(&frame).unwrap(), None);
        assert!(det.process(&AudioFrame::silence(3)).is_err());
    }

    #[test]
    fn test_release_counted_once() {
        let counter = ReleaseCounter::default();
        {
            let _det = MockDetector::new().with_release_counter(counter.clone());
            let _src = MockSource::new(16_000, 512).with_release_counter(counter.clone());
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_source_limit() {
        let mut src = MockSource::new(16_000, 8).with_limit(2);
        assert_eq!(src.read_frame().unwrap().len(), 8);
        assert!(src.read_frame().is_ok());
        assert!(matches!(src.read_frame(), Err(VoiceError::Capture(_))));
    }

    #[test]
    fn test_backlog_drained_once() {
        let mut src = MockSource::new(16_000, 8).with_backlog(3);
        assert!(src.read_frame().unwrap().samples().iter().all(|&s| s == 0));
        let drained = src.drain().unwrap();
        assert_eq!(drained.len(), 3);
        assert!(drained[0].samples().iter().all(|&s| s == BACKLOG_LEVEL));
        assert!(src.drain().unwrap().is_empty());
    }

    #[test]
    fn test_stt_script() {
        let mut stt = MockStt::new(["hello"]);
        stt.push_failure("garbled");
        assert_eq!(stt.transcribe(&[], 16_000).unwrap(), "hello");
        assert!(matches!(stt.transcribe(&[], 16_000), Err(VoiceError::Recognition(_))));
        assert_eq!(stt.transcribe(&[], 16_000).unwrap(), "");
    }

    #[test]
    fn test_mock_tts_length() {
        let mut tts = MockTts::new(TtsConfig {
            voice: None,
            sample_rate_hz: 8000,
        })
        .unwrap();
        let pcm = tts.synthesize("hi").unwrap();
        assert_eq!(pcm.len(), 1600);
    }
}
