use crate::{AudioFrame, Result, TtsConfig};
use std::time::Duration;

/// Black-box classifier over fixed-size audio frames.
///
/// Handles are released on drop.
pub trait WakeWordDetector {
    /// Rate the capture device must be opened at.
    fn sample_rate(&self) -> u32;

    /// Number of samples every frame passed to [`process`](Self::process) must hold.
    fn frame_length(&self) -> usize;

    /// Returns the index of the wake phrase heard in this frame, if any.
    fn process(&mut self, frame: &AudioFrame) -> Result<Option<usize>>;
}

/// Blocking source of capture frames. Closed on drop.
pub trait AudioSource {
    fn sample_rate(&self) -> u32;

    /// Block until the next full frame is available.
    fn read_frame(&mut self) -> Result<AudioFrame>;

    /// Whole frames captured but not yet read, oldest first. Never blocks.
    fn drain(&mut self) -> Result<Vec<AudioFrame>> {
        Ok(Vec::new())
    }
}

/// Bounded capture of a single spoken utterance.
pub trait UtteranceCapture {
    fn sample_rate(&self) -> u32;

    /// Capture until the speaker pauses or `time_limit` elapses, whichever
    /// comes first.
    fn capture_utterance(&mut self, time_limit: Duration) -> Result<Vec<i16>>;
}

pub trait SpeechToText {
    /// Transcribe mono PCM. An empty string means nothing was recognized.
    fn transcribe(&mut self, pcm: &[i16], sample_rate: u32) -> Result<String>;
}

pub trait TtsEngine {
    fn new(config: TtsConfig) -> Result<Self>
    where
        Self: Sized;
    fn sample_rate(&self) -> u32;
    fn synthesize(&mut self, text: &str) -> Result<Vec<i16>>;
}

/// Blocking audio output.
pub trait AudioSink {
    /// Returns once playback has finished.
    fn play(&mut self, pcm: &[i16], sample_rate: u32) -> Result<()>;
}

/// Speaks a line of text and blocks until it has been heard.
pub trait Speaker {
    fn speak(&mut self, text: &str) -> Result<()>;
}

impl<T: Speaker + ?Sized> Speaker for Box<T> {
    fn speak(&mut self, text: &str) -> Result<()> {
        (**self).speak(text)
    }
}

impl<T: SpeechToText + ?Sized> SpeechToText for Box<T> {
    fn transcribe(&mut self, pcm: &[i16], sample_rate: u32) -> Result<String> {
        (**self).transcribe(pcm, sample_rate)
    }
}
