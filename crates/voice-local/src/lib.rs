//! voice-local: audio frames, wake-word detection and speech I/O behind
//! small blocking traits, with mock backends for hosts without audio.

mod error;
pub use error::{Result, VoiceError};

mod types;
pub use types::{
    AudioFrame, DetectionEvent, SttConfig, TtsConfig, WakeConfig, WakePhrase, BUILTIN_KEYWORDS,
    DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_SENSITIVITY,
};

mod traits;
pub use traits::{
    AudioSink, AudioSource, Speaker, SpeechToText, TtsEngine, UtteranceCapture, WakeWordDetector,
};

mod endpoint;
pub use endpoint::Endpointer;

pub mod recording;
pub use recording::RecordingBuffer;

pub mod queue;

mod resample;
pub use resample::resample_linear;

mod speaker;
pub use speaker::{LogSpeaker, SynthSpeaker};

mod wake;
pub use wake::TranscriptWakeDetector;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{
    MockDetector, MockSink, MockSource, MockSpeaker, MockStt, MockTts, ReleaseCounter,
    BACKLOG_LEVEL,
};

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::{HfInferenceStt, HfInferenceTts};

#[cfg(feature = "audio")]
pub mod mic;

#[cfg(feature = "audio")]
mod playback;
#[cfg(feature = "audio")]
pub use playback::CpalSink;

pub mod plugin;
