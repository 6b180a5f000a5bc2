#[cfg(feature = "http")]
use crate::{HfInferenceStt, HfInferenceTts};
#[cfg(feature = "mock")]
use crate::{MockStt, MockTts};
use crate::{
    Result, SpeechToText, SttConfig, TranscriptWakeDetector, TtsConfig, TtsEngine, VoiceError,
    WakeConfig, WakeWordDetector, DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE_HZ,
};
use tracing::info;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SttBackendKind {
    Mock,
    HfInference,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TtsBackendKind {
    Mock,
    HfInference,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WakeBackendKind {
    /// Windowed transcription with fuzzy phrase matching.
    Transcript,
}

pub fn new_stt_backend(kind: SttBackendKind, cfg: SttConfig) -> Result<Box<dyn SpeechToText + Send>> {
    match kind {
        SttBackendKind::Mock => {
            #[cfg(feature = "mock")]
            {
                let _ = cfg;
                Ok(Box::new(MockStt::default()))
            }
            #[cfg(not(feature = "mock"))]
            {
                let _ = cfg;
                Err(VoiceError::Unavailable("mock feature not enabled"))
            }
        }
        SttBackendKind::HfInference => {
            #[cfg(feature = "http")]
            {
                HfInferenceStt::new(cfg).map(|s| Box::new(s) as Box<dyn SpeechToText + Send>)
            }
            #[cfg(not(feature = "http"))]
            {
                let _ = cfg;
                Err(VoiceError::Unavailable("http feature not enabled"))
            }
        }
    }
}

pub fn new_tts_backend(kind: TtsBackendKind, cfg: TtsConfig) -> Result<Box<dyn TtsEngine + Send>> {
    match kind {
        TtsBackendKind::Mock => {
            #[cfg(feature = "mock")]
            {
                MockTts::new(cfg).map(|t| Box::new(t) as Box<dyn TtsEngine + Send>)
            }
            #[cfg(not(feature = "mock"))]
            {
                let _ = cfg;
                Err(VoiceError::Unavailable("mock feature not enabled"))
            }
        }
        TtsBackendKind::HfInference => {
            #[cfg(feature = "http")]
            {
                HfInferenceTts::new(cfg).map(|t| Box::new(t) as Box<dyn TtsEngine + Send>)
            }
            #[cfg(not(feature = "http"))]
            {
                let _ = cfg;
                Err(VoiceError::Unavailable("http feature not enabled"))
            }
        }
    }
}

/// Build a wake detector for `config`. The recognizer is only used by the
/// transcript backend.
pub fn new_wake_detector(
    kind: WakeBackendKind,
    config: &WakeConfig,
    stt: Box<dyn SpeechToText + Send>,
) -> Result<Box<dyn WakeWordDetector + Send>> {
    config.validate()?;
    match kind {
        WakeBackendKind::Transcript => {
            if let Some(model) = config.model_path() {
                info!(model = %model.display(), "model file ignored by transcript wake backend");
            }
            let detector =
                TranscriptWakeDetector::new(config, stt, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_FRAME_LENGTH)?;
            Ok(Box::new(detector))
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;

    #[test]
    fn test_wake_factory_validates_first() {
        let bad: WakeConfig =
            serde_json::from_str(r#"{"phrases":[{"name":"jarvis","resource":"jarvis.ppn"}],"sensitivities":[]}"#)
                .unwrap();
        let stt = new_stt_backend(SttBackendKind::Mock, SttConfig::default()).unwrap();
        let err = new_wake_detector(WakeBackendKind::Transcript, &bad, stt).err().unwrap();
        assert!(matches!(err, VoiceError::Config(_)));
    }

    #[test]
    fn test_transcript_backend_properties() {
        let cfg = WakeConfig::from_keywords(&["jarvis".to_string()], None).unwrap();
        let stt = new_stt_backend(SttBackendKind::Mock, SttConfig::default()).unwrap();
        let det = new_wake_detector(WakeBackendKind::Transcript, &cfg, stt).unwrap();
        assert_eq!(det.sample_rate(), DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(det.frame_length(), DEFAULT_FRAME_LENGTH);
    }
}
