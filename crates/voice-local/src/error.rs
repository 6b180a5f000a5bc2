use thiserror::Error;

pub type Result<T, E = VoiceError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("capture error: {0}")]
    Capture(String),
    #[error("recognition error: {0}")]
    Recognition(String),
    #[error("synthesis error: {0}")]
    Synthesis(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("backend not available: {0}")]
    Unavailable(&'static str),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<hound::Error> for VoiceError {
    fn from(err: hound::Error) -> Self {
        VoiceError::Io(err.to_string())
    }
}

impl From<std::io::Error> for VoiceError {
    fn from(err: std::io::Error) -> Self {
        VoiceError::Io(err.to_string())
    }
}
