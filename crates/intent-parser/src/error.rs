use thiserror::Error;
use voice_local::VoiceError;

pub type Result<T, E = DispatchError> = core::result::Result<T, E>;

/// Failure while carrying out a classified command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A remote service could not be reached or answered with an error.
    #[error("network error: {0}")]
    Network(String),
    /// A browser or application could not be started.
    #[error("launch failed: {0}")]
    Launch(String),
    /// The spoken response could not be played.
    #[error("speech output failed: {0}")]
    Speech(#[from] VoiceError),
}
