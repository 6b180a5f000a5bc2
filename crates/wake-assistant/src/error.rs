use crate::state::{SessionEvent, SessionState};
use thiserror::Error;
use voice_local::VoiceError;

pub type Result<T, E = AssistantError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AssistantError {
    /// Invalid wake configuration or settings file. Raised before capture starts.
    #[error("configuration error: {0}")]
    Config(String),
    /// The audio device failed or disappeared.
    #[error("capture error: {0}")]
    Capture(String),
    #[error("illegal session transition from {from:?} on {event:?}")]
    IllegalTransition {
        from: SessionState,
        event: SessionEvent,
    },
    #[error(transparent)]
    Voice(VoiceError),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<VoiceError> for AssistantError {
    fn from(e: VoiceError) -> Self {
        match e {
            VoiceError::Config(msg) => AssistantError::Config(msg),
            VoiceError::Capture(msg) => AssistantError::Capture(msg),
            VoiceError::Io(msg) => AssistantError::Io(msg),
            other => AssistantError::Voice(other),
        }
    }
}

impl AssistantError {
    /// Config errors mean the process never started listening.
    pub fn is_config(&self) -> bool {
        matches!(self, AssistantError::Config(_))
    }
}
