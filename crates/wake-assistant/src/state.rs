//! Command session states and their legal transitions

use crate::{AssistantError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the wake monitor.
    Idle,
    /// Capturing and transcribing one utterance.
    Listening,
    /// Classifying and dispatching the last utterance.
    Executing,
    /// Releasing session resources before returning to the monitor.
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// A wake phrase was detected.
    Detected,
    /// A transcript, possibly empty, is available.
    Transcribed,
    /// The utterance was handled and the session keeps listening.
    Handled,
    ExitRequested,
    /// The stop signal fired between turns.
    Stopped,
    /// Unrecoverable failure such as a lost capture device.
    Fatal,
    /// Session resources are released.
    Released,
}

impl SessionState {
    /// Next state for `event`, or an error if the transition is not allowed.
    pub fn on(self, event: SessionEvent) -> Result<SessionState> {
        use SessionEvent as E;
        use SessionState as S;
        match (self, event) {
            (_, E::Fatal) => Ok(S::Exiting),
            (S::Idle, E::Detected) => Ok(S::Listening),
            (S::Listening, E::Transcribed) => Ok(S::Executing),
            (S::Listening, E::Stopped) => Ok(S::Exiting),
            (S::Executing, E::Handled) => Ok(S::Listening),
            (S::Executing, E::ExitRequested) => Ok(S::Exiting),
            (S::Exiting, E::Released) => Ok(S::Idle),
            (from, event) => Err(AssistantError::IllegalTransition { from, event }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionEvent as E;
    use SessionState as S;

    const ALL_EVENTS: [SessionEvent; 7] = [
        E::Detected,
        E::Transcribed,
        E::Handled,
        E::ExitRequested,
        E::Stopped,
        E::Fatal,
        E::Released,
    ];

    #[test]
    fn test_full_cycle() {
        let mut state = S::Idle;
        for event in [
            E::Detected,
            E::Transcribed,
            E::Handled,
            E::Transcribed,
            E::ExitRequested,
            E::Released,
        ] {
            state = state.on(event).unwrap();
        }
        assert_eq!(state, S::Idle);
    }

    #[test]
    fn test_idle_only_leaves_on_detection() {
        for event in ALL_EVENTS {
            let next = S::Idle.on(event);
            match event {
                E::Detected => assert_eq!(next.unwrap(), S::Listening),
                E::Fatal => assert_eq!(next.unwrap(), S::Exiting),
                _ => assert!(next.is_err(), "{event:?} should be rejected"),
            }
        }
    }

    #[test]
    fn test_fatal_from_any_state_exits() {
        for state in [S::Idle, S::Listening, S::Executing, S::Exiting] {
            assert_eq!(state.on(E::Fatal).unwrap(), S::Exiting);
        }
    }

    #[test]
    fn test_stop_only_between_turns() {
        assert_eq!(S::Listening.on(E::Stopped).unwrap(), S::Exiting);
        assert!(matches!(
            S::Executing.on(E::Stopped),
            Err(AssistantError::IllegalTransition { .. })
        ));
    }
}
