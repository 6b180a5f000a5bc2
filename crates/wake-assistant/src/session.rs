//! Conversational loop run after each wake-word detection

use crate::{AssistantConfig, Result, SessionEvent, SessionState, StopSignal};
use intent_parser::{ActionExecutor, DispatchError, Intent, IntentParser, Utterance};
use std::time::Duration;
use tracing::{debug, error, info, info_span, trace, warn};
use uuid::Uuid;
use voice_local::{DetectionEvent, Speaker, SpeechToText, UtteranceCapture};

const APOLOGY: &str = "Could not understand your audio, please try again!";
const FALLBACK_PROMPT: &str =
    "I don't understand, I can search the web for you, Do you want to continue?";
const LAUNCH_FAILED: &str = "I couldn't open that.";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub user_name: String,
    pub phrase_time_limit: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            user_name: "friend".to_string(),
            phrase_time_limit: Duration::from_secs(5),
        }
    }
}

impl From<&AssistantConfig> for SessionSettings {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            user_name: config.user_name.clone(),
            phrase_time_limit: config.phrase_time_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ExitPhrase,
    Stopped,
}

/// Summary of one finished session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub phrase_index: usize,
    pub phrase: String,
    /// Utterances captured, including empty ones and the exit phrase.
    pub turns: usize,
    /// Utterances that matched a rule and were dispatched.
    pub dispatched: usize,
    pub ended_by: SessionEnd,
}

pub struct CommandSession {
    settings: SessionSettings,
    parser: IntentParser,
    executor: ActionExecutor,
    stt: Box<dyn SpeechToText>,
    speaker: Box<dyn Speaker>,
    stop: StopSignal,
    state: SessionState,
}

impl CommandSession {
    pub fn new(
        settings: SessionSettings,
        parser: IntentParser,
        executor: ActionExecutor,
        stt: Box<dyn SpeechToText>,
        speaker: Box<dyn Speaker>,
        stop: StopSignal,
    ) -> Self {
        Self {
            settings,
            parser,
            executor,
            stt,
            speaker,
            stop,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Greet the user and handle utterances until an exit phrase, the stop
    /// signal or a fatal error. Always returns to `Idle`.
    pub fn run(
        &mut self,
        event: &DetectionEvent,
        capture: &mut dyn UtteranceCapture,
    ) -> Result<SessionOutcome> {
        let session_id = Uuid::new_v4();
        let span = info_span!("session", id = %session_id, phrase = %event.phrase);
        let _guard = span.enter();

        let mut turns = 0;
        let mut dispatched = 0;
        let result = self.converse(capture, &mut turns, &mut dispatched);
        if let Err(e) = &result {
            error!(error = %e, "session aborted");
            self.advance(SessionEvent::Fatal)?;
        }
        self.advance(SessionEvent::Released)?;
        debug!(turns, dispatched, "session finished");

        result.map(|ended_by| SessionOutcome {
            session_id,
            phrase_index: event.phrase_index,
            phrase: event.phrase.clone(),
            turns,
            dispatched,
            ended_by,
        })
    }

    fn converse(
        &mut self,
        capture: &mut dyn UtteranceCapture,
        turns: &mut usize,
        dispatched: &mut usize,
    ) -> Result<SessionEnd> {
        self.advance(SessionEvent::Detected)?;
        let greeting = format!("Hello, {}.", self.settings.user_name);
        self.say(&greeting);

        loop {
            if self.stop.is_stopped() {
                info!("stop requested, leaving session");
                self.advance(SessionEvent::Stopped)?;
                return Ok(SessionEnd::Stopped);
            }

            let utterance = self.listen(capture)?;
            if self.stop.is_stopped() {
                // stopped mid-capture; whatever was heard is not acted on
                info!("stop requested, discarding last utterance");
                self.advance(SessionEvent::Stopped)?;
                return Ok(SessionEnd::Stopped);
            }
            self.advance(SessionEvent::Transcribed)?;
            *turns += 1;

            if utterance.is_empty() {
                self.say(APOLOGY);
            } else if self.parser.is_exit(&utterance) {
                let farewell = format!("Ok bye, {}.", self.settings.user_name);
                self.say(&farewell);
                self.advance(SessionEvent::ExitRequested)?;
                return Ok(SessionEnd::ExitPhrase);
            } else if let Some(parsed) = self.parser.classify(&utterance) {
                *dispatched += 1;
                self.dispatch(&parsed.intent, &utterance, capture)?;
            } else {
                debug!(text = utterance.normalized(), "no rule matched");
            }
            self.advance(SessionEvent::Handled)?;
        }
    }

    /// Capture and transcribe one utterance. Recognition failures become an
    /// empty utterance; capture failures are fatal.
    fn listen(&mut self, capture: &mut dyn UtteranceCapture) -> Result<Utterance> {
        info!("listening...");
        let pcm = capture.capture_utterance(self.settings.phrase_time_limit)?;
        if pcm.is_empty() {
            return Ok(Utterance::empty());
        }
        match self.stt.transcribe(&pcm, capture.sample_rate()) {
            Ok(text) => {
                let utterance = Utterance::new(text);
                if utterance.is_empty() {
                    warn!("nothing recognised");
                } else {
                    info!("You: {}", utterance.original());
                }
                Ok(utterance)
            }
            Err(e) => {
                warn!(error = %e, "transcription failed");
                Ok(Utterance::empty())
            }
        }
    }

    fn dispatch(
        &mut self,
        intent: &Intent,
        utterance: &Utterance,
        capture: &mut dyn UtteranceCapture,
    ) -> Result<()> {
        match self.executor.execute(intent, self.speaker.as_mut()) {
            Ok(report) => {
                debug!(action = report.action, ms = report.execution_time_ms, "dispatched");
            }
            Err(DispatchError::Network(e)) => {
                warn!(error = %e, intent = intent.name(), "dispatch failed, offering web search");
                self.say(FALLBACK_PROMPT);
                let reply = self.listen(capture)?;
                if self.parser.is_affirmative(&reply) {
                    if let Err(e) = self.executor.search_fallback(utterance, self.speaker.as_mut()) {
                        warn!(error = %e, "web search fallback failed");
                    }
                }
            }
            Err(DispatchError::Launch(e)) => {
                warn!(error = %e, intent = intent.name(), "launch failed");
                self.say(LAUNCH_FAILED);
            }
            Err(DispatchError::Speech(e)) => {
                warn!(error = %e, intent = intent.name(), "response could not be spoken");
            }
        }
        Ok(())
    }

    fn say(&mut self, text: &str) {
        if let Err(e) = self.speaker.speak(text) {
            warn!(error = %e, "speech output failed");
        }
    }

    fn advance(&mut self, event: SessionEvent) -> Result<()> {
        let next = self.state.on(event)?;
        trace!(from = ?self.state, ?event, to = ?next, "session transition");
        self.state = next;
        Ok(())
    }
}
