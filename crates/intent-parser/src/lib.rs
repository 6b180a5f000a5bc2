//! Intent Parser for Voice Commands
//!
//! Classifies transcribed utterances with an ordered table of keyword rules
//! and carries the resulting intents out: canned replies, calculator
//! lookups, web searches and application launches.

mod error;
pub use error::{DispatchError, Result};

mod utterance;
pub use utterance::Utterance;

mod actions;
pub use actions::{AppTarget, Intent, SearchRequest, SearchSite};

mod parser;
pub use parser::{IntentParser, ParseResult, Rule, RuleKind, DEFAULT_RULES};

mod executor;
pub use executor::{ActionExecutor, AppLauncher, Calculator, ExecutionReport, WebSearch};

mod system;
pub use system::{AppCommands, SystemBrowser, SystemLauncher};

#[cfg(feature = "http")]
mod wolfram;
#[cfg(feature = "http")]
pub use wolfram::WolframAlpha;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockCalculator, RecordingLauncher, RecordingSearch};

use serde::{Deserialize, Serialize};

/// Wording and phrase lists used for classification and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    pub assistant_name: String,
    pub creator_name: String,
    pub joke: String,
    /// Substrings that end a session. Matched literally, so "go " needs
    /// a following word.
    pub exit_phrases: Vec<String>,
    /// Substrings accepted as "yes" to the web-search offer.
    pub affirmatives: Vec<String>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Jarvis".to_string(),
            creator_name: "Jason".to_string(),
            joke: "Well, there are two kinds of people: those who can extrapolate from incomplete data."
                .to_string(),
            exit_phrases: ["exit", "bye", "go ", "sleep"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            affirmatives: ["yes", "yeah"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IntentConfig {
    pub fn identity_reply(&self) -> String {
        format!(
            "Hello, I am {}. Your personal Assistant. I am here to make your life easier. \
             You can command me to perform various tasks such as calculating sums or opening applications etcetera",
            self.assistant_name
        )
    }

    pub fn creator_reply(&self) -> String {
        format!("I have been created by {}.", self.creator_name)
    }
}

/// Create a new intent parser with default configuration
pub fn create_parser() -> IntentParser {
    IntentParser::new(IntentConfig::default())
}

/// Classify a single transcript with the default rules.
pub fn parse_command(text: &str) -> Option<ParseResult> {
    create_parser().classify(&Utterance::new(text))
}
