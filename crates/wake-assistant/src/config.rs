use crate::{AssistantError, Result};
use intent_parser::{AppCommands, IntentConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use voice_local::{SttConfig, TtsConfig};

/// Longest single utterance a session will wait for.
pub const MAX_PHRASE_TIME_LIMIT_SECS: f32 = 60.0;

/// Settings file for the assistant. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Name used in the greeting and farewell.
    pub user_name: String,
    /// Upper bound on a single utterance capture.
    pub phrase_time_limit_secs: f32,
    pub intents: IntentConfig,
    pub apps: AppCommands,
    pub stt: SttConfig,
    pub tts: TtsConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            user_name: "friend".to_string(),
            phrase_time_limit_secs: 5.0,
            intents: IntentConfig::default(),
            apps: AppCommands::default(),
            stt: SttConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Read `path`, or write the defaults there if it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| AssistantError::Config(format!("{}: {e}", path.display())))?;
            let config: Self = serde_json::from_str(&contents)
                .map_err(|e| AssistantError::Config(format!("{}: {e}", path.display())))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            info!(path = %path.display(), "wrote default assistant config");
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AssistantError::Config(e.to_string()))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| AssistantError::Io(e.to_string()))?;
        }
        fs::write(path, json).map_err(|e| AssistantError::Io(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let secs = self.phrase_time_limit_secs;
        if !(secs > 0.0 && secs <= MAX_PHRASE_TIME_LIMIT_SECS) {
            return Err(AssistantError::Config(format!(
                "phrase_time_limit_secs must be in (0, {MAX_PHRASE_TIME_LIMIT_SECS}], got {secs}"
            )));
        }
        Ok(())
    }

    /// The capture limit. Out-of-range values, which `validate` rejects,
    /// fall back to the 5 s default.
    pub fn phrase_time_limit(&self) -> Duration {
        let secs = self.phrase_time_limit_secs;
        if secs > 0.0 && secs <= MAX_PHRASE_TIME_LIMIT_SECS {
            Duration::from_secs_f32(secs)
        } else {
            Duration::from_secs(5)
        }
    }
}
