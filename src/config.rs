//! Configuration for the practice simulator
//!
//! Loaded from a TOML file (default location under the platform config
//! directory) with a handful of environment overrides for scripting.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dialogue::{
    AvatarIdentity, ConversationMode, Language, Session, VoiceIdentity,
};
use crate::{Error, Result};

/// Service endpoints consumed by the core
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    /// Transcription (STT) endpoint
    pub transcription_url: String,
    /// Dialogue endpoint (session creation and exchanges)
    pub dialogue_url: String,
    /// Reply stream endpoint base (session id is appended per turn)
    pub stream_url: String,
    /// Speech synthesis endpoint
    pub synthesis_url: String,
}

/// Scenario selection
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario identifier, unqualified
    pub name: String,
    /// Conversation mode
    #[serde(default = "default_mode")]
    pub mode: ConversationMode,
}

const fn default_mode() -> ConversationMode {
    ConversationMode::Training
}

/// Practice simulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service endpoints
    pub endpoints: Endpoints,
    /// Scenario to run
    pub scenario: ScenarioConfig,
    /// Avatar identities for the dialogue boundary
    pub avatar: AvatarIdentity,
    /// Voice used for spoken replies
    pub voice: VoiceIdentity,
    /// Practice language
    pub language: Language,
}

impl Config {
    /// Default config file path under the platform config directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "omni", "parley")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from a TOML file, then apply env overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, unreadable, or invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is invalid.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `PARLEY_*` environment overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(scenario) = std::env::var("PARLEY_SCENARIO") {
            self.scenario.name = scenario;
        }
        if let Ok(language) = std::env::var("PARLEY_LANGUAGE") {
            self.language = Language { name: language };
        }
        if let Ok(mode) = std::env::var("PARLEY_MODE") {
            match mode.to_lowercase().as_str() {
                "training" => self.scenario.mode = ConversationMode::Training,
                "freeform" => self.scenario.mode = ConversationMode::Freeform,
                other => {
                    tracing::warn!(mode = other, "unknown PARLEY_MODE, keeping configured mode");
                }
            }
        }
    }

    /// Reject configurations the core cannot run with
    fn validate(&self) -> Result<()> {
        if self.scenario.name.trim().is_empty() {
            return Err(Error::Config("scenario.name must not be empty".into()));
        }
        if self.avatar.canonical_name.trim().is_empty()
            || self.avatar.display_title.trim().is_empty()
        {
            return Err(Error::Config(
                "avatar requires both canonical_name and display_title".into(),
            ));
        }
        for (field, url) in [
            ("endpoints.transcription_url", &self.endpoints.transcription_url),
            ("endpoints.dialogue_url", &self.endpoints.dialogue_url),
            ("endpoints.stream_url", &self.endpoints.stream_url),
            ("endpoints.synthesis_url", &self.endpoints.synthesis_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!("{field} must be an http(s) URL")));
            }
        }
        Ok(())
    }

    /// Build the initial session for this configuration
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(
            self.scenario.name.clone(),
            self.avatar.clone(),
            self.voice.clone(),
            self.language.clone(),
            self.scenario.mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [endpoints]
        transcription_url = "https://stt.example.com/transcribe"
        dialogue_url = "https://dialogue.example.com/message"
        stream_url = "https://dialogue.example.com/stream"
        synthesis_url = "https://tts.example.com/synthesize"

        [scenario]
        name = "ordering_coffee"
        mode = "training"

        [avatar]
        canonical_name = "anna_de"
        display_title = "Anna"

        [voice]
        name = "de-DE-KatjaNeural"
        gender = "Female"
        language_tag = "de-DE"

        [language]
        name = "German"
    "#;

    #[test]
    fn sample_config_parses() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.scenario.name, "ordering_coffee");
        assert_eq!(config.scenario.mode, ConversationMode::Training);
        assert_eq!(config.avatar.display_title, "Anna");
    }

    #[test]
    fn mode_defaults_to_training() {
        let raw = SAMPLE.replace("mode = \"training\"\n", "");
        let config = Config::from_toml(&raw).unwrap();
        assert_eq!(config.scenario.mode, ConversationMode::Training);
    }

    #[test]
    fn session_starts_without_id() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let session = config.session();
        assert!(session.session_id.is_none());
        assert_eq!(session.scenario, "ordering_coffee");
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(Config::from_toml("not toml at all [").is_err());
    }

    #[test]
    fn non_http_endpoint_fails_validation() {
        let config = Config::from_toml(&SAMPLE.replace(
            "https://stt.example.com/transcribe",
            "ftp://stt.example.com/transcribe",
        ))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_scenario_fails_validation() {
        let config = Config::from_toml(&SAMPLE.replace("ordering_coffee", "")).unwrap();
        assert!(config.validate().is_err());
    }
}
