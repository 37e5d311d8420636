//! Error types for the practice simulator core

use thiserror::Error;

/// Result type alias for parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a conversation
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone unavailable (no device, permission denied, unusable config)
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),

    /// A recording handle is already open
    #[error("a recording is already in progress")]
    AlreadyRecording,

    /// Audio capture or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Transcription service failure (network or service fault, not silence)
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Dialogue service unreachable or rejected the request
    #[error("dialogue service unavailable: {0}")]
    DialogueUnavailable(String),

    /// Reply stream closed without delivering any payload
    #[error("reply stream closed without a response")]
    EmptyResponse,

    /// Speech synthesis or playback-path decode failure
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// A turn is already in flight
    #[error("a turn is already in progress")]
    TurnInProgress,

    /// `finish_turn` was called with no recording open
    #[error("no recording in progress")]
    NotRecording,

    /// The microphone is disabled and must be explicitly re-enabled
    #[error("microphone is disabled")]
    MicDisabled,

    /// The scenario has been completed; no further turns are accepted
    #[error("scenario is complete")]
    ScenarioComplete,

    /// The in-flight turn was abandoned by cancellation
    #[error("operation cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
