//! User-facing notices
//!
//! The coordinator never talks to a UI directly; it reports through a
//! `NotificationSink` owned by the embedding application.

use std::fmt;

/// A user-facing notice emitted by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The recording contained no recognizable speech
    NoSpeechDetected,
    /// The turn failed; the message describes the fault
    TurnFailed(String),
    /// Spoken playback of the reply failed; the text is still shown
    PlaybackFailed(String),
    /// The scenario was completed
    ScenarioComplete,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpeechDetected => {
                write!(f, "No speech detected. Tap the microphone to try again.")
            }
            Self::TurnFailed(reason) => write!(f, "Something went wrong: {reason}"),
            Self::PlaybackFailed(reason) => write!(f, "Could not play the reply: {reason}"),
            Self::ScenarioComplete => write!(f, "Scenario complete. Well done!"),
        }
    }
}

/// Sink for user-facing notices
pub trait NotificationSink {
    /// Deliver a notice to the user
    fn notify(&self, notice: Notice);
}

/// Sink that logs notices through `tracing`
///
/// Useful for headless runs and as the default when the embedding
/// application has no UI surface wired up yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::NoSpeechDetected | Notice::ScenarioComplete => {
                tracing::info!(notice = %notice, "user notice");
            }
            Notice::TurnFailed(_) | Notice::PlaybackFailed(_) => {
                tracing::warn!(notice = %notice, "user notice");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_display_is_user_readable() {
        assert_eq!(
            Notice::NoSpeechDetected.to_string(),
            "No speech detected. Tap the microphone to try again."
        );
        assert!(
            Notice::TurnFailed("dialogue service unavailable: 502".into())
                .to_string()
                .contains("502")
        );
    }
}
