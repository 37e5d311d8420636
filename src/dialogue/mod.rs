//! Dialogue service types and clients
//!
//! Holds the per-conversation `Session`, the typed identity scheme used by
//! the dialogue endpoint, and the clients that talk to it.

mod client;
mod stream;

pub use client::{DialogueAck, DialogueClient, DialogueService};
pub use stream::{BotReply, ReplyStream, ResponseStreamConsumer};

use serde::{Deserialize, Serialize};

/// How an avatar is named at the dialogue boundary
///
/// The service wants the canonical name when a session is being created and
/// the display title on every request after that. Both are required up
/// front because the switch happens mid-conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarIdentity {
    /// Canonical name used to create a session (e.g. "anna_de")
    pub canonical_name: String,
    /// Display title used once a session exists (e.g. "Anna")
    pub display_title: String,
}

/// Voice identity for speech synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceIdentity {
    /// Synthesis voice name (e.g. "de-DE-KatjaNeural")
    pub name: String,
    /// Voice gender as the synthesis service spells it
    pub gender: String,
    /// BCP-47 language tag for the voice (e.g. "de-DE")
    pub language_tag: String,
}

/// Practice language selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language name as configured (e.g. "German")
    pub name: String,
}

impl Language {
    /// Lowercase hint sent to the transcription service
    #[must_use]
    pub fn transcription_hint(&self) -> String {
        self.name.to_lowercase()
    }

    /// Whether this is the unqualified default language
    #[must_use]
    pub fn is_english(&self) -> bool {
        self.name.eq_ignore_ascii_case("english")
    }

    /// Qualify a scenario identifier for this language
    ///
    /// Non-English languages select a localized scenario variant by
    /// suffixing the identifier with the lowercase language name.
    #[must_use]
    pub fn qualify_scenario(&self, scenario: &str) -> String {
        if self.is_english() {
            scenario.to_string()
        } else {
            format!("{scenario}_{}", self.name.to_lowercase())
        }
    }
}

/// Conversation mode
///
/// Training mode gates spoken playback on the reply being marked correct;
/// freeform mode always displays without audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    /// Correctness-gated coaching
    Training,
    /// Unscored conversation
    Freeform,
}

/// One conversation's standing context for the dialogue service
///
/// `session_id` is `None` until the service assigns one on the first
/// exchange; every later request must carry it.
#[derive(Debug, Clone)]
pub struct Session {
    /// Server-assigned conversation id, set after the first exchange
    pub session_id: Option<String>,
    /// Scenario identifier (unqualified; language qualification happens at
    /// the boundary)
    pub scenario: String,
    /// Avatar naming for both identification modes
    pub avatar: AvatarIdentity,
    /// Voice used for spoken replies
    pub voice: VoiceIdentity,
    /// Practice language
    pub language: Language,
    /// Conversation mode
    pub mode: ConversationMode,
}

/// How a dialogue request identifies its conversation
///
/// The two modes are not interchangeable; `Session::identity` is the only
/// place that picks between them.
#[derive(Debug, PartialEq, Eq)]
pub enum TurnIdentity<'a> {
    /// First exchange: identified by scenario and canonical avatar name
    NewSession {
        /// Language-qualified scenario identifier
        scenario: String,
        /// Avatar canonical name
        avatar_name: &'a str,
    },
    /// Subsequent exchanges: identified by session id and display title
    Existing {
        /// Server-assigned session id
        session_id: &'a str,
        /// Avatar display title
        avatar_title: &'a str,
    },
}

impl Session {
    /// Create a fresh session with no server-assigned id
    #[must_use]
    pub const fn new(
        scenario: String,
        avatar: AvatarIdentity,
        voice: VoiceIdentity,
        language: Language,
        mode: ConversationMode,
    ) -> Self {
        Self {
            session_id: None,
            scenario,
            avatar,
            voice,
            language,
            mode,
        }
    }

    /// The identification mode for the next request
    ///
    /// Session-based identification is selected if and only if a session id
    /// is already known.
    #[must_use]
    pub fn identity(&self) -> TurnIdentity<'_> {
        self.session_id.as_deref().map_or_else(
            || TurnIdentity::NewSession {
                scenario: self.language.qualify_scenario(&self.scenario),
                avatar_name: &self.avatar.canonical_name,
            },
            |id| TurnIdentity::Existing {
                session_id: id,
                avatar_title: &self.avatar.display_title,
            },
        )
    }

    /// Persist the server-assigned session id for all later turns
    pub fn adopt_session_id(&mut self, id: String) {
        if self.session_id.is_none() {
            self.session_id = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            "ordering_coffee".into(),
            AvatarIdentity {
                canonical_name: "anna_de".into(),
                display_title: "Anna".into(),
            },
            VoiceIdentity {
                name: "de-DE-KatjaNeural".into(),
                gender: "Female".into(),
                language_tag: "de-DE".into(),
            },
            Language {
                name: "German".into(),
            },
            ConversationMode::Training,
        )
    }

    // -- identity selection ---------------------------------------------------

    #[test]
    fn new_session_uses_scenario_and_canonical_name() {
        let session = session();
        assert_eq!(
            session.identity(),
            TurnIdentity::NewSession {
                scenario: "ordering_coffee_german".into(),
                avatar_name: "anna_de",
            }
        );
    }

    #[test]
    fn existing_session_uses_id_and_display_title() {
        let mut session = session();
        session.adopt_session_id("sess-42".into());
        assert_eq!(
            session.identity(),
            TurnIdentity::Existing {
                session_id: "sess-42",
                avatar_title: "Anna",
            }
        );
    }

    #[test]
    fn adopt_keeps_first_assigned_id() {
        let mut session = session();
        session.adopt_session_id("sess-1".into());
        session.adopt_session_id("sess-2".into());
        assert_eq!(session.session_id.as_deref(), Some("sess-1"));
    }

    // -- language qualification -----------------------------------------------

    #[test]
    fn english_scenario_is_unqualified() {
        let lang = Language {
            name: "English".into(),
        };
        assert_eq!(lang.qualify_scenario("ordering_coffee"), "ordering_coffee");
    }

    #[test]
    fn non_english_scenario_gets_language_suffix() {
        let lang = Language {
            name: "Spanish".into(),
        };
        assert_eq!(
            lang.qualify_scenario("ordering_coffee"),
            "ordering_coffee_spanish"
        );
    }

    #[test]
    fn transcription_hint_is_lowercase() {
        let lang = Language {
            name: "German".into(),
        };
        assert_eq!(lang.transcription_hint(), "german");
    }
}
