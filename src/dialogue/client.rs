//! Dialogue service client

use async_trait::async_trait;

use super::{Session, TurnIdentity};
use crate::{Error, Result};

/// Acknowledgement of a dialogue exchange
#[derive(Debug, Clone)]
pub struct DialogueAck {
    /// Session id correlating all turns of this conversation
    pub session_id: String,
    /// Raw response body for diagnostics
    pub raw: serde_json::Value,
}

/// Sends user utterances to the dialogue service
#[async_trait]
pub trait DialogueService {
    /// Send one user utterance within the given session
    ///
    /// # Errors
    ///
    /// Returns `DialogueUnavailable` on network or service failure.
    async fn send(&self, session: &Session, message: &str) -> Result<DialogueAck>;
}

/// HTTP client for the dialogue endpoint
pub struct DialogueClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(serde::Deserialize)]
struct DialogueResponse {
    session_id: String,
    #[serde(flatten)]
    rest: serde_json::Value,
}

impl DialogueClient {
    /// Create a client for the given dialogue endpoint
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl DialogueService for DialogueClient {
    async fn send(&self, session: &Session, message: &str) -> Result<DialogueAck> {
        // The two identification modes carry different fields; the service
        // rejects requests that mix them.
        let form: Vec<(&str, String)> = match session.identity() {
            TurnIdentity::NewSession {
                scenario,
                avatar_name,
            } => vec![
                ("scenario_name", scenario),
                ("message", message.to_string()),
                ("name", avatar_name.to_string()),
            ],
            TurnIdentity::Existing {
                session_id,
                avatar_title,
            } => vec![
                ("session_id", session_id.to_string()),
                ("message", message.to_string()),
                ("name", avatar_title.to_string()),
            ],
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            new_session = session.session_id.is_none(),
            "sending utterance"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::DialogueUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "dialogue service error");
            return Err(Error::DialogueUnavailable(format!("{status}: {body}")));
        }

        let parsed: DialogueResponse = response
            .json()
            .await
            .map_err(|e| Error::DialogueUnavailable(format!("bad response body: {e}")))?;

        tracing::debug!(session_id = %parsed.session_id, "utterance accepted");

        Ok(DialogueAck {
            session_id: parsed.session_id,
            raw: parsed.rest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_session_id_and_keeps_rest() {
        let body = r#"{"session_id":"sess-7","greeting":"Hallo!"}"#;
        let parsed: DialogueResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.session_id, "sess-7");
        assert_eq!(parsed.rest["greeting"], "Hallo!");
    }

    #[test]
    fn response_without_session_id_is_rejected() {
        let body = r#"{"greeting":"Hallo!"}"#;
        assert!(serde_json::from_str::<DialogueResponse>(body).is_err());
    }
}
