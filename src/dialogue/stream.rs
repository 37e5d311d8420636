//! Server-push reply stream consumer
//!
//! The dialogue service pushes progressively-complete snapshots of the bot
//! turn over a session-scoped event stream. Stream termination is the sole
//! completion signal; the last snapshot received is the final reply.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// The structured bot turn assembled from the reply stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotReply {
    /// Bot response text
    pub response: String,
    /// Whether the preceding user utterance was judged correct
    #[serde(default)]
    pub correct: Option<bool>,
    /// Whether this reply completes the scenario
    #[serde(default)]
    pub complete: Option<bool>,
    /// Corrected phrasing, shown instead of `response` on the display path
    /// when the utterance was judged incorrect
    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl BotReply {
    /// Whether the user's utterance was judged correct
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct.unwrap_or(false)
    }

    /// Whether this reply marks the scenario complete
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.unwrap_or(false)
    }

    /// Text to show when the reply is displayed rather than spoken
    #[must_use]
    pub fn display_text(&self) -> &str {
        if self.correct == Some(false) {
            self.correct_answer.as_deref().unwrap_or(&self.response)
        } else {
            &self.response
        }
    }
}

/// Consumes the server-push reply stream for one turn
#[async_trait]
pub trait ReplyStream {
    /// Block until the stream for this session closes and yield the final
    /// reply snapshot
    ///
    /// # Errors
    ///
    /// Returns `EmptyResponse` if the stream terminated before any payload
    /// arrived, or `Cancelled` if the token fired first.
    async fn consume(
        &self,
        session_id: &str,
        avatar_title: &str,
        cancel: &CancellationToken,
    ) -> Result<BotReply>;
}

/// SSE consumer for the reply stream endpoint
pub struct ResponseStreamConsumer {
    client: reqwest::Client,
    endpoint: String,
}

impl ResponseStreamConsumer {
    /// Create a consumer for the given stream endpoint base
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

/// Fold one event payload into the working snapshot
///
/// Each event replaces the snapshot outright; the service sends
/// progressively-complete states, not deltas. A malformed payload is
/// skipped so a valid earlier snapshot survives.
fn fold_event(latest: &mut Option<BotReply>, data: &str) {
    match serde_json::from_str::<BotReply>(data) {
        Ok(reply) => *latest = Some(reply),
        Err(e) => {
            tracing::warn!(error = %e, data = %data, "skipping malformed stream event");
        }
    }
}

#[async_trait]
impl ReplyStream for ResponseStreamConsumer {
    async fn consume(
        &self,
        session_id: &str,
        avatar_title: &str,
        cancel: &CancellationToken,
    ) -> Result<BotReply> {
        let url = format!("{}/{session_id}", self.endpoint);
        tracing::debug!(url = %url, avatar = avatar_title, "opening reply stream");

        // Failure to open counts as termination before any payload.
        let response = match self
            .client
            .get(&url)
            .query(&[("avatar", avatar_title)])
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::error!(status = %r.status(), "reply stream rejected");
                return Err(Error::EmptyResponse);
            }
            Err(e) => {
                tracing::error!(error = %e, "reply stream connect failed");
                return Err(Error::EmptyResponse);
            }
        };

        let mut stream = response.bytes_stream().eventsource();
        let mut latest: Option<BotReply> = None;
        let mut events = 0usize;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(events, "reply stream abandoned");
                    return Err(Error::Cancelled);
                }
                event = stream.next() => match event {
                    Some(Ok(ev)) => {
                        events += 1;
                        fold_event(&mut latest, &ev.data);
                    }
                    Some(Err(e)) => {
                        // Transport error is a completion signal, not a retry
                        // trigger; whatever arrived before it is final.
                        tracing::debug!(error = %e, events, "reply stream ended with transport error");
                        break;
                    }
                    None => {
                        tracing::debug!(events, "reply stream closed");
                        break;
                    }
                }
            }
        }

        latest.ok_or(Error::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- payload folding ------------------------------------------------------

    #[test]
    fn later_event_replaces_earlier_snapshot() {
        let mut latest = None;
        fold_event(&mut latest, r#"{"response":"Hal"}"#);
        fold_event(&mut latest, r#"{"response":"Hallo!","complete":false}"#);
        assert_eq!(latest.unwrap().response, "Hallo!");
    }

    #[test]
    fn malformed_event_keeps_previous_snapshot() {
        let mut latest = None;
        fold_event(&mut latest, r#"{"response":"Hallo!"}"#);
        fold_event(&mut latest, "not json");
        assert_eq!(latest.unwrap().response, "Hallo!");
    }

    #[test]
    fn malformed_first_event_leaves_nothing() {
        let mut latest = None;
        fold_event(&mut latest, "not json");
        assert!(latest.is_none());
    }

    // -- reply fields ---------------------------------------------------------

    #[test]
    fn flags_default_to_false() {
        let reply: BotReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert!(!reply.is_correct());
        assert!(!reply.is_complete());
    }

    #[test]
    fn display_prefers_correction_when_marked_incorrect() {
        let reply: BotReply = serde_json::from_str(
            r#"{"response":"Not quite.","correct":false,"correct_answer":"Ich moechte einen Kaffee."}"#,
        )
        .unwrap();
        assert_eq!(reply.display_text(), "Ich moechte einen Kaffee.");
    }

    #[test]
    fn display_uses_response_when_correct_or_unmarked() {
        let correct: BotReply =
            serde_json::from_str(r#"{"response":"Sehr gut!","correct":true}"#).unwrap();
        assert_eq!(correct.display_text(), "Sehr gut!");

        let unmarked: BotReply = serde_json::from_str(r#"{"response":"Weiter."}"#).unwrap();
        assert_eq!(unmarked.display_text(), "Weiter.");
    }
}
