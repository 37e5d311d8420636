//! Speech-to-text (STT) processing

use async_trait::async_trait;

use crate::{Error, Result};

/// Outcome of a transcription request
///
/// Silence is an expected outcome, not a fault; only network and service
/// failures surface as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized speech
    Speech(String),
    /// The recording contained no usable speech
    NoSpeech,
}

/// Transcribes recorded audio to text
#[async_trait]
pub trait Transcriber {
    /// Transcribe a WAV buffer with a language hint
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionFailed` on network or service failure.
    async fn transcribe(&self, wav: &[u8], language: &str) -> Result<Transcript>;
}

/// Response from the transcription service
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for the transcription endpoint
pub struct TranscriptionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl TranscriptionClient {
    /// Create a client for the given transcription endpoint
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

/// Interpret the service's `text` field
///
/// An absent or blank transcript is the explicit no-speech outcome.
fn outcome_from_text(text: Option<String>) -> Transcript {
    match text {
        Some(t) if !t.trim().is_empty() => Transcript::Speech(t),
        _ => Transcript::NoSpeech,
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, wav: &[u8], language: &str) -> Result<Transcript> {
        tracing::debug!(audio_bytes = wav.len(), language, "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::TranscriptionFailed(e.to_string()))?,
            )
            .text("language", language.to_lowercase());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                Error::TranscriptionFailed(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription service error");
            return Err(Error::TranscriptionFailed(format!("{status}: {body}")));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::TranscriptionFailed(format!("bad response body: {e}")))?;

        let outcome = outcome_from_text(result.text);
        match &outcome {
            Transcript::Speech(text) => tracing::info!(transcript = %text, "transcription complete"),
            Transcript::NoSpeech => tracing::info!("no speech recognized"),
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_becomes_speech_outcome() {
        assert_eq!(
            outcome_from_text(Some("Guten Tag".into())),
            Transcript::Speech("Guten Tag".into())
        );
    }

    #[test]
    fn missing_text_is_no_speech() {
        assert_eq!(outcome_from_text(None), Transcript::NoSpeech);
    }

    #[test]
    fn blank_text_is_no_speech() {
        assert_eq!(outcome_from_text(Some(String::new())), Transcript::NoSpeech);
        assert_eq!(outcome_from_text(Some("   ".into())), Transcript::NoSpeech);
    }

    #[test]
    fn response_tolerates_absent_text_field() {
        let parsed: TranscriptionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(outcome_from_text(parsed.text), Transcript::NoSpeech);
    }
}
