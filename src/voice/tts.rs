//! Text-to-speech (TTS) processing
//!
//! Builds a speech-markup request for the synthesis endpoint and plays the
//! binary audio response through the shared output device.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::playback::AudioPlayback;
use crate::dialogue::VoiceIdentity;
use crate::{Error, Result};

/// Speaks bot replies aloud
///
/// `speak` resolves when playback finishes, signalled by the playback-ended
/// event rather than elapsed time.
#[async_trait(?Send)]
pub trait Speaker {
    /// Synthesize and play the given text
    ///
    /// # Errors
    ///
    /// Returns `SynthesisFailed` on service, decode, or playback failure,
    /// or `Cancelled` if the token fired mid-playback.
    async fn speak(
        &mut self,
        text: &str,
        voice: &VoiceIdentity,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Synthesizes speech and plays it through the audio output
pub struct SpeechSynthesisPlayer {
    client: reqwest::Client,
    endpoint: String,
    playback: AudioPlayback,
}

impl SpeechSynthesisPlayer {
    /// Create a player for the given synthesis endpoint
    ///
    /// Takes ownership of the audio output so playback state is never
    /// shared implicitly.
    #[must_use]
    pub fn new(endpoint: String, playback: AudioPlayback) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            playback,
        }
    }
}

/// Escape text for inclusion in a speech-markup body
fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the speech-markup body naming voice, gender, and language
fn build_markup(text: &str, voice: &VoiceIdentity) -> String {
    format!(
        r#"<speak version="1.0" xml:lang="{lang}"><voice xml:lang="{lang}" xml:gender="{gender}" name="{name}">{text}</voice></speak>"#,
        lang = voice.language_tag,
        gender = voice.gender,
        name = voice.name,
        text = escape_markup(text),
    )
}

#[async_trait(?Send)]
impl Speaker for SpeechSynthesisPlayer {
    async fn speak(
        &mut self,
        text: &str,
        voice: &VoiceIdentity,
        cancel: &CancellationToken,
    ) -> Result<()> {
        tracing::debug!(voice = %voice.name, chars = text.len(), "synthesizing speech");

        let body = build_markup(text, voice);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/ssml+xml")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::SynthesisFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis service error");
            return Err(Error::SynthesisFailed(format!("{status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::SynthesisFailed(e.to_string()))?;

        tracing::debug!(audio_bytes = audio.len(), "playing synthesized speech");

        match self.playback.play_encoded(&audio, cancel).await {
            Ok(()) => Ok(()),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => Err(Error::SynthesisFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> VoiceIdentity {
        VoiceIdentity {
            name: "de-DE-KatjaNeural".into(),
            gender: "Female".into(),
            language_tag: "de-DE".into(),
        }
    }

    #[test]
    fn markup_names_voice_gender_and_language() {
        let markup = build_markup("Guten Tag", &voice());
        assert!(markup.contains(r#"name="de-DE-KatjaNeural""#));
        assert!(markup.contains(r#"xml:gender="Female""#));
        assert!(markup.contains(r#"xml:lang="de-DE""#));
        assert!(markup.contains(">Guten Tag</voice>"));
    }

    #[test]
    fn literal_text_is_escaped() {
        let markup = build_markup("Fish & chips <now>", &voice());
        assert!(markup.contains("Fish &amp; chips &lt;now&gt;"));
    }

    #[test]
    fn escape_handles_quotes() {
        assert_eq!(escape_markup(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_markup("it's"), "it&apos;s");
    }
}
