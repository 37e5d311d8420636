//! Turn coordinator - the conversational state machine
//!
//! Glues capture, transcription, dialogue, reply streaming, and synthesis
//! playback into a single serialized, cancel-safe, mic-gated loop.

use tokio_util::sync::CancellationToken;

use super::history::ConversationHistory;
use super::telemetry::{TimingSample, TurnTimer};
use crate::dialogue::{ConversationMode, DialogueService, ReplyStream, Session};
use crate::notify::{Notice, NotificationSink};
use crate::voice::{CaptureSource, Speaker, Transcriber, Transcript};
use crate::{Error, Result};

/// Where the coordinator is in the turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the user; the mic gate says whether a turn may start
    Idle {
        /// Whether `start_turn` is currently permitted
        mic_enabled: bool,
    },
    /// A recording handle is open
    Recording,
    /// Waiting on the transcription service
    Transcribing,
    /// Waiting on the dialogue service
    Dialoguing,
    /// Consuming the reply stream
    Streaming,
    /// Deciding between synthesis and display
    Resolving,
    /// Playing the synthesized reply
    Speaking,
    /// The scenario is complete; terminal
    Finished,
}

/// Result of one completed turn cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The recording contained no usable speech; nothing was appended
    NoSpeech,
    /// A full exchange happened and the conversation continues
    Exchanged {
        /// Bot message as it was shown or spoken
        message: String,
        /// Whether the reply was played aloud
        spoken: bool,
    },
    /// A full exchange happened and the scenario is now complete
    Finished {
        /// Bot message as it was shown or spoken
        message: String,
        /// Whether the reply was played aloud
        spoken: bool,
    },
    /// The turn was abandoned by cancellation; no bot message was appended
    Abandoned,
}

/// Orchestrates one conversation
///
/// Exactly one conversation per instance; `finish_turn` takes `&mut self`,
/// so turns are serialized by ownership. The futures are `!Send` because
/// the capture handle owns a hardware stream; run the coordinator on the
/// thread that owns the audio devices.
pub struct TurnCoordinator<C: CaptureSource, T, D, R, S, N> {
    capture: C,
    transcriber: T,
    dialogue: D,
    replies: R,
    speaker: S,
    notices: N,
    session: Session,
    history: ConversationHistory,
    timer: TurnTimer,
    samples: Vec<TimingSample>,
    state: TurnState,
    recording: Option<C::Handle>,
    cancel: CancellationToken,
}

impl<C, T, D, R, S, N> TurnCoordinator<C, T, D, R, S, N>
where
    C: CaptureSource,
    T: Transcriber,
    D: DialogueService,
    R: ReplyStream,
    S: Speaker,
    N: NotificationSink,
{
    /// Create a coordinator for one conversation
    pub fn new(
        capture: C,
        transcriber: T,
        dialogue: D,
        replies: R,
        speaker: S,
        notices: N,
        session: Session,
    ) -> Self {
        Self {
            capture,
            transcriber,
            dialogue,
            replies,
            speaker,
            notices,
            session,
            history: ConversationHistory::new(),
            timer: TurnTimer::new(),
            samples: Vec::new(),
            state: TurnState::Idle { mic_enabled: true },
            recording: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Whether a new turn may start right now
    #[must_use]
    pub const fn mic_enabled(&self) -> bool {
        matches!(self.state, TurnState::Idle { mic_enabled: true })
    }

    /// The transcript so far
    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// The conversation's session context
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Inter-turn timing samples collected so far
    #[must_use]
    pub fn timing_samples(&self) -> &[TimingSample] {
        &self.samples
    }

    /// Handle for abandoning the conversation from outside
    ///
    /// Firing the token halts playback, abandons any open reply stream,
    /// releases a live recording, and resolves the in-flight turn as
    /// `Abandoned`. A fired token is permanent; restart means a new
    /// coordinator.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Explicitly re-enable the mic after a failed or silent turn
    ///
    /// No-op once the scenario is finished.
    pub fn rearm_mic(&mut self) {
        if let TurnState::Idle { mic_enabled } = &mut self.state {
            *mic_enabled = true;
        }
    }

    /// Start a turn: acquire the microphone and begin recording
    ///
    /// # Errors
    ///
    /// `ScenarioComplete` once finished, `MicDisabled` until the user
    /// re-arms a disabled mic, `TurnInProgress` while a turn is in flight,
    /// `Cancelled` after the conversation was abandoned, and capture
    /// errors from the device itself.
    pub fn start_turn(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match self.state {
            TurnState::Finished => Err(Error::ScenarioComplete),
            TurnState::Idle { mic_enabled: false } => Err(Error::MicDisabled),
            TurnState::Idle { mic_enabled: true } => {
                let handle = match self.capture.begin() {
                    Ok(handle) => handle,
                    Err(e) => return Err(self.fail_turn(e)),
                };
                self.recording = Some(handle);
                self.state = TurnState::Recording;
                tracing::debug!("turn started");
                Ok(())
            }
            _ => Err(Error::TurnInProgress),
        }
    }

    /// Finish the turn: stop recording and drive the cycle to completion
    ///
    /// The capture is always finalized and the microphone released before
    /// anything network-bound runs, including on failure.
    ///
    /// # Errors
    ///
    /// `NotRecording` when no turn is open; otherwise the failing stage's
    /// error after the coordinator has returned to `Idle` with the mic
    /// disabled and surfaced a notice.
    #[allow(clippy::future_not_send)]
    pub async fn finish_turn(&mut self) -> Result<TurnOutcome> {
        if self.state != TurnState::Recording {
            return Err(Error::NotRecording);
        }
        let handle = self.recording.take().ok_or(Error::NotRecording)?;

        self.state = TurnState::Transcribing;
        let wav = match self.capture.end(handle) {
            Ok(wav) => wav,
            Err(e) => return Err(self.fail_turn(e)),
        };

        if self.cancel.is_cancelled() {
            return Ok(self.abandon_turn());
        }

        let hint = self.session.language.transcription_hint();
        let text = match self.transcriber.transcribe(&wav, &hint).await {
            Ok(Transcript::Speech(text)) => text,
            Ok(Transcript::NoSpeech) => {
                self.state = TurnState::Idle { mic_enabled: false };
                self.notices.notify(Notice::NoSpeechDetected);
                tracing::info!("no speech detected, mic disabled until re-armed");
                return Ok(TurnOutcome::NoSpeech);
            }
            Err(Error::Cancelled) => return Ok(self.abandon_turn()),
            Err(e) => return Err(self.fail_turn(e)),
        };

        let turn_index = self.history.len();
        self.history.push_user(text.clone());
        if let Some(sample) = self.timer.mark(turn_index) {
            tracing::debug!(
                turn = sample.turn_index,
                seconds = sample.seconds,
                "inter-turn timing"
            );
            self.samples.push(sample);
        }

        self.state = TurnState::Dialoguing;
        let ack = match self.dialogue.send(&self.session, &text).await {
            Ok(ack) => ack,
            Err(Error::Cancelled) => return Ok(self.abandon_turn()),
            Err(e) => return Err(self.fail_turn(e)),
        };
        self.session.adopt_session_id(ack.session_id);

        self.state = TurnState::Streaming;
        // adopt_session_id guarantees an id at this point
        let session_id = self.session.session_id.clone().unwrap_or_default();
        let reply = match self
            .replies
            .consume(&session_id, &self.session.avatar.display_title, &self.cancel)
            .await
        {
            Ok(reply) => reply,
            Err(Error::Cancelled) => return Ok(self.abandon_turn()),
            Err(e) => return Err(self.fail_turn(e)),
        };

        self.state = TurnState::Resolving;
        self.resolve_reply(reply).await
    }

    /// Route the final reply to synthesis or display, then close the cycle
    async fn resolve_reply(&mut self, reply: crate::dialogue::BotReply) -> Result<TurnOutcome> {
        let synthesize =
            self.session.mode == ConversationMode::Training && reply.is_correct();
        let complete = reply.is_complete();
        let correct = reply.correct;

        let mut playback_failed = false;
        let (message, spoken) = if synthesize {
            self.state = TurnState::Speaking;
            let text = reply.response.clone();
            match self
                .speaker
                .speak(&text, &self.session.voice, &self.cancel)
                .await
            {
                Ok(()) => {}
                Err(Error::Cancelled) => return Ok(self.abandon_turn()),
                Err(e) => {
                    // The reply text is final even when audio is not; keep
                    // the transcript intact and leave the mic down.
                    tracing::warn!(error = %e, "playback failed after synthesis");
                    self.notices.notify(Notice::PlaybackFailed(e.to_string()));
                    playback_failed = true;
                }
            }
            // The bot turn appears only after/alongside the audio
            self.history.push_bot(text.clone(), correct);
            (text, !playback_failed)
        } else {
            let text = reply.display_text().to_string();
            self.history.push_bot(text.clone(), correct);
            (text, false)
        };

        if complete {
            self.state = TurnState::Finished;
            self.notices.notify(Notice::ScenarioComplete);
            tracing::info!(turns = self.history.len(), "scenario complete");
            Ok(TurnOutcome::Finished { message, spoken })
        } else {
            self.state = TurnState::Idle {
                mic_enabled: !playback_failed,
            };
            Ok(TurnOutcome::Exchanged { message, spoken })
        }
    }

    /// Record a failed turn: disable the mic and surface the error
    fn fail_turn(&mut self, err: Error) -> Error {
        self.state = TurnState::Idle { mic_enabled: false };
        self.recording = None;
        self.notices.notify(Notice::TurnFailed(err.to_string()));
        tracing::warn!(error = %err, "turn failed");
        err
    }

    /// Resolve an abandoned turn after cancellation
    fn abandon_turn(&mut self) -> TurnOutcome {
        self.recording = None;
        if self.state != TurnState::Finished {
            self.state = TurnState::Idle { mic_enabled: false };
        }
        tracing::info!("turn abandoned");
        TurnOutcome::Abandoned
    }
}
