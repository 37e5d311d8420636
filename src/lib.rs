//! Parley - conversational practice simulator core
//!
//! This library provides the turn orchestration core for spoken practice
//! scenarios: a learner speaks, the utterance is transcribed, sent to a
//! dialogue service, the streamed reply is resolved to speech or text,
//! and the cycle repeats until the scenario completes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  TurnCoordinator                      │
//! │  Idle → Recording → Transcribing → Dialoguing →      │
//! │  Streaming → Resolving → [Speaking] → Idle/Finished  │
//! └──────┬────────┬──────────┬──────────┬────────┬───────┘
//!        │        │          │          │        │
//!   AudioCapture  STT    Dialogue    Reply     TTS +
//!   (microphone) client   client     stream   playback
//! ```
//!
//! Each collaborator sits behind a trait (`CaptureSource`, `Transcriber`,
//! `DialogueService`, `ReplyStream`, `Speaker`) so the state machine is
//! testable without hardware or network.

pub mod config;
pub mod convo;
pub mod dialogue;
pub mod error;
pub mod notify;
pub mod voice;

pub use config::{Config, Endpoints, ScenarioConfig};
pub use convo::{
    ConversationHistory, Role, TimingSample, Turn, TurnCoordinator, TurnOutcome, TurnState,
    TurnTimer,
};
pub use dialogue::{
    AvatarIdentity, BotReply, ConversationMode, DialogueAck, DialogueClient, DialogueService,
    Language, ReplyStream, ResponseStreamConsumer, Session, TurnIdentity, VoiceIdentity,
};
pub use error::{Error, Result};
pub use notify::{Notice, NotificationSink, TracingNotifier};
pub use voice::{
    AudioCapture, AudioPlayback, CaptureSource, RecordingHandle, SAMPLE_RATE, Speaker,
    SpeechSynthesisPlayer, Transcriber, Transcript, TranscriptionClient, samples_to_wav,
};
