//! Voice processing module
//!
//! Handles audio capture, transcription, synthesis, and playback. The
//! coordinator drives these through the `CaptureSource`, `Transcriber`,
//! and `Speaker` seams.

mod capture;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, CaptureSource, RecordingHandle, SAMPLE_RATE, samples_to_wav};
pub use playback::AudioPlayback;
pub use stt::{Transcriber, Transcript, TranscriptionClient};
pub use tts::{Speaker, SpeechSynthesisPlayer};
