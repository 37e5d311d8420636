//! Audio playback to speakers
//!
//! One `AudioPlayback` is the single shared output; the coordinator
//! serializes turns so at most one playback is ever active.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Completion poll interval
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Plays audio to the default output device
pub struct AudioPlayback {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { device, config })
    }

    /// Play encoded audio (WAV or MP3, sniffed by container magic)
    ///
    /// Resolves when the playback-ended signal fires, not after an elapsed
    /// duration. Cancellation stops the stream and resets its position.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails, or `Cancelled` if the
    /// token fired mid-playback.
    pub async fn play_encoded(&mut self, audio: &[u8], cancel: &CancellationToken) -> Result<()> {
        let samples = decode_audio(audio)?;
        self.play(samples, cancel).await
    }

    /// Play raw f32 samples
    ///
    /// # Errors
    ///
    /// Returns error if playback fails, or `Cancelled` if the token fired
    /// mid-playback.
    #[allow(clippy::future_not_send)]
    pub async fn play(&mut self, samples: Vec<f32>, cancel: &CancellationToken) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;
        let sample_count = samples.len();

        let samples = Arc::new(samples);
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut pos) = cb_position.lock() else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < cb_samples.len() {
                            cb_samples[*pos]
                        } else {
                            if let Ok(mut done) = cb_finished.lock() {
                                *done = true;
                            }
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < cb_samples.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Backstop against a stalled output callback; the normal exit is the
        // finished flag set by the callback when the last sample is consumed.
        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(duration_ms + 500);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    if let Ok(mut pos) = position.lock() {
                        *pos = 0;
                    }
                    drop(stream);
                    tracing::debug!("playback cancelled");
                    return Err(Error::Cancelled);
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    if finished.lock().map(|done| *done).unwrap_or(true) {
                        break;
                    }
                    if tokio::time::Instant::now() >= deadline {
                        tracing::warn!("playback did not signal completion, releasing stream");
                        break;
                    }
                }
            }
        }

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

/// Decode encoded audio bytes to f32 samples, sniffing the container
fn decode_audio(audio: &[u8]) -> Result<Vec<f32>> {
    if audio.starts_with(b"RIFF") {
        decode_wav(audio)
    } else {
        decode_mp3(audio)
    }
}

/// Decode WAV bytes to f32 samples (stereo averaged to mono)
fn decode_wav(wav_data: &[u8]) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_data))
        .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let mono: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let samples: Vec<f32> = reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / 32768.0))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?;
            samples
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?,
    };

    if spec.channels == 2 {
        Ok(mono
            .chunks(2)
            .map(|chunk| f32::midpoint(chunk[0], chunk.get(1).copied().unwrap_or(chunk[0])))
            .collect())
    } else {
        Ok(mono)
    }
}

/// Decode MP3 bytes to f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                // Convert i16 samples to f32 and handle stereo to mono
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    // Stereo: average channels
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    // Mono
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::capture::samples_to_wav;

    #[test]
    fn wav_bytes_are_sniffed_and_decoded() {
        let wav = samples_to_wav(&[0.25, -0.25], 24000).unwrap();
        let samples = decode_audio(&wav).unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.25).abs() < 0.001);
        assert!((samples[1] + 0.25).abs() < 0.001);
    }

    #[test]
    fn truncated_wav_fails_to_decode() {
        assert!(decode_audio(b"RIFF\x04\x00\x00\x00WAVE").is_err());
    }
}
