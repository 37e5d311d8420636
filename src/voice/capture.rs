//! Audio capture from microphone

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Source of finalized recordings
///
/// The seam between the coordinator and the microphone hardware; tests
/// substitute an in-memory device.
pub trait CaptureSource {
    /// Live-recording handle type
    type Handle;

    /// Acquire the microphone and start recording
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRecording` if a handle is still live, or
    /// `DeviceUnavailable` if no usable input device exists.
    fn begin(&mut self) -> Result<Self::Handle>;

    /// Stop recording and return the finalized encoded buffer
    ///
    /// # Errors
    ///
    /// Returns error if encoding fails. The hardware stream is released
    /// regardless.
    fn end(&mut self, handle: Self::Handle) -> Result<Vec<u8>>;
}

/// Owns one live microphone stream
///
/// Exists only between `begin` and `end`; dropping it (the cancellation
/// path) releases the hardware stream and re-arms capture.
pub struct RecordingHandle {
    stream: Option<Stream>,
    buffer: Arc<Mutex<Vec<f32>>>,
    live: Arc<AtomicBool>,
}

impl RecordingHandle {
    /// Stop the stream and drain the captured samples
    fn stop(mut self) -> Vec<f32> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Captures audio from the default input device
pub struct AudioCapture {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    live: Arc<AtomicBool>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if no input device with a usable 16kHz
    /// mono configuration exists.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| {
                Error::DeviceUnavailable("no suitable audio config found".to_string())
            })?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            live: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl CaptureSource for AudioCapture {
    type Handle = RecordingHandle;

    fn begin(&mut self) -> Result<RecordingHandle> {
        if self
            .live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRecording);
        }

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let cb_buffer = Arc::clone(&buffer);

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            self.live.store(false, Ordering::Release);
            Error::DeviceUnavailable("no input device".to_string())
        })?;

        let stream = match device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = cb_buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                self.live.store(false, Ordering::Release);
                return Err(Error::DeviceUnavailable(e.to_string()));
            }
        };

        if let Err(e) = stream.play() {
            self.live.store(false, Ordering::Release);
            return Err(Error::DeviceUnavailable(e.to_string()));
        }

        tracing::debug!("recording started");

        Ok(RecordingHandle {
            stream: Some(stream),
            buffer,
            live: Arc::clone(&self.live),
        })
    }

    fn end(&mut self, handle: RecordingHandle) -> Result<Vec<u8>> {
        let samples = handle.stop();
        tracing::debug!(samples = samples.len(), "recording stopped");
        samples_to_wav(&samples, SAMPLE_RATE)
    }
}

/// Convert f32 samples to WAV bytes for the transcription API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_roundtrip_preserves_format_and_length() {
        let samples = vec![0.0_f32, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 5);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let wav = samples_to_wav(&[2.0, -2.0], SAMPLE_RATE).unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![32767, -32768]);
    }

    #[test]
    fn empty_recording_encodes_as_empty_wav() {
        let wav = samples_to_wav(&[], SAMPLE_RATE).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }
}
