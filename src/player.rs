//! Playback of saved recordings
//!
//! Decodes a WAV file with hound and plays it through the default cpal
//! output device, tracking position for a progress display.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("No default output device found")]
    NoOutputDevice,
    #[error("Audio stream error: {0}")]
    Stream(String),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Decoded recording ready for playback.
pub struct Clip {
    samples: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl Clip {
    /// Load a WAV file, converting samples to f32.
    pub fn load(path: &Path) -> Result<Self, PlayerError> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => {
                reader.samples::<f32>().collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Int => {
                let scale = (1u32 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        Ok(Self {
            samples: Arc::new(samples),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }

    /// Start playback on the default output device.
    pub fn play(&self) -> Result<Playback, PlayerError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlayerError::NoOutputDevice)?;

        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let position = Arc::new(AtomicUsize::new(0));
        let callback_position = Arc::clone(&position);
        let samples = Arc::clone(&self.samples);

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let start = callback_position.load(Ordering::Acquire);
                    for (i, slot) in out.iter_mut().enumerate() {
                        // Pad with silence past the end of the clip.
                        *slot = samples.get(start + i).copied().unwrap_or(0.0);
                    }
                    let advanced = (start + out.len()).min(samples.len());
                    callback_position.store(advanced, Ordering::Release);
                },
                |err| {
                    eprintln!("Playback stream error: {}", err);
                },
                None,
            )
            .map_err(|e| PlayerError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PlayerError::Stream(e.to_string()))?;

        Ok(Playback {
            _stream: stream,
            position,
            total: self.samples.len(),
        })
    }
}

/// A running playback stream. Dropping it stops playback.
pub struct Playback {
    _stream: cpal::Stream,
    position: Arc<AtomicUsize>,
    total: usize,
}

impl Playback {
    /// Fraction of the clip played so far, in 0..1.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.position.load(Ordering::Acquire) as f32 / self.total as f32
    }

    pub fn finished(&self) -> bool {
        self.position.load(Ordering::Acquire) >= self.total
    }
}
