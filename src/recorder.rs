//! Microphone capture
//!
//! cpal-based input capture with optional WAV output via hound. The capture
//! callback publishes a live power reading that the metering session polls
//! through the [`LevelSource`] boundary.

use crate::meter::DB_FLOOR;
use crate::session::LevelSource;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Default capture rate, matching common microphone hardware.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("No default input device found")]
    NoInputDevice,
    #[error("No supported f32 input config near {0} Hz")]
    NoSupportedConfig(u32),
    #[error("Audio device error: {0}")]
    Device(String),
    #[error("Audio stream error: {0}")]
    Stream(String),
    #[error("Could not determine data directory")]
    NoDataDir,
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Information about an available audio input device
#[derive(Debug)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub formats: Vec<SampleFormat>,
}

/// Live power reading published by the capture callback.
///
/// The decibel value is stored as raw f32 bits so the audio thread can
/// publish without locking.
pub struct LevelProbe {
    power_db: AtomicU32,
    recording: AtomicBool,
}

impl LevelProbe {
    fn new() -> Self {
        Self {
            power_db: AtomicU32::new(DB_FLOOR.to_bits()),
            recording: AtomicBool::new(false),
        }
    }

    fn publish(&self, db: f32) {
        self.power_db.store(db.to_bits(), Ordering::Release);
    }
}

impl LevelSource for LevelProbe {
    fn power_db(&self) -> f32 {
        f32::from_bits(self.power_db.load(Ordering::Acquire))
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }
}

/// Mean power of a callback buffer in dBFS, floored at the meter's silence
/// level.
fn buffer_power_db(data: &[f32]) -> f32 {
    if data.is_empty() {
        return DB_FLOOR;
    }
    let sum_sq: f32 = data.iter().map(|s| s * s).sum();
    let rms = (sum_sq / data.len() as f32).sqrt();
    if rms <= 0.0 || !rms.is_finite() {
        return DB_FLOOR;
    }
    (20.0 * rms.log10()).max(DB_FLOOR)
}

type SharedWavWriter = Arc<Mutex<WavWriter<BufWriter<File>>>>;

/// Audio input device with a capture configuration.
pub struct Recorder {
    device: Device,
    config: StreamConfig,
}

impl Recorder {
    /// Open the default input device with a config close to the requested
    /// sample rate.
    pub fn new(sample_rate: u32) -> Result<Self, RecorderError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(RecorderError::NoInputDevice)?;
        let config = Self::pick_config(&device, sample_rate)?;
        Ok(Self { device, config })
    }

    /// Find the supported f32 input config closest to the target rate.
    fn pick_config(device: &Device, target: u32) -> Result<StreamConfig, RecorderError> {
        let ranges = device
            .supported_input_configs()
            .map_err(|e| RecorderError::Device(e.to_string()))?;

        let mut best: Option<(u32, cpal::SupportedStreamConfigRange)> = None;
        for range in ranges {
            if range.sample_format() != SampleFormat::F32 {
                continue;
            }
            let rate = target.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            let diff = rate.abs_diff(target);
            match best {
                Some((best_diff, _)) if best_diff <= diff => {}
                _ => best = Some((diff, range)),
            }
        }

        let (_, range) = best.ok_or(RecorderError::NoSupportedConfig(target))?;
        let rate = target.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        Ok(range.with_sample_rate(cpal::SampleRate(rate)).into())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start capturing. When `output` is set, samples are also written to it
    /// as 16-bit PCM.
    pub fn start(&self, output: Option<&Path>) -> Result<ActiveRecording, RecorderError> {
        let writer: Option<SharedWavWriter> = match output {
            Some(path) => {
                let spec = WavSpec {
                    channels: self.config.channels,
                    sample_rate: self.config.sample_rate.0,
                    bits_per_sample: 16,
                    sample_format: hound::SampleFormat::Int,
                };
                Some(Arc::new(Mutex::new(WavWriter::create(path, spec)?)))
            }
            None => None,
        };

        let probe = Arc::new(LevelProbe::new());
        let callback_probe = Arc::clone(&probe);
        let callback_writer = writer.clone();
        let error_probe = Arc::clone(&probe);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback_probe.publish(buffer_power_db(data));

                    if let Some(ref writer) = callback_writer {
                        if let Ok(mut writer) = writer.lock() {
                            for &sample in data {
                                let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                                let _ = writer.write_sample(pcm);
                            }
                        }
                    }
                },
                move |err| {
                    eprintln!("Audio device disconnected or stream error: {}", err);
                    // Drop the recording flag so the sampler guard stops
                    // touching the ring.
                    error_probe.recording.store(false, Ordering::Release);
                },
                None,
            )
            .map_err(|e| RecorderError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| RecorderError::Stream(e.to_string()))?;
        probe.recording.store(true, Ordering::Release);

        Ok(ActiveRecording {
            stream,
            probe,
            writer,
            path: output.map(Path::to_path_buf),
        })
    }
}

/// A running capture stream. Dropping it stops capture; call
/// [`ActiveRecording::finish`] to also finalize the WAV header.
pub struct ActiveRecording {
    stream: Stream,
    probe: Arc<LevelProbe>,
    writer: Option<SharedWavWriter>,
    path: Option<PathBuf>,
}

impl ActiveRecording {
    /// Handle for the metering session to poll.
    pub fn probe(&self) -> Arc<LevelProbe> {
        Arc::clone(&self.probe)
    }

    /// Stop capture and finalize the WAV file, returning its path if one
    /// was written.
    pub fn finish(self) -> Result<Option<PathBuf>, RecorderError> {
        self.probe.recording.store(false, Ordering::Release);
        drop(self.stream);

        if let Some(writer) = self.writer {
            let writer = Arc::try_unwrap(writer)
                .map_err(|_| RecorderError::Stream("WAV writer still in use".to_string()))?;
            let writer = writer
                .into_inner()
                .map_err(|_| RecorderError::Stream("WAV writer lock poisoned".to_string()))?;
            writer.finalize()?;
        }

        Ok(self.path)
    }
}

/// List all available audio input devices
pub fn list_devices() -> Result<Vec<InputDeviceInfo>, RecorderError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::Device(e.to_string()))?;
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let mut infos = Vec::new();
    for device in devices {
        let name = device.name().unwrap_or("Unknown Device".to_string());
        let is_default = name == default_name;

        let mut sample_rates = Vec::new();
        let mut formats = Vec::new();
        if let Ok(configs) = device.supported_input_configs() {
            for config in configs {
                sample_rates.push(config.max_sample_rate().0);
                formats.push(config.sample_format());
            }
        }

        infos.push(InputDeviceInfo {
            name,
            is_default,
            sample_rates,
            formats,
        });
    }

    Ok(infos)
}

/// Timestamped recording path under the platform data directory, creating
/// the directory if needed.
pub fn default_output_path() -> Result<PathBuf, RecorderError> {
    let dir = directories::BaseDirs::new()
        .ok_or(RecorderError::NoDataDir)?
        .data_local_dir()
        .join("recmeter")
        .join("recordings");
    std::fs::create_dir_all(&dir)?;

    // ISO-like stamp with ':' avoided for filename portability.
    let timestamp = jiff::Zoned::now().strftime("%Y-%m-%dT%H-%M-%S");
    Ok(dir.join(format!("{}.wav", timestamp)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_buffer_is_at_the_floor() {
        assert_eq!(buffer_power_db(&[]), DB_FLOOR);
        assert_eq!(buffer_power_db(&[0.0; 256]), DB_FLOOR);
    }

    #[test]
    fn test_full_scale_buffer_is_zero_db() {
        let db = buffer_power_db(&[1.0; 256]);
        assert!(db.abs() < 1e-3, "expected ~0 dBFS, got {}", db);
    }

    #[test]
    fn test_half_scale_buffer_is_about_minus_six_db() {
        let db = buffer_power_db(&[0.5; 256]);
        assert!((db + 6.02).abs() < 0.1, "expected ~-6 dBFS, got {}", db);
    }

    #[test]
    fn test_probe_round_trips_power_and_guard() {
        let probe = LevelProbe::new();
        assert_eq!(probe.power_db(), DB_FLOOR);
        assert!(!probe.is_recording());

        probe.publish(-12.5);
        probe.recording.store(true, Ordering::Release);
        assert_eq!(probe.power_db(), -12.5);
        assert!(probe.is_recording());
    }
}
