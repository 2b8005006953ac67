//! Audio output using cpal
//!
//! Opens an output device (falling back to the default device), builds a
//! stream in the device's sample format and pulls stereo frames from a
//! [`FrameRenderer`] on the audio thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, error, info, warn};

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};

/// Frames rendered per pass inside the device callback
const CALLBACK_CHUNK_FRAMES: usize = 512;

/// Produces stereo frames on the audio thread.
///
/// Called once per chunk of the device buffer; must fill every frame.
pub trait FrameRenderer: Send + 'static {
    fn render(&mut self, frames: &mut [AudioFrame]);
}

impl<F> FrameRenderer for F
where
    F: FnMut(&mut [AudioFrame]) + Send + 'static,
{
    fn render(&mut self, frames: &mut [AudioFrame]) {
        self(frames)
    }
}

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    volume: Arc<Mutex<f32>>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `preferred_sample_rate`: Rate to request if the device supports it
    ///   (usually the file's own rate)
    /// - `buffer_size`: Optional buffer size in frames (None = device default)
    ///
    /// If the requested device is not found, the default device is used.
    pub fn open(
        device_name: Option<&str>,
        preferred_sample_rate: u32,
        buffer_size: Option<u32>,
    ) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    Error::AudioOutput(format!("Failed to enumerate devices: {}", e))
                })?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!(
                            "Requested device '{}' not found, falling back to default device",
                            name
                        );
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let (mut config, sample_format) = Self::best_config(&device, preferred_sample_rate)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        } else {
            debug!("Using device default buffer size");
        }

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            volume: Arc::new(Mutex::new(1.0)),
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Prefer stereo f32 at `sample_rate`, else the device default.
    fn best_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= sample_rate
                && config.max_sample_rate().0 >= sample_rate
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(sample_rate))
                .config();
            return Ok((config, sample_format));
        }

        warn!(
            "Device has no stereo f32 config at {} Hz, using its default config",
            sample_rate
        );
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    /// Start playback, pulling frames from `renderer` on the audio thread.
    ///
    /// Volume and clamping are applied after rendering.
    pub fn start<R: FrameRenderer>(&mut self, renderer: R) -> Result<()> {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32, R>(renderer, |s| s)?,
            SampleFormat::I16 => {
                self.build_stream::<i16, R>(renderer, |s| (s * i16::MAX as f32) as i16)?
            }
            SampleFormat::U16 => {
                self.build_stream::<u16, R>(renderer, |s| ((s + 1.0) * 32767.5) as u16)?
            }
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started");
        Ok(())
    }

    fn build_stream<T, R>(&self, mut renderer: R, convert: fn(f32) -> T) -> Result<Stream>
    where
        T: SizedSample + Send + 'static,
        R: FrameRenderer,
    {
        let channels = usize::from(self.config.channels);
        let volume = Arc::clone(&self.volume);
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        let silence = convert(0.0);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let current_volume = *volume.lock().unwrap_or_else(PoisonError::into_inner);
                    let mut chunk = [AudioFrame::zero(); CALLBACK_CHUNK_FRAMES];

                    for output in data.chunks_mut(CALLBACK_CHUNK_FRAMES * channels) {
                        let frames = &mut chunk[..output.len() / channels];
                        renderer.render(frames);

                        for (out, frame) in output.chunks_mut(channels).zip(frames.iter()) {
                            let mut frame = *frame;
                            frame.apply_volume(current_volume);
                            frame.clamp();

                            out[0] = convert(frame.left);
                            if channels > 1 {
                                out[1] = convert(frame.right);
                            }
                            for extra in out.iter_mut().skip(2) {
                                *extra = silence;
                            }
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                    error_count.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop playback and drop the stream.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }

        Ok(())
    }

    /// Set output volume, clamped to [0.0, 1.0].
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.volume.lock().unwrap_or_else(PoisonError::into_inner) = clamped;
        debug!("Volume set to {:.2}", clamped);
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Requested buffer size in frames, if fixed
    pub fn buffer_size(&self) -> Option<u32> {
        match self.config.buffer_size {
            cpal::BufferSize::Fixed(size) => Some(size),
            cpal::BufferSize::Default => None,
        }
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Whether the stream has reported an error since the last check
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }

    pub fn clear_error(&self) {
        self.error_flag.store(false, Ordering::SeqCst);
        self.error_count.store(0, Ordering::SeqCst);
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
