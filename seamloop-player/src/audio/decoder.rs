//! Audio decoder using symphonia
//!
//! Decodes a whole file (MP3, FLAC, AAC, Vorbis, WAV) into planar f32 samples
//! that can be played from memory.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::memory_source::MemorySource;
use crate::audio::types::AudioBuffer;
use crate::error::{Error, Result};

/// A fully decoded file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Planar samples at the file's own rate
    pub samples: AudioBuffer,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Length in frames
    pub fn num_frames(&self) -> usize {
        self.samples.num_samples()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / f64::from(self.sample_rate)
    }

    /// Hand the samples to an in-memory source
    pub fn into_source(self) -> MemorySource {
        MemorySource::new(self.samples, false)
    }
}

/// Decode an entire audio file.
///
/// # Errors
/// - Failed to open file
/// - Unsupported audio format
/// - Decoder construction failed
/// - The file contains no decodable audio
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    debug!("Decoding entire file: {}", path.display());

    let file = File::open(path)
        .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

    let channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

    debug!(
        "Audio format: sample_rate={}, channels={}",
        sample_rate, channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;
    let mut buffer_frames = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                debug!("Reached end of file");
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!("Stream reset requested, stopping decode");
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let frames = decoded.capacity();
                if sample_buffer.is_none() || frames > buffer_frames {
                    sample_buffer = Some(SampleBuffer::new(frames as u64, *decoded.spec()));
                    buffer_frames = frames;
                }
                if let Some(buffer) = sample_buffer.as_mut() {
                    buffer.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buffer.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Decode error: {}", e);
                continue;
            }
            Err(e) => {
                return Err(Error::Decode(format!("Decoder failed: {}", e)));
            }
        }
    }

    if interleaved.is_empty() {
        return Err(Error::Decode(format!(
            "No audio decoded from {}",
            path.display()
        )));
    }

    let samples = AudioBuffer::from_interleaved(&interleaved, usize::from(channels));

    debug!(
        "Decoded {} frames ({} channels)",
        samples.num_samples(),
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}
