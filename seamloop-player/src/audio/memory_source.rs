//! In-memory positionable source
//!
//! Plays a fully decoded [`AudioBuffer`]. Reads outside the data produce
//! silence unless the source is set to loop, in which case positions wrap
//! modulo the data length.

use crate::audio::source::PositionableSource;
use crate::audio::types::{AudioBlock, AudioBuffer};
use crate::error::Result;

/// Positionable source backed by a decoded buffer.
///
/// Output channels beyond the data's channel count repeat the data's
/// channels (`output % data`), so mono data fills both sides of a stereo block.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: AudioBuffer,
    position: i64,
    looping: bool,
}

impl MemorySource {
    pub fn new(data: AudioBuffer, looping: bool) -> Self {
        Self {
            data,
            position: 0,
            looping,
        }
    }

    /// Build from interleaved samples, as produced by the decoder
    pub fn from_interleaved(samples: &[f32], num_channels: usize, looping: bool) -> Self {
        Self::new(AudioBuffer::from_interleaved(samples, num_channels), looping)
    }

    /// The samples being played
    pub fn data(&self) -> &AudioBuffer {
        &self.data
    }

    /// Index into the data for `position`, or None for silence
    fn data_index(&self, position: i64, length: i64) -> Option<usize> {
        if self.looping {
            Some(position.rem_euclid(length) as usize)
        } else if (0..length).contains(&position) {
            Some(position as usize)
        } else {
            None
        }
    }
}

impl PositionableSource for MemorySource {
    fn prepare_to_play(&mut self, _samples_per_block_expected: usize, _sample_rate: f64) {}

    fn release_resources(&mut self) {}

    fn get_next_audio_block(&mut self, block: &mut AudioBlock<'_>) -> Result<()> {
        let num_samples = block.num_samples;
        let length = self.data.num_samples() as i64;
        let data_channels = self.data.num_channels();

        if length == 0 || data_channels == 0 {
            block.clear();
        } else {
            for channel in 0..block.num_channels() {
                let source = self.data.channel(channel % data_channels);
                let output = block.channel_mut(channel);
                for (offset, sample) in output.iter_mut().enumerate() {
                    let position = self.position.saturating_add(offset as i64);
                    *sample = match self.data_index(position, length) {
                        Some(index) => source[index],
                        None => 0.0,
                    };
                }
            }
        }

        self.position = self.position.saturating_add(num_samples as i64);
        if self.looping && length > 0 {
            self.position = self.position.rem_euclid(length);
        }

        Ok(())
    }

    fn set_next_read_position(&mut self, position: i64) {
        self.position = position;
    }

    fn next_read_position(&self) -> i64 {
        self.position
    }

    fn total_length(&self) -> i64 {
        self.data.num_samples() as i64
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn set_looping(&mut self, should_loop: bool) {
        self.looping = should_loop;
    }
}
