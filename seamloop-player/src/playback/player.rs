//! Audio-thread renderer
//!
//! [`SourcePlayer`] pulls blocks from a [`PositionableSource`] in chunks no
//! larger than the prepared block size and turns them into stereo frames for
//! the output device. It never logs or allocates while rendering; progress and
//! failures are published through [`PlayerStatus`] for the control loop.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::output::FrameRenderer;
use crate::audio::source::PositionableSource;
use crate::audio::types::{AudioBlock, AudioBuffer, AudioFrame};

/// Channels rendered by the player
const RENDER_CHANNELS: usize = 2;

/// Playback progress shared with the control loop
#[derive(Debug)]
pub struct PlayerStatus {
    position: AtomicI64,
    total_length: i64,
    source_error: AtomicBool,
    blocks_rendered: AtomicU64,
}

impl PlayerStatus {
    fn new(position: i64, total_length: i64) -> Self {
        Self {
            position: AtomicI64::new(position),
            total_length,
            source_error: AtomicBool::new(false),
            blocks_rendered: AtomicU64::new(0),
        }
    }

    /// Read position of the source after the last rendered block
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Length of the source in samples
    pub fn total_length(&self) -> i64 {
        self.total_length
    }

    /// Whether playback has run past the end of the source
    pub fn is_past_end(&self) -> bool {
        self.position() >= self.total_length
    }

    /// Returns true once per source failure and resets the flag
    pub fn take_source_error(&self) -> bool {
        self.source_error.swap(false, Ordering::AcqRel)
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered.load(Ordering::Relaxed)
    }
}

/// Renders a positionable source into stereo frames.
pub struct SourcePlayer {
    source: Box<dyn PositionableSource>,
    buffer: AudioBuffer,
    block_size: usize,
    status: Arc<PlayerStatus>,
}

impl SourcePlayer {
    /// Prepare `source` for blocks of up to `block_size` samples at `sample_rate`.
    pub fn new(mut source: Box<dyn PositionableSource>, block_size: usize, sample_rate: f64) -> Self {
        let block_size = block_size.max(1);
        source.prepare_to_play(block_size, sample_rate);

        let status = Arc::new(PlayerStatus::new(
            source.next_read_position(),
            source.total_length(),
        ));

        Self {
            source,
            buffer: AudioBuffer::new(RENDER_CHANNELS, block_size),
            block_size,
            status,
        }
    }

    pub fn status(&self) -> Arc<PlayerStatus> {
        Arc::clone(&self.status)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl FrameRenderer for SourcePlayer {
    fn render(&mut self, frames: &mut [AudioFrame]) {
        for chunk in frames.chunks_mut(self.block_size) {
            let mut block = AudioBlock::new(&mut self.buffer, 0, chunk.len());
            if self.source.get_next_audio_block(&mut block).is_err() {
                self.status.source_error.store(true, Ordering::Release);
                block.clear();
            }

            for (index, frame) in chunk.iter_mut().enumerate() {
                *frame = self.buffer.frame(index);
            }
            self.status.blocks_rendered.fetch_add(1, Ordering::Relaxed);
        }

        self.status
            .position
            .store(self.source.next_read_position(), Ordering::Relaxed);
    }
}

impl Drop for SourcePlayer {
    fn drop(&mut self) {
        self.source.release_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory_source::MemorySource;
    use crate::error::{Error, Result};

    fn ramp_source(length: usize) -> Box<dyn PositionableSource> {
        let left: Vec<f32> = (0..length).map(|i| i as f32).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        Box::new(MemorySource::new(
            AudioBuffer::from_channels(vec![left, right]),
            false,
        ))
    }

    struct FailingSource;

    impl PositionableSource for FailingSource {
        fn prepare_to_play(&mut self, _: usize, _: f64) {}
        fn release_resources(&mut self) {}
        fn get_next_audio_block(&mut self, block: &mut AudioBlock<'_>) -> Result<()> {
            block.channel_mut(0).fill(1.0);
            Err(Error::Source("read failed".to_string()))
        }
        fn set_next_read_position(&mut self, _: i64) {}
        fn next_read_position(&self) -> i64 {
            0
        }
        fn total_length(&self) -> i64 {
            100
        }
        fn is_looping(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_render_interleaves_stereo() {
        let mut player = SourcePlayer::new(ramp_source(8), 4, 44_100.0);
        let mut frames = [AudioFrame::zero(); 3];

        player.render(&mut frames);

        assert_eq!(frames[0], AudioFrame::from_stereo(0.0, 0.0));
        assert_eq!(frames[2], AudioFrame::from_stereo(2.0, -2.0));
        assert_eq!(player.status().position(), 3);
    }

    #[test]
    fn test_render_splits_into_prepared_blocks() {
        let mut player = SourcePlayer::new(ramp_source(16), 4, 44_100.0);
        let status = player.status();
        let mut frames = [AudioFrame::zero(); 10];

        player.render(&mut frames);

        assert_eq!(status.blocks_rendered(), 3);
        assert_eq!(frames[9].left, 9.0);
        assert_eq!(status.position(), 10);
    }

    #[test]
    fn test_past_end_detected() {
        let mut player = SourcePlayer::new(ramp_source(4), 4, 44_100.0);
        let status = player.status();
        assert!(!status.is_past_end());

        let mut frames = [AudioFrame::zero(); 6];
        player.render(&mut frames);

        assert!(status.is_past_end());
        assert_eq!(frames[5], AudioFrame::zero());
    }

    #[test]
    fn test_source_error_renders_silence_and_sets_flag() {
        let mut player = SourcePlayer::new(Box::new(FailingSource), 4, 44_100.0);
        let status = player.status();
        let mut frames = [AudioFrame::from_mono(0.5); 2];

        player.render(&mut frames);

        assert_eq!(frames, [AudioFrame::zero(); 2]);
        assert!(status.take_source_error());
        assert!(!status.take_source_error());
    }

    #[test]
    fn test_zero_block_size_is_clamped() {
        let player = SourcePlayer::new(ramp_source(4), 0, 44_100.0);
        assert_eq!(player.block_size(), 1);
    }
}
