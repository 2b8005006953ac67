//! A positionable source that records how it is driven
//!
//! Every channel of every block holds the sample's own position as an f32,
//! so a delivered block shows exactly which source samples ended up where.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use seamloop_player::audio::{AudioBlock, PositionableSource};
use seamloop_player::{Error, Result};

/// One call made on a [`RecordingSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Read { position: i64, num_samples: usize },
    Seek(i64),
}

pub struct RecordingSource {
    position: i64,
    length: i64,
    calls: Vec<SourceCall>,
    prepared: Option<(usize, f64)>,
    releases: usize,
    failing: bool,
    dropped: Option<Arc<AtomicBool>>,
}

impl RecordingSource {
    pub fn new(length: i64) -> Self {
        Self {
            position: 0,
            length,
            calls: Vec::new(),
            prepared: None,
            releases: 0,
            failing: false,
            dropped: None,
        }
    }

    /// Like `new`, but sets `dropped` when the source is destroyed
    pub fn with_drop_flag(length: i64, dropped: Arc<AtomicBool>) -> Self {
        let mut source = Self::new(length);
        source.dropped = Some(dropped);
        source
    }

    pub fn calls(&self) -> &[SourceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn prepared(&self) -> Option<(usize, f64)> {
        self.prepared
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Make every following read fail
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl PositionableSource for RecordingSource {
    fn prepare_to_play(&mut self, samples_per_block_expected: usize, sample_rate: f64) {
        self.prepared = Some((samples_per_block_expected, sample_rate));
    }

    fn release_resources(&mut self) {
        self.releases += 1;
    }

    fn get_next_audio_block(&mut self, block: &mut AudioBlock<'_>) -> Result<()> {
        if self.failing {
            return Err(Error::Source(format!("read failed at {}", self.position)));
        }

        self.calls.push(SourceCall::Read {
            position: self.position,
            num_samples: block.num_samples,
        });

        for channel in 0..block.num_channels() {
            for (offset, sample) in block.channel_mut(channel).iter_mut().enumerate() {
                *sample = (self.position + offset as i64) as f32;
            }
        }

        self.position += block.num_samples as i64;
        Ok(())
    }

    fn set_next_read_position(&mut self, position: i64) {
        self.calls.push(SourceCall::Seek(position));
        self.position = position;
    }

    fn next_read_position(&self) -> i64 {
        self.position
    }

    fn total_length(&self) -> i64 {
        self.length
    }

    fn is_looping(&self) -> bool {
        false
    }
}

impl Drop for RecordingSource {
    fn drop(&mut self) {
        if let Some(flag) = &self.dropped {
            flag.store(true, Ordering::SeqCst);
        }
    }
}
