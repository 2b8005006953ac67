//! Block-based, position-seekable audio sources
//!
//! A [`PositionableSource`] produces audio in blocks on request and owns its
//! own read cursor. Wrappers such as
//! [`LoopingSource`](crate::audio::LoopingSource) never cache that cursor;
//! they always query or move it through this interface.

use std::ops::{Deref, DerefMut};

use crate::audio::types::AudioBlock;
use crate::error::Result;

/// A source of audio blocks with a seekable read position (in samples).
///
/// Block delivery runs on the real-time audio thread: implementations should
/// not allocate or block in [`get_next_audio_block`](Self::get_next_audio_block).
pub trait PositionableSource: Send {
    /// Called before playback starts, with the largest block size that will be
    /// requested and the output sample rate.
    fn prepare_to_play(&mut self, samples_per_block_expected: usize, sample_rate: f64);

    /// Called when playback stops. Resources may be freed until the next
    /// [`prepare_to_play`](Self::prepare_to_play).
    fn release_resources(&mut self);

    /// Fill every channel of `block` with the next `block.num_samples`
    /// samples and advance the read position by that amount.
    fn get_next_audio_block(&mut self, block: &mut AudioBlock<'_>) -> Result<()>;

    /// Move the read position to `position`
    fn set_next_read_position(&mut self, position: i64);

    /// The position the next block will be read from
    fn next_read_position(&self) -> i64;

    /// Total length of the source in samples
    fn total_length(&self) -> i64;

    /// Whether the source wraps back to its start when it reaches the end
    fn is_looping(&self) -> bool;

    /// Ask the source to wrap at its end. Sources that cannot loop ignore this.
    fn set_looping(&mut self, _should_loop: bool) {}
}

impl<S: PositionableSource + ?Sized> PositionableSource for Box<S> {
    fn prepare_to_play(&mut self, samples_per_block_expected: usize, sample_rate: f64) {
        (**self).prepare_to_play(samples_per_block_expected, sample_rate)
    }

    fn release_resources(&mut self) {
        (**self).release_resources()
    }

    fn get_next_audio_block(&mut self, block: &mut AudioBlock<'_>) -> Result<()> {
        (**self).get_next_audio_block(block)
    }

    fn set_next_read_position(&mut self, position: i64) {
        (**self).set_next_read_position(position)
    }

    fn next_read_position(&self) -> i64 {
        (**self).next_read_position()
    }

    fn total_length(&self) -> i64 {
        (**self).total_length()
    }

    fn is_looping(&self) -> bool {
        (**self).is_looping()
    }

    fn set_looping(&mut self, should_loop: bool) {
        (**self).set_looping(should_loop)
    }
}

/// A wrapped source and who is responsible for destroying it.
///
/// `Owned` sources are dropped together with the wrapper. `Borrowed` sources
/// stay with the caller, who gets them back once the wrapper is gone.
pub enum InputSource<'a, S: ?Sized> {
    Owned(Box<S>),
    Borrowed(&'a mut S),
}

impl<S: ?Sized> InputSource<'_, S> {
    /// Whether dropping the wrapper also drops the source
    pub fn is_owned(&self) -> bool {
        matches!(self, InputSource::Owned(_))
    }
}

impl<S: ?Sized> Deref for InputSource<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        match self {
            InputSource::Owned(source) => source,
            InputSource::Borrowed(source) => source,
        }
    }
}

impl<S: ?Sized> DerefMut for InputSource<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        match self {
            InputSource::Owned(source) => source,
            InputSource::Borrowed(source) => source,
        }
    }
}
