//! Looping source: plays a wrapped source inside a loop window
//!
//! [`LoopingSource`] wraps any [`PositionableSource`] and, while looping is
//! enabled, wraps playback from the loop end back to the loop start. Blocks
//! that straddle the loop end are assembled in a scratch buffer from two reads
//! of the wrapped source, so the caller always receives one contiguous block.
//!
//! # Threading
//!
//! The source itself lives on the audio thread. Configuration threads use a
//! [`LoopHandle`]. Both sides share the [`LoopWindow`] behind one mutex; the
//! audio thread only holds it long enough to copy a snapshot and never while
//! reading audio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seamloop_common::timing::DEFAULT_SAMPLE_RATE;
use tracing::{debug, warn};

use crate::audio::loop_window::{BlockPlan, LoopState, LoopWindow};
use crate::audio::source::{InputSource, PositionableSource};
use crate::audio::types::{AudioBlock, AudioBuffer};
use crate::error::Result;

/// Channels in the scratch buffer
const SCRATCH_CHANNELS: usize = 2;

/// Scratch size before the first `prepare_to_play`
const INITIAL_SCRATCH_SAMPLES: usize = 512;

#[derive(Debug, Clone, Copy)]
struct LoopSettings {
    window: LoopWindow,
    sample_rate: f64,
}

/// Loop state shared between the audio thread and loop handles
struct SharedLoopState {
    settings: Mutex<LoopSettings>,
    /// Set when a handle moved the window; the audio thread re-maps its cursor
    /// before the next block.
    reposition_pending: AtomicBool,
}

impl SharedLoopState {
    fn new() -> Self {
        Self {
            settings: Mutex::new(LoopSettings {
                window: LoopWindow::default(),
                sample_rate: DEFAULT_SAMPLE_RATE,
            }),
            reposition_pending: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopSettings> {
        // Plain Copy data: a poisoned lock still holds a whole window
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> LoopWindow {
        self.lock().window
    }

    /// Store new loop times. Returns false (window unchanged) for an inverted
    /// range or one whose sample length does not fit in an `i64`.
    fn store_loop_times(&self, start_time: f64, end_time: f64) -> bool {
        debug_assert!(end_time > start_time, "loop end must be after loop start");
        if !(end_time > start_time) {
            warn!(
                "Ignoring loop window with end ({}s) not after start ({}s)",
                end_time, start_time
            );
            return false;
        }

        let window = {
            let mut settings = self.lock();
            let mut window = settings.window;
            window.set_times(start_time, end_time, settings.sample_rate);
            if window.end_sample.checked_sub(window.start_sample).is_none() {
                drop(settings);
                warn!(
                    "Ignoring loop window {}s-{}s: sample range too large",
                    start_time, end_time
                );
                return false;
            }
            settings.window = window;
            window
        };

        debug!(
            "Loop window set to {:.3}s-{:.3}s (samples {}..{})",
            start_time, end_time, window.start_sample, window.end_sample
        );
        true
    }

    fn set_enabled(&self, enabled: bool) {
        self.lock().window.enabled = enabled;
    }

    /// Record a new sample rate. Returns true if the sample bounds moved.
    fn set_sample_rate(&self, sample_rate: f64) -> bool {
        let mut settings = self.lock();
        if settings.sample_rate == sample_rate {
            return false;
        }
        settings.sample_rate = sample_rate;
        let before = settings.window;
        settings.window.rederive(sample_rate);
        settings.window != before
    }
}

/// Plays a wrapped source, looping between two times while enabled.
///
/// The wrapped source is either owned (dropped with the looping source) or
/// borrowed (returned to the caller when the looping source is dropped); see
/// [`InputSource`].
pub struct LoopingSource<'a, S: PositionableSource + ?Sized> {
    input: InputSource<'a, S>,
    shared: Arc<SharedLoopState>,
    scratch: AudioBuffer,
}

impl<'a, S: PositionableSource + ?Sized> LoopingSource<'a, S> {
    /// Wrap a source. Looping starts disabled with an empty window.
    pub fn new(input: InputSource<'a, S>) -> Self {
        Self {
            input,
            shared: Arc::new(SharedLoopState::new()),
            scratch: AudioBuffer::new(SCRATCH_CHANNELS, INITIAL_SCRATCH_SAMPLES),
        }
    }

    /// Wrap a source and take ownership of it
    pub fn owning(source: Box<S>) -> Self {
        Self::new(InputSource::Owned(source))
    }

    /// Wrap a source that the caller keeps ownership of
    pub fn borrowing(source: &'a mut S) -> Self {
        Self::new(InputSource::Borrowed(source))
    }

    /// Handle for configuring the loop from other threads
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether the wrapped source is dropped together with this one
    pub fn owns_input(&self) -> bool {
        self.input.is_owned()
    }

    /// Set the loop bounds in seconds and move the read position into the
    /// new window.
    ///
    /// `end_time` must be after `start_time`. Violations panic in debug builds
    /// and leave the window unchanged in release builds.
    pub fn set_loop_times(&mut self, start_time: f64, end_time: f64) {
        if !self.shared.store_loop_times(start_time, end_time) {
            return;
        }

        let position = self.input.next_read_position();
        self.set_next_read_position(position);
    }

    /// Enable or disable looping. Bounds are left untouched.
    pub fn set_loop_between_times(&self, should_loop: bool) {
        self.shared.set_enabled(should_loop);
    }

    pub fn loop_between_times(&self) -> bool {
        self.shared.snapshot().enabled
    }

    pub fn loop_state(&self) -> LoopState {
        self.shared.snapshot().state()
    }

    /// Current loop window
    pub fn loop_window(&self) -> LoopWindow {
        self.shared.snapshot()
    }

    /// Sample rate used to derive sample bounds from loop times
    pub fn sample_rate(&self) -> f64 {
        self.shared.lock().sample_rate
    }

    /// Capacity of the scratch buffer in samples
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.num_samples()
    }

    /// Re-map the cursor if a handle moved the window since the last block.
    fn apply_pending_reposition(&mut self) {
        if self.shared.reposition_pending.swap(false, Ordering::AcqRel) {
            let position = self.input.next_read_position();
            self.set_next_read_position(position);
        }
    }

    /// Serve a block that crosses the loop end through the scratch buffer.
    fn read_across_loop_end(
        &mut self,
        window: &LoopWindow,
        head: usize,
        block: &mut AudioBlock<'_>,
    ) -> Result<()> {
        let num_samples = block.num_samples;

        // Larger than the scratch: write the segments straight into the caller's block
        if num_samples > self.scratch.num_samples() {
            return read_wrapped(&mut *self.input, window, head, block);
        }

        let mut scratch = AudioBlock::new(&mut self.scratch, 0, num_samples);
        read_wrapped(&mut *self.input, window, head, &mut scratch)?;

        let scratch_channels = self.scratch.num_channels();
        for channel in 0..block.num_channels() {
            if channel < scratch_channels {
                block
                    .buffer
                    .copy_from(channel, block.start_sample, &self.scratch, channel, 0, num_samples);
            } else {
                block.channel_mut(channel).fill(0.0);
            }
        }

        Ok(())
    }
}

/// Read `block.num_samples` samples, the first `head` of them from the
/// current position and the rest from the loop start onwards.
///
/// The rest is read in whole-window passes so windows shorter than the block
/// still produce the modular sequence.
fn read_wrapped<S: PositionableSource + ?Sized>(
    input: &mut S,
    window: &LoopWindow,
    head: usize,
    block: &mut AudioBlock<'_>,
) -> Result<()> {
    let num_samples = block.num_samples;

    if head > 0 {
        input.get_next_audio_block(&mut block.sub_block(0, head))?;
    }

    // Only active windows are planned to wrap, so the span is positive
    let loop_length = usize::try_from(window.length()).unwrap_or(usize::MAX);
    let mut written = head;
    while written < num_samples {
        input.set_next_read_position(window.start_sample);
        let count = (num_samples - written).min(loop_length);
        input.get_next_audio_block(&mut block.sub_block(written, count))?;
        written += count;
    }

    Ok(())
}

impl<S: PositionableSource + ?Sized> PositionableSource for LoopingSource<'_, S> {
    fn prepare_to_play(&mut self, samples_per_block_expected: usize, sample_rate: f64) {
        let bounds_moved = self.shared.set_sample_rate(sample_rate);
        self.input.prepare_to_play(samples_per_block_expected, sample_rate);
        self.scratch.ensure_size(SCRATCH_CHANNELS, samples_per_block_expected);

        if bounds_moved {
            let position = self.input.next_read_position();
            self.set_next_read_position(position);
        }
    }

    fn release_resources(&mut self) {
        self.input.release_resources();
    }

    fn get_next_audio_block(&mut self, block: &mut AudioBlock<'_>) -> Result<()> {
        if block.num_samples == 0 {
            return Ok(());
        }

        self.apply_pending_reposition();

        let window = self.shared.snapshot();
        if !window.is_active() {
            return self.input.get_next_audio_block(block);
        }

        let cursor = self.input.next_read_position();
        match window.plan_block(cursor, block.num_samples) {
            BlockPlan::Direct => self.input.get_next_audio_block(block),
            BlockPlan::Wrap { head } => self.read_across_loop_end(&window, head, block),
        }
    }

    fn set_next_read_position(&mut self, position: i64) {
        // An explicit seek supersedes any re-map a handle asked for
        self.shared.reposition_pending.store(false, Ordering::Release);

        let cursor = self.input.next_read_position();
        let resolved = self.shared.snapshot().remap_position(cursor, position);
        self.input.set_next_read_position(resolved);
    }

    fn next_read_position(&self) -> i64 {
        self.input.next_read_position()
    }

    fn total_length(&self) -> i64 {
        self.input.total_length()
    }

    fn is_looping(&self) -> bool {
        self.input.is_looping()
    }

    fn set_looping(&mut self, should_loop: bool) {
        self.input.set_looping(should_loop);
    }
}

/// Thread-safe handle for configuring a [`LoopingSource`].
///
/// Changes to the bounds are picked up by the audio thread before its next
/// block, which also moves the read position into the new window.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<SharedLoopState>,
}

impl LoopHandle {
    /// Set the loop bounds in seconds.
    ///
    /// `end_time` must be after `start_time`. Violations panic in debug builds
    /// and leave the window unchanged in release builds.
    pub fn set_loop_times(&self, start_time: f64, end_time: f64) {
        if self.shared.store_loop_times(start_time, end_time) {
            self.shared.reposition_pending.store(true, Ordering::Release);
        }
    }

    /// Enable or disable looping. Bounds are left untouched.
    pub fn set_loop_between_times(&self, should_loop: bool) {
        self.shared.set_enabled(should_loop);
    }

    pub fn loop_between_times(&self) -> bool {
        self.shared.snapshot().enabled
    }

    pub fn loop_state(&self) -> LoopState {
        self.shared.snapshot().state()
    }

    pub fn loop_window(&self) -> LoopWindow {
        self.shared.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory_source::MemorySource;

    fn ramp_source(length: usize) -> MemorySource {
        let samples: Vec<f32> = (0..length).map(|i| i as f32).collect();
        MemorySource::new(
            AudioBuffer::from_channels(vec![samples.clone(), samples]),
            false,
        )
    }

    #[test]
    fn test_starts_disabled_with_empty_window() {
        let looping = LoopingSource::owning(Box::new(ramp_source(16)));

        assert!(!looping.loop_between_times());
        assert_eq!(looping.loop_state(), LoopState::Disabled);
        assert_eq!(looping.loop_window(), LoopWindow::default());
        assert_eq!(looping.sample_rate(), DEFAULT_SAMPLE_RATE);
        assert!(looping.owns_input());
    }

    #[test]
    fn test_prepare_grows_scratch_but_never_shrinks() {
        let mut looping = LoopingSource::owning(Box::new(ramp_source(16)));
        assert_eq!(looping.scratch_capacity(), INITIAL_SCRATCH_SAMPLES);

        looping.prepare_to_play(2048, 48_000.0);
        assert_eq!(looping.scratch_capacity(), 2048);

        looping.prepare_to_play(256, 48_000.0);
        assert_eq!(looping.scratch_capacity(), 2048);
        assert_eq!(looping.sample_rate(), 48_000.0);
    }

    #[test]
    fn test_prepare_rederives_bounds_for_new_rate() {
        let mut looping = LoopingSource::owning(Box::new(ramp_source(16)));
        looping.prepare_to_play(512, 10.0);
        looping.set_loop_times(0.2, 1.0);
        assert_eq!(looping.loop_window().end_sample, 10);

        looping.prepare_to_play(512, 20.0);
        let window = looping.loop_window();
        assert_eq!(window.start_sample, 4);
        assert_eq!(window.end_sample, 20);
    }

    #[test]
    fn test_zero_length_request_is_noop() {
        let mut looping = LoopingSource::owning(Box::new(ramp_source(16)));
        looping.prepare_to_play(8, 10.0);
        looping.set_loop_times(0.0, 1.0);
        looping.set_loop_between_times(true);

        let mut buffer = AudioBuffer::new(2, 8);
        looping
            .get_next_audio_block(&mut AudioBlock::new(&mut buffer, 0, 0))
            .unwrap();

        assert_eq!(looping.next_read_position(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "loop end must be after loop start")]
    fn test_inverted_loop_times_panic_in_debug() {
        let mut looping = LoopingSource::owning(Box::new(ramp_source(16)));
        looping.set_loop_times(2.0, 1.0);
    }

    #[test]
    fn test_handle_shares_window() {
        let looping = LoopingSource::owning(Box::new(ramp_source(16)));
        let handle = looping.handle();

        handle.set_loop_between_times(true);
        assert!(looping.loop_between_times());
        assert_eq!(handle.loop_state(), LoopState::Looping);

        looping.set_loop_between_times(false);
        assert!(!handle.loop_between_times());
    }
}
