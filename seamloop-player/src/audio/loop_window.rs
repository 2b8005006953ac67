//! Loop window bounds and the position arithmetic built on them
//!
//! The window is the half-open sample range `[start_sample, end_sample)`:
//! `start_sample` is played, `end_sample` is the first sample that is not.
//! All arithmetic here is pure so it can run inside the window lock.

use seamloop_common::timing::seconds_to_samples;

/// Loop bounds in both time and sample units, plus the enabled flag.
///
/// Sample bounds are derived from the time bounds at the active sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopWindow {
    /// First sample of the loop (inclusive)
    pub start_sample: i64,
    /// End of the loop (exclusive)
    pub end_sample: i64,
    /// Loop start in seconds
    pub start_time: f64,
    /// Loop end in seconds
    pub end_time: f64,
    /// Whether playback wraps at `end_sample`
    pub enabled: bool,
}

/// Looping state as seen by the audio thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Blocks pass straight through to the wrapped source
    Disabled,
    /// Playback wraps from `end_sample` back to `start_sample`
    Looping,
}

/// How a block request is served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPlan {
    /// Read the whole block from the current position
    Direct,
    /// Read `head` samples up to the loop end, then continue from the loop start
    Wrap { head: usize },
}

impl LoopWindow {
    /// Sample span of a non-empty window, or `None` when the range is empty,
    /// inverted, or too wide to measure in an `i64`.
    pub fn span(&self) -> Option<i64> {
        self.end_sample
            .checked_sub(self.start_sample)
            .filter(|&length| length > 0)
    }

    /// Loop length in samples, 0 for a window without a usable span
    pub fn length(&self) -> i64 {
        self.span().unwrap_or(0)
    }

    /// Enabled with a usable span. Other windows never wrap.
    pub fn is_active(&self) -> bool {
        self.enabled && self.span().is_some()
    }

    pub fn state(&self) -> LoopState {
        if self.enabled {
            LoopState::Looping
        } else {
            LoopState::Disabled
        }
    }

    /// Whether `position` lies in `[start_sample, end_sample)`
    pub fn contains(&self, position: i64) -> bool {
        position >= self.start_sample && position < self.end_sample
    }

    /// Store new time bounds and derive the sample bounds from them
    pub(crate) fn set_times(&mut self, start_time: f64, end_time: f64, sample_rate: f64) {
        self.start_time = start_time;
        self.end_time = end_time;
        self.rederive(sample_rate);
    }

    /// Recompute the sample bounds for a new sample rate
    pub(crate) fn rederive(&mut self, sample_rate: f64) {
        self.start_sample = seconds_to_samples(self.start_time, sample_rate);
        self.end_sample = seconds_to_samples(self.end_time, sample_rate);
    }

    /// Resolve a seek target given where the cursor currently is.
    ///
    /// Only remaps while the loop is active and the cursor is strictly inside
    /// `(start_sample, end_sample)`; otherwise `position` is returned as is,
    /// so an unlooped intro before the window can still be seeked freely.
    pub fn remap_position(&self, cursor: i64, position: i64) -> i64 {
        if !self.is_active() || cursor <= self.start_sample || cursor >= self.end_sample {
            return position;
        }

        if self.contains(position) {
            return position;
        }

        // Offsets are below the span, so they fit back into the window
        let length = i128::from(self.length());
        if position >= self.end_sample {
            let offset = (i128::from(position) - i128::from(self.end_sample)).rem_euclid(length);
            self.start_sample + offset as i64
        } else {
            let offset = (i128::from(self.start_sample) - i128::from(position)).rem_euclid(length);
            self.end_sample - offset as i64
        }
    }

    /// Decide whether a block of `num_samples` read from `cursor` crosses the
    /// loop end.
    ///
    /// A cursor sitting exactly on `end_sample` wraps with an empty head. A
    /// cursor past `end_sample` plays through.
    pub fn plan_block(&self, cursor: i64, num_samples: usize) -> BlockPlan {
        if !self.is_active() || cursor > self.end_sample {
            return BlockPlan::Direct;
        }

        let num_samples = i64::try_from(num_samples).unwrap_or(i64::MAX);
        if cursor.saturating_add(num_samples) <= self.end_sample {
            return BlockPlan::Direct;
        }

        // cursor <= end and cursor + num_samples > end, so 0 <= head < num_samples
        usize::try_from(i128::from(self.end_sample) - i128::from(cursor))
            .map_or(BlockPlan::Direct, |head| BlockPlan::Wrap { head })
    }
}
