//! Core audio data types
//!
//! Defines the planar sample buffer that sources render into, the region view
//! used for block delivery, and the stereo frame handed to the output device.

/// AudioBuffer holds planar (one `Vec` per channel) f32 samples.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Planar: `channels[c][i]` is sample `i` of channel `c`
/// - Every channel has the same length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Create a silent buffer with the given shape
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            num_samples,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// # Panics
    /// Panics if the channels differ in length
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        let num_samples = channels.first().map_or(0, Vec::len);
        assert!(
            channels.iter().all(|c| c.len() == num_samples),
            "All channels must have the same length"
        );
        Self {
            channels,
            num_samples,
        }
    }

    /// De-interleave `[c0, c1, .., c0, c1, ..]` samples into a planar buffer.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], num_channels: usize) -> Self {
        if num_channels == 0 {
            return Self::default();
        }

        let num_samples = samples.len() / num_channels;
        let mut buffer = Self::new(num_channels, num_samples);
        for (index, frame) in samples.chunks_exact(num_channels).enumerate() {
            for (channel, &sample) in frame.iter().enumerate() {
                buffer.channels[channel][index] = sample;
            }
        }
        buffer
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    /// Grow the buffer to at least `num_channels` × `num_samples`.
    ///
    /// Never shrinks. Existing samples are kept, new space is silent.
    pub fn ensure_size(&mut self, num_channels: usize, num_samples: usize) {
        if num_samples > self.num_samples {
            for channel in &mut self.channels {
                channel.resize(num_samples, 0.0);
            }
            self.num_samples = num_samples;
        }
        while self.channels.len() < num_channels {
            self.channels.push(vec![0.0; self.num_samples]);
        }
    }

    /// Zero `num_samples` samples of every channel starting at `start`
    pub fn clear_region(&mut self, start: usize, num_samples: usize) {
        for channel in &mut self.channels {
            channel[start..start + num_samples].fill(0.0);
        }
    }

    /// Copy a run of samples from one channel of `source` into this buffer.
    pub fn copy_from(
        &mut self,
        dest_channel: usize,
        dest_start: usize,
        source: &AudioBuffer,
        source_channel: usize,
        source_start: usize,
        num_samples: usize,
    ) {
        self.channels[dest_channel][dest_start..dest_start + num_samples]
            .copy_from_slice(&source.channels[source_channel][source_start..source_start + num_samples]);
    }

    /// Stereo frame at `index`. Mono buffers are duplicated to both sides.
    pub fn frame(&self, index: usize) -> AudioFrame {
        match self.channels.len() {
            0 => AudioFrame::zero(),
            1 => AudioFrame::from_mono(self.channels[0][index]),
            _ => AudioFrame::from_stereo(self.channels[0][index], self.channels[1][index]),
        }
    }
}

/// A region of an [`AudioBuffer`] that a source is asked to fill.
///
/// Covers `num_samples` samples starting at `start_sample`, across every
/// channel of the buffer.
#[derive(Debug)]
pub struct AudioBlock<'a> {
    pub buffer: &'a mut AudioBuffer,
    pub start_sample: usize,
    pub num_samples: usize,
}

impl<'a> AudioBlock<'a> {
    pub fn new(buffer: &'a mut AudioBuffer, start_sample: usize, num_samples: usize) -> Self {
        debug_assert!(start_sample + num_samples <= buffer.num_samples());
        Self {
            buffer,
            start_sample,
            num_samples,
        }
    }

    /// A block covering the whole buffer
    pub fn whole(buffer: &'a mut AudioBuffer) -> Self {
        let num_samples = buffer.num_samples();
        Self::new(buffer, 0, num_samples)
    }

    /// Reborrow part of this block, `offset` samples into it
    pub fn sub_block(&mut self, offset: usize, num_samples: usize) -> AudioBlock<'_> {
        debug_assert!(offset + num_samples <= self.num_samples);
        AudioBlock {
            buffer: &mut *self.buffer,
            start_sample: self.start_sample + offset,
            num_samples,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.buffer.num_channels()
    }

    /// The samples of one channel covered by this block
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.buffer.channel(channel)[self.start_sample..self.start_sample + self.num_samples]
    }

    /// The samples of one channel covered by this block
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let range = self.start_sample..self.start_sample + self.num_samples;
        &mut self.buffer.channel_mut(channel)[range]
    }

    /// Silence the block
    pub fn clear(&mut self) {
        self.buffer.clear_region(self.start_sample, self.num_samples);
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between the renderer and output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from mono sample (duplicate to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame { left: sample, right: sample }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}
