//! Deterministic WAV fixtures for decoder tests

use std::path::{Path, PathBuf};

use hound::{WavSpec, WavWriter};
use tempfile::TempDir;

/// A WAV file in a temporary directory, removed on drop
pub struct WavFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl WavFixture {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write a 16-bit WAV where frame `i` of channel `c` holds
/// `(i * step) * (1 - 2c)`, i.e. the left channel ramps up and the right
/// channel ramps down.
pub fn write_ramp_wav(
    channels: u16,
    sample_rate: u32,
    frames: usize,
    step: i16,
) -> Result<WavFixture, hound::Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ramp.wav");

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(&path, spec)?;
    for frame in 0..frames {
        let value = frame as i16 * step;
        for channel in 0..channels {
            writer.write_sample(if channel % 2 == 0 { value } else { -value })?;
        }
    }
    writer.finalize()?;

    Ok(WavFixture { _dir: dir, path })
}

/// Value of the 16-bit sample `raw` after decoding to f32
pub fn decoded_value(raw: i16) -> f32 {
    f32::from(raw) / 32768.0
}
