//! Test helpers shared by the seamloop-player integration tests
//!
//! - RecordingSource: ramp source that records every read and seek
//! - audio_generator: deterministic WAV fixtures written with hound

#![allow(dead_code)]

pub mod audio_generator;
pub mod recording_source;

pub use audio_generator::{decoded_value, write_ramp_wav, WavFixture};
pub use recording_source::{RecordingSource, SourceCall};
