//! # Seamloop Player Library (seamloop-player)
//!
//! Plays a position-seekable audio source while restricting playback to a
//! configurable time window, looping at the window boundary with
//! sample-accurate, contiguous output blocks.
//!
//! **Architecture:** symphonia decode → in-memory source → looping source →
//! block renderer → cpal output
//!
//! The loop window can be reconfigured from any thread through a
//! [`LoopHandle`](audio::LoopHandle) while the audio callback is reading.

pub mod audio;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
