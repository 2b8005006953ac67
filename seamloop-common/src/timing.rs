//! Time/sample conversion for loop bounds and position reporting
//!
//! Seamloop uses two time representations:
//!
//! 1. **Seconds (Configuration)**: f64 values from the CLI, TOML config and
//!    loop handles
//! 2. **Samples (Playback)**: i64 sample offsets at the active sample rate
//!
//! Seconds are converted to samples by truncating `seconds × sample_rate`
//! toward zero, so a bound never lands past the sample that contains it.
//!
//! # Examples
//!
//! ```rust
//! use seamloop_common::timing::*;
//!
//! assert_eq!(seconds_to_samples(1.0, 44_100.0), 44_100);
//! assert_eq!(seconds_to_samples(0.5, 48_000.0), 24_000);
//! assert_eq!(samples_to_seconds(88_200, 44_100.0), 2.0);
//! ```

/// Sample rate assumed before a device has reported one
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Convert a time in seconds to a sample offset
///
/// Uses truncating conversion: `samples = trunc(seconds × sample_rate)`.
/// Out-of-range products saturate at `i64::MIN`/`i64::MAX`; NaN maps to 0.
///
/// ```rust
/// use seamloop_common::timing::seconds_to_samples;
///
/// assert_eq!(seconds_to_samples(0.0, 44_100.0), 0);
/// assert_eq!(seconds_to_samples(1.999_99, 1_000.0), 1_999);
/// assert_eq!(seconds_to_samples(-0.5, 1_000.0), -500);
/// ```
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> i64 {
    (seconds * sample_rate) as i64
}

/// Convert a sample offset to a time in seconds
///
/// Returns 0.0 for a non-positive sample rate.
pub fn samples_to_seconds(samples: i64, sample_rate: f64) -> f64 {
    if sample_rate <= 0.0 {
        return 0.0;
    }
    samples as f64 / sample_rate
}

/// Format a sample offset as `M:SS.mmm` for log output
///
/// ```rust
/// use seamloop_common::timing::format_position;
///
/// assert_eq!(format_position(0, 44_100.0), "0:00.000");
/// assert_eq!(format_position(2_888_550, 44_100.0), "1:05.500");
/// assert_eq!(format_position(-22_050, 44_100.0), "-0:00.500");
/// ```
pub fn format_position(samples: i64, sample_rate: f64) -> String {
    let total_ms = (samples_to_seconds(samples, sample_rate) * 1000.0).round() as i64;
    let sign = if total_ms < 0 { "-" } else { "" };
    let total_ms = total_ms.abs();

    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{}{}:{:02}.{:03}", sign, minutes, seconds, millis)
}
