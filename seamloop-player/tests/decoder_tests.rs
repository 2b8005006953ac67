//! Decoder integration tests using generated WAV fixtures

mod helpers;

use helpers::{decoded_value, write_ramp_wav};
use seamloop_player::audio::{
    decode_file, AudioBlock, AudioBuffer, LoopingSource, PositionableSource,
};
use seamloop_player::Error;

const TOLERANCE: f32 = 1e-4;

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < TOLERANCE,
            "sample {}: got {}, expected {}",
            index,
            a,
            e
        );
    }
}

#[test]
fn test_decode_stereo_wav() {
    let fixture = write_ramp_wav(2, 44_100, 441, 50).unwrap();

    let decoded = decode_file(fixture.path()).unwrap();

    assert_eq!(decoded.sample_rate, 44_100);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.num_frames(), 441);
    assert!((decoded.duration_seconds() - 0.01).abs() < 1e-9);

    let left: Vec<f32> = (0..441).map(|i| decoded_value(i as i16 * 50)).collect();
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    assert_close(decoded.samples.channel(0), &left);
    assert_close(decoded.samples.channel(1), &right);
}

#[test]
fn test_decode_mono_wav_plays_on_both_channels() {
    let fixture = write_ramp_wav(1, 8_000, 80, 100).unwrap();

    let decoded = decode_file(fixture.path()).unwrap();
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.samples.num_channels(), 1);

    let mut source = decoded.into_source();
    let mut buffer = AudioBuffer::new(2, 80);
    source
        .get_next_audio_block(&mut AudioBlock::whole(&mut buffer))
        .unwrap();

    assert_eq!(buffer.channel(0), buffer.channel(1));
    assert_close(&buffer.channel(0)[..3], &[0.0, decoded_value(100), decoded_value(200)]);
}

#[test]
fn test_decoded_file_loops_between_times() {
    // 1 kHz so that 20 ms is exactly 20 frames
    let fixture = write_ramp_wav(2, 1_000, 100, 10).unwrap();
    let decoded = decode_file(fixture.path()).unwrap();
    let sample_rate = f64::from(decoded.sample_rate);

    let mut looping = LoopingSource::owning(Box::new(decoded.into_source()));
    looping.prepare_to_play(64, sample_rate);
    looping.set_loop_times(0.020, 0.050);
    looping.set_loop_between_times(true);
    looping.set_next_read_position(40);

    let mut buffer = AudioBuffer::new(2, 20);
    looping
        .get_next_audio_block(&mut AudioBlock::whole(&mut buffer))
        .unwrap();

    let expected: Vec<f32> = (40..50)
        .chain(20..30)
        .map(|frame| decoded_value(frame as i16 * 10))
        .collect();
    assert_close(buffer.channel(0), &expected);
    assert_eq!(looping.next_read_position(), 30);
}

#[test]
fn test_missing_file_fails() {
    let result = decode_file(std::path::Path::new("/nonexistent/missing.flac"));
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[test]
fn test_garbage_file_fails_to_probe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.wav");
    std::fs::write(&path, b"definitely not a RIFF header").unwrap();

    let result = decode_file(&path);
    assert!(matches!(result, Err(Error::Decode(_))));
}
