//! Integration tests for slowscan-io.
//!
//! WAV files are written to temporary paths and streamed through the engine,
//! exercising the file-backed source the same way the CLI does.

use std::f64::consts::PI;

use slowscan_dsp::{
    AudioSource, DspEngine, EngineConfig, FrequencyBand, RateStatus, SessionState, StatusEvent,
    WindowType,
};
use slowscan_io::{WavSource, read_wav_info, write_wav_i16};
use tempfile::TempDir;

fn tone_i16(freq: f64, rate: u32, secs: f64) -> Vec<i16> {
    let n = (f64::from(rate) * secs) as usize;
    (0..n)
        .map(|i| (12000.0 * (2.0 * PI * freq * i as f64 / f64::from(rate)).sin()) as i16)
        .collect()
}

#[test]
fn wav_tone_tracked_until_end_of_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav_i16(&path, &tone_i16(1900.0, 44100, 3.0), 44100).unwrap();

    let mut engine = DspEngine::new(EngineConfig::default()).unwrap();
    engine.attach(WavSource::open(&path).unwrap()).unwrap();
    assert_eq!(engine.rate_status(), RateStatus::Matched);

    let mut estimates = 0;
    while engine.is_listening() {
        let hz = engine
            .peak_frequency(1500.0, 2300.0, WindowType::default())
            .unwrap();
        assert!((hz - 1900.0).abs() < engine.bin_width(), "estimate {hz}");
        estimates += 1;
        engine.advance_ms(50.0);
    }

    assert_eq!(engine.state(), SessionState::Exhausted);
    assert!(estimates > 50);
    assert_eq!(engine.received_samples(), 3 * 44100);
}

#[test]
fn wav_at_other_rate_is_flagged_and_converted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone48k.wav");
    write_wav_i16(&path, &tone_i16(1200.0, 48000, 1.0), 48000).unwrap();

    let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&events);

    let mut engine = DspEngine::new(EngineConfig::default()).unwrap();
    engine.set_status_callback(Box::new(move |e| sink.lock().unwrap().push(e.clone())));
    engine.attach(WavSource::open(&path).unwrap()).unwrap();

    assert_eq!(
        engine.rate_status(),
        RateStatus::Mismatch {
            expected: 44100,
            actual: 48000
        }
    );
    let hz = engine
        .peak_frequency(1000.0, 1400.0, WindowType::Hann511)
        .unwrap();
    assert!((hz - 1200.0).abs() < engine.bin_width(), "estimate {hz}");

    while engine.is_listening() {
        engine.advance_ms(100.0);
    }
    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(StatusEvent::RateMismatch { .. })));
    assert_eq!(events.last(), Some(&StatusEvent::Exhausted));
}

#[test]
fn stereo_wav_band_power() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");

    // Left carries the tone, right is silent; the average keeps the tone
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for s in tone_i16(1200.0, 44100, 1.0) {
        writer.write_sample(s).unwrap();
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let info = read_wav_info(&path).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.num_frames, 44100);

    let mut engine = DspEngine::new(EngineConfig::default()).unwrap();
    engine.attach(WavSource::open(&path).unwrap()).unwrap();
    let density = engine
        .band_power_density(&[
            FrequencyBand::new(1100.0, 1300.0),
            FrequencyBand::new(1500.0, 2300.0),
        ])
        .unwrap();
    assert!(density[0] > density[1] * 10.0);
}

#[test]
fn wav_source_describes_its_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("named.wav");
    write_wav_i16(&path, &[0; 16], 8000).unwrap();

    let source = WavSource::open(&path).unwrap();
    assert_eq!(source.sample_rate(), 8000);
    assert!(source.describe().contains("named.wav"));
}
