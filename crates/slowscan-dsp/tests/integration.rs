//! Integration tests for slowscan-dsp.
//!
//! Tests drive the public engine API end to end with synthetic signals of known
//! frequency content: steady tones, frequency steps, and white noise.

use std::f64::consts::PI;

use slowscan_dsp::{
    DspEngine, EngineConfig, EngineWorker, FrequencyBand, MOMENT_LEN, MemorySource, SessionState,
    SpectralEngine, WindowType,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RATE: u32 = 44100;

/// Sine at `freq_hz` for `secs` seconds, amplitude 0.5.
fn sine(freq_hz: f64, secs: f64) -> Vec<f64> {
    let n = (f64::from(RATE) * secs) as usize;
    (0..n)
        .map(|i| 0.5 * (2.0 * PI * freq_hz * i as f64 / f64::from(RATE)).sin())
        .collect()
}

/// Xorshift white noise in [-amplitude, amplitude].
fn noise(secs: f64, amplitude: f64) -> Vec<f64> {
    let n = (f64::from(RATE) * secs) as usize;
    let mut state = 0x1234_5678u32;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            amplitude * f64::from(state as i32) / f64::from(i32::MAX)
        })
        .collect()
}

fn engine_with(samples: &[f64]) -> DspEngine {
    let mut engine = DspEngine::new(EngineConfig::default()).unwrap();
    engine.attach(MemorySource::from_f64(samples, RATE)).unwrap();
    engine
}

// ===========================================================================
// 1. Tone tracking
// ===========================================================================

#[test]
fn steady_tone_tracked_with_default_window() {
    let mut engine = engine_with(&sine(1900.0, 5.0));
    let bin_width = engine.bin_width();
    let mut estimates = 0;

    while engine.is_listening() {
        let hz = engine
            .peak_frequency(1500.0, 2300.0, WindowType::default())
            .unwrap();
        assert!(
            (hz - 1900.0).abs() < bin_width,
            "estimate {hz} Hz at {:.3} s",
            engine.elapsed()
        );
        estimates += 1;
        engine.advance_ms(100.0);
    }

    assert_eq!(engine.state(), SessionState::Exhausted);
    assert!(estimates >= 48, "only {estimates} estimates");
    assert!(engine.elapsed() < 5.0);
    assert!(engine.elapsed() > 5.0 - 2.0 * MOMENT_LEN as f64 / f64::from(RATE));
}

#[test]
fn sync_tone_tracked_with_long_window() {
    let mut engine = engine_with(&sine(1200.0, 5.0));
    let bin_width = engine.bin_width();

    while engine.is_listening() {
        let hz = engine
            .peak_frequency(1000.0, 1400.0, WindowType::Hann511)
            .unwrap();
        assert!((hz - 1200.0).abs() < bin_width, "estimate {hz} Hz");
        engine.advance_ms(10.0);
    }

    assert!(!engine.is_listening());
}

#[test]
fn every_window_resolves_video_tone() {
    let mut engine = engine_with(&sine(1900.0, 1.0));
    let bin_width = engine.bin_width();

    for window in WindowType::ALL {
        let hz = engine.peak_frequency(1500.0, 2300.0, window).unwrap();
        assert!(
            (hz - 1900.0).abs() < bin_width,
            "{window}: estimate {hz} Hz"
        );
    }
}

#[test]
fn estimate_follows_frequency_step() {
    let mut signal = sine(1900.0, 0.5);
    let switch = signal.len();
    signal.extend(sine(1200.0, 0.5));

    let mut engine = engine_with(&signal);
    let half = MOMENT_LEN / 2;
    let margin = 200;
    let (mut before, mut after) = (0, 0);

    while engine.is_listening() {
        let hz = engine
            .peak_frequency(1000.0, 2300.0, WindowType::Hann255)
            .unwrap();
        let centre = engine.consumed_samples() as usize + half;
        if centre + margin < switch {
            assert!((hz - 1900.0).abs() < 5.0, "before step: {hz} Hz");
            before += 1;
        } else if centre > switch + margin {
            assert!((hz - 1200.0).abs() < 5.0, "after step: {hz} Hz");
            after += 1;
        }
        engine.advance_ms(5.0);
    }

    assert!(before > 0 && after > 0);
}

#[test]
fn default_window_is_sharpest() {
    assert_eq!(WindowType::default(), WindowType::Cheb47);
    assert_eq!(WindowType::for_snr(slowscan_dsp::DEFAULT_SNR_DB), WindowType::Cheb47);
}

// ===========================================================================
// 2. Band power
// ===========================================================================

#[test]
fn tone_band_dominates_other_band() {
    let mut engine = engine_with(&sine(1200.0, 1.0));
    let bands = [
        FrequencyBand::new(1100.0, 1300.0),
        FrequencyBand::new(1500.0, 2300.0),
    ];

    while engine.is_listening() {
        let density = engine.band_power_density(&bands).unwrap();
        assert!(
            density[0] >= density[1] * 10.0,
            "sync band {} vs video band {}",
            density[0],
            density[1]
        );
        engine.advance_ms(50.0);
    }
}

#[test]
fn white_noise_has_flat_density() {
    let mut engine = engine_with(&noise(2.0, 0.5));
    let bands = [
        FrequencyBand::new(1000.0, 2000.0),
        FrequencyBand::new(3000.0, 4000.0),
    ];

    let mut totals = [0.0; 2];
    let mut moments = 0;
    while engine.is_listening() {
        let density = engine.band_power_density(&bands).unwrap();
        totals[0] += density[0];
        totals[1] += density[1];
        moments += 1;
        engine.advance_ms(50.0);
    }

    assert!(moments >= 20);
    let ratio = totals[0] / totals[1];
    assert!((0.8..1.25).contains(&ratio), "band ratio {ratio}");
}

#[test]
fn invalid_band_is_rejected_without_ending_session() {
    let mut engine = engine_with(&sine(1200.0, 1.0));
    assert!(
        engine
            .band_power_density(&[FrequencyBand::new(1000.0, 30000.0)])
            .is_err()
    );
    assert!(engine.is_listening());
    assert!(
        engine
            .band_power_density(&[FrequencyBand::new(1100.0, 1300.0)])
            .is_ok()
    );
}

// ===========================================================================
// 3. Transform verification
// ===========================================================================

#[test]
fn real_transform_matches_complex_fft() {
    use rustfft::FftPlanner;
    use rustfft::num_complex::Complex;

    let n = 2048;
    let moment: Vec<f64> = noise(0.05, 1.0).into_iter().take(1023).collect();

    let mut spectral = SpectralEngine::new(n, f64::from(RATE));
    let bins = spectral.transform(&moment).unwrap().to_vec();

    let mut buf: Vec<Complex<f64>> = (0..n)
        .map(|i| Complex::new(moment.get(i).copied().unwrap_or(0.0), 0.0))
        .collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buf);

    assert_eq!(bins.len(), n / 2 + 1);
    for (k, (ours, reference)) in bins.iter().zip(&buf).enumerate() {
        assert!(
            (ours - reference).norm() < 1e-9 * (1.0 + reference.norm()),
            "bin {k}: {ours} vs {reference}"
        );
    }
}

// ===========================================================================
// 4. Background worker
// ===========================================================================

#[test]
fn worker_collects_estimates_and_can_be_stopped() {
    let engine = engine_with(&sine(1900.0, 3.0));

    let worker = EngineWorker::spawn(engine, |engine| {
        let mut count = 0usize;
        loop {
            let mut engine = engine.lock();
            if !engine.is_listening() {
                break;
            }
            if engine
                .peak_frequency(1500.0, 2300.0, WindowType::Hann127)
                .is_ok()
            {
                count += 1;
            }
            engine.advance(1);
        }
        count
    })
    .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    worker.request_stop();
    let shared = std::sync::Arc::clone(worker.engine());
    let count = worker.join().unwrap();

    let state = shared.lock().state();
    // Per-sample stepping through 3 s cannot finish in 20 ms
    assert_eq!(state, SessionState::Aborted);
    assert!(count > 0);
}
