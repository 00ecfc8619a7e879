//! Property-based tests for slowscan-dsp.
//!
//! Covers the lapped buffer's mirror contract, window selection totality,
//! interpolation bounds and cursor accounting using proptest.

use proptest::prelude::*;
use slowscan_dsp::{
    DspEngine, EngineConfig, LappedBuffer, MOMENT_LEN, MemorySource, WindowBank, WindowType,
    gaussian_offset,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After any sequence of writes, the most recent `min(total, C)` samples
    /// read back as one contiguous slice ending at `head`, wherever it wrapped.
    #[test]
    fn ring_keeps_latest_samples_contiguous(
        capacity in 1usize..64,
        chunks in prop::collection::vec(prop::collection::vec(any::<i16>(), 0..80), 1..12),
    ) {
        let mut ring = LappedBuffer::new(capacity);
        let mut written = Vec::new();
        for chunk in &chunks {
            ring.write(chunk);
            written.extend_from_slice(chunk);
        }

        let k = written.len().min(capacity);
        let start = (ring.head() + capacity - k) % capacity;
        prop_assert_eq!(ring.slice(start, k), &written[written.len() - k..]);
        prop_assert_eq!(ring.fill_count(), k);
    }

    /// Consumption moves the tail modulo the capacity and saturates the fill.
    #[test]
    fn ring_consume_accounting(
        capacity in 1usize..64,
        fill in 0usize..64,
        n in 0usize..200,
    ) {
        let mut ring = LappedBuffer::new(capacity);
        ring.write(&vec![7; fill.min(capacity)]);
        let before = ring.fill_count();
        ring.consume(n);
        prop_assert_eq!(ring.fill_count(), before.saturating_sub(n));
        prop_assert_eq!(ring.tail(), n % capacity);
    }

    /// Every SNR value, including non-finite ones, selects some window, and a
    /// better SNR never selects a longer one.
    #[test]
    fn window_choice_is_total_and_monotone(a in any::<f64>(), b in any::<f64>()) {
        let wa = WindowType::for_snr(a);
        let wb = WindowType::for_snr(b);
        prop_assert!(wa.len() <= WindowType::MAX_LEN);
        if a <= b {
            prop_assert!(wb.len() <= wa.len());
        }
    }

    /// Windowing writes exactly the window's support and zeroes the rest.
    #[test]
    fn windowing_writes_only_support(
        index in 0usize..7,
        span in prop::collection::vec(any::<i16>(), MOMENT_LEN),
    ) {
        let bank = WindowBank::new();
        let window = WindowType::ALL[index];
        let mut moment = vec![1.0; MOMENT_LEN];
        let written = bank.apply(window, &span, &mut moment);

        prop_assert_eq!(written, window.len());
        prop_assert!(moment[written..].iter().all(|&v| v == 0.0));
        prop_assert!(moment[..written].iter().all(|v| v.is_finite()));
    }

    /// With the peak at least as strong as both neighbours, the refinement
    /// stays within half a bin.
    #[test]
    fn gaussian_offset_within_half_bin(
        prev in 1e-6f64..=1.0,
        next in 1e-6f64..=1.0,
        scale in 1e-3f64..1e6,
    ) {
        if let Some(offset) = gaussian_offset(prev * scale, scale, next * scale) {
            prop_assert!(offset.abs() <= 0.5 + 1e-6, "offset {}", offset);
        }
    }

    /// For any three powers, a refinement that is applied never leaves the
    /// half-bin around the centre.
    #[test]
    fn gaussian_offset_bounded_for_any_powers(
        prev in 1e-9f64..1e6,
        peak in 1e-9f64..1e6,
        next in 1e-9f64..1e6,
    ) {
        if let Some(offset) = gaussian_offset(prev, peak, next) {
            prop_assert!(peak >= prev && peak >= next);
            prop_assert!(offset.abs() <= 0.5 + 1e-6, "offset {}", offset);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// While listening, `advance(n)` lowers the fill by `n` plus whatever the
    /// refills added, and never leaves less than the lookback margin.
    #[test]
    fn advance_preserves_lookback_margin(steps in prop::collection::vec(1usize..5000, 1..8)) {
        let samples: Vec<i16> = (0..200_000).map(|i| (i % 200) as i16).collect();
        let mut engine = DspEngine::new(EngineConfig::default()).unwrap();
        engine.attach(MemorySource::new(samples, 44100)).unwrap();

        for n in steps {
            let fill_before = engine.fill_count() as u64;
            let received_before = engine.received_samples();
            let consumed_before = engine.consumed_samples();

            let elapsed = engine.advance(n);

            let refilled = engine.received_samples() - received_before;
            prop_assert_eq!(engine.consumed_samples() - consumed_before, n as u64);
            prop_assert_eq!(engine.fill_count() as u64, fill_before + refilled - n as u64);
            prop_assert!(engine.fill_count() >= MOMENT_LEN);
            prop_assert!(engine.fill_count() <= engine.buffer().capacity());
            prop_assert!((elapsed - n as f64 / 44100.0).abs() < 1e-12);
        }
    }
}
