//! Reusable real-to-complex transform state.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::{Error, Result};

/// Forward FFT over a fixed length with owned input, output and scratch buffers.
///
/// The plan and buffers are created once and reused for every analysis. The
/// engine is `&mut self` throughout, so two analyses can never share the
/// buffers at the same time; concurrent analyses each need their own instance.
pub struct SpectralEngine {
    len: usize,
    sample_rate: f64,
    plan: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralEngine {
    /// Plans a forward transform of `len` points for audio at `sample_rate` Hz.
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0.
    pub fn new(len: usize, sample_rate: f64) -> Self {
        assert!(len > 0, "Transform length must be > 0");

        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(len);
        let input = plan.make_input_vec();
        let output = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Self {
            len,
            sample_rate,
            plan,
            input,
            output,
            scratch,
        }
    }

    /// Transform length `N`.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a transform has at least one point.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of complex bins produced, `N/2 + 1`.
    pub fn num_bins(&self) -> usize {
        self.output.len()
    }

    /// Sample rate used for Hz/bin conversion.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Changes the sample rate used for Hz/bin conversion.
    ///
    /// The plan depends only on the length, so nothing is re-planned.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Width of one bin in Hz.
    pub fn bin_width(&self) -> f64 {
        self.sample_rate / self.len as f64
    }

    /// Bin index of a frequency, `freq / sample_rate * N` truncated toward zero.
    ///
    /// The result is not clamped; negative or out-of-range values are the
    /// caller's to reject.
    pub fn bin_of(&self, freq_hz: f64) -> isize {
        (freq_hz / self.sample_rate * self.len as f64) as isize
    }

    /// Frequency in Hz of a (possibly fractional) bin index.
    pub fn freq_of(&self, bin: f64) -> f64 {
        bin / self.len as f64 * self.sample_rate
    }

    /// Runs the forward transform on a windowed moment.
    ///
    /// The input buffer is zeroed, `moment` is copied into its start (at most
    /// `N` values), and the plan executes. Results stay available through
    /// [`bins`](Self::bins) and [`power`](Self::power) until the next call.
    pub fn transform(&mut self, moment: &[f64]) -> Result<&[Complex<f64>]> {
        self.input.fill(0.0);
        let n = moment.len().min(self.len);
        self.input[..n].copy_from_slice(&moment[..n]);

        self.plan
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| Error::Transform(e.to_string()))?;

        Ok(&self.output)
    }

    /// Complex bins from the most recent transform.
    pub fn bins(&self) -> &[Complex<f64>] {
        &self.output
    }

    /// Unnormalised power of a bin: `re^2 + im^2`.
    ///
    /// # Panics
    ///
    /// Panics if `bin >= N/2 + 1`.
    #[inline]
    pub fn power(&self, bin: usize) -> f64 {
        self.output[bin].norm_sqr()
    }
}

impl std::fmt::Debug for SpectralEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralEngine")
            .field("len", &self.len)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}
