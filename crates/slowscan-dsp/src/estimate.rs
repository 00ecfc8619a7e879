//! Peak-frequency and band-power estimation over a transformed moment.
//!
//! Both estimators read the bins left by the last
//! [`SpectralEngine::transform`] call; windowing and transforming is the
//! engine's job.
//!
//! # Sub-bin refinement
//!
//! The coarse peak is the strongest bin in the search range. Its true position
//! is refined with Gaussian (log-parabolic) interpolation across the peak and
//! its two neighbours:
//!
//! ```text
//! offset = ln(P[k+1] / P[k-1]) / (2 * ln(P[k]^2 / (P[k+1] * P[k-1])))
//! ```
//!
//! which is exact when the main lobe is Gaussian. The formula is undefined for
//! zero powers or a vanishing denominator (flat spectrum), and extrapolates
//! past the neighbours when the coarse peak sits on a range edge next to a
//! stronger out-of-range bin; those cases fall back to the bin centre.

use crate::spectrum::SpectralEngine;
use crate::{Error, Result};

/// Inclusive frequency range in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    /// Lower edge in Hz.
    pub low_hz: f64,
    /// Upper edge in Hz.
    pub high_hz: f64,
}

impl FrequencyBand {
    /// Creates a band from its edges.
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    /// Band width in Hz.
    pub fn width(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

impl From<(f64, f64)> for FrequencyBand {
    fn from((low_hz, high_hz): (f64, f64)) -> Self {
        Self::new(low_hz, high_hz)
    }
}

/// Result of a peak search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEstimate {
    /// Refined peak frequency in Hz.
    pub frequency_hz: f64,
    /// Coarse peak bin.
    pub bin: usize,
    /// Sub-bin offset applied, or `None` if interpolation was degenerate.
    pub offset: Option<f64>,
    /// Power of the coarse peak bin.
    pub power: f64,
}

impl PeakEstimate {
    /// Whether Gaussian interpolation refined the estimate.
    pub fn is_interpolated(&self) -> bool {
        self.offset.is_some()
    }
}

/// Gaussian sub-bin offset of a peak from its neighbours' powers.
///
/// Returns `None` when any power is non-positive or non-finite, when the
/// centre is weaker than a neighbour (the true peak lies outside the three
/// bins), or when the denominator vanishes; the caller then uses the bin
/// centre.
pub fn gaussian_offset(prev: f64, peak: f64, next: f64) -> Option<f64> {
    let usable = |p: f64| p > 0.0 && p.is_finite();
    if !(usable(prev) && usable(peak) && usable(next)) {
        return None;
    }
    if prev > peak || next > peak {
        return None;
    }

    let (ln_prev, ln_peak, ln_next) = (prev.ln(), peak.ln(), next.ln());
    let numerator = ln_next - ln_prev;
    let denominator = 2.0 * (2.0 * ln_peak - ln_next - ln_prev);
    if denominator == 0.0 {
        return None;
    }

    let offset = numerator / denominator;
    offset.is_finite().then_some(offset)
}

/// Finds the strongest bin in `[bin_of(min_hz), bin_of(max_hz))` and refines it.
///
/// Ties keep the lowest bin.
pub fn find_peak(spectrum: &SpectralEngine, min_hz: f64, max_hz: f64) -> Result<PeakEstimate> {
    let lo = spectrum.bin_of(min_hz);
    let hi = spectrum.bin_of(max_hz);

    if lo < 1 {
        return Err(Error::invalid_band(min_hz, max_hz, "lower edge must be above the first bin"));
    }
    if hi + 1 >= spectrum.num_bins() as isize {
        return Err(Error::invalid_band(min_hz, max_hz, "upper edge must be below Nyquist"));
    }
    if lo >= hi {
        return Err(Error::invalid_band(min_hz, max_hz, "band is empty"));
    }

    let (lo, hi) = (lo as usize, hi as usize);
    let mut peak = lo;
    let mut peak_power = spectrum.power(lo);
    for bin in lo + 1..hi {
        let p = spectrum.power(bin);
        if p > peak_power {
            peak = bin;
            peak_power = p;
        }
    }

    let offset = gaussian_offset(
        spectrum.power(peak - 1),
        peak_power,
        spectrum.power(peak + 1),
    );
    if offset.is_none() {
        tracing::trace!(bin = peak, "degenerate interpolation, using bin centre");
    }

    Ok(PeakEstimate {
        frequency_hz: spectrum.freq_of(peak as f64 + offset.unwrap_or(0.0)),
        bin: peak,
        offset,
        power: peak_power,
    })
}

/// Average power per Hz over each band's inclusive bin range.
///
/// Returns one value per band, in input order:
/// `sum(P[bin_of(low) ..= bin_of(high)]) / (bin_width * bin_count)`.
pub fn band_power_density(spectrum: &SpectralEngine, bands: &[FrequencyBand]) -> Result<Vec<f64>> {
    let bin_width = spectrum.bin_width();
    let last_bin = spectrum.num_bins() as isize - 1;

    bands
        .iter()
        .map(|band| {
            let lo = spectrum.bin_of(band.low_hz);
            let hi = spectrum.bin_of(band.high_hz);
            if band.low_hz < 0.0 || lo < 0 {
                return Err(Error::invalid_band(band.low_hz, band.high_hz, "negative frequency"));
            }
            if hi > last_bin {
                return Err(Error::invalid_band(band.low_hz, band.high_hz, "above Nyquist"));
            }
            if lo > hi {
                return Err(Error::invalid_band(band.low_hz, band.high_hz, "band is empty"));
            }

            let (lo, hi) = (lo as usize, hi as usize);
            let total: f64 = (lo..=hi).map(|bin| spectrum.power(bin)).sum();
            let nbins = (hi - lo + 1) as f64;
            Ok(total / (bin_width * nbins))
        })
        .collect()
}
