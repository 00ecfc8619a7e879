//! Analysis window bank and SNR-driven window selection.
//!
//! Six raised-cosine (Hann) windows of increasing length plus one fixed
//! 47-tap Chebyshev window. Short windows resolve fast frequency changes but
//! smear under noise; long windows average noise away at the cost of time
//! resolution. [`WindowType::for_snr`] picks the trade-off from an SNR estimate.
//!
//! | SNR (dB, lower bound) | Window |
//! |-----------------------|--------|
//! | 20                    | Cheb47 |
//! | 10                    | Hann63 |
//! | 9                     | Hann95 |
//! | 3                     | Hann127 |
//! | -5                    | Hann255 |
//! | -10                   | Hann511 |
//! | below                 | Hann1023 |

use std::f64::consts::PI;

/// SNR assumed when no estimate is available yet; selects the sharpest window.
pub const DEFAULT_SNR_DB: f64 = 99.0;

/// 47-tap Chebyshev window, stored verbatim rather than recomputed.
pub const CHEBYSHEV_47: [f64; 47] = [
    0.0004272315, 0.0013212953, 0.0032312239, 0.0067664313, 0.0127521667, 0.0222058684,
    0.0363037629, 0.0563165400, 0.0835138389, 0.1190416120, 0.1637810511, 0.2182020094,
    0.2822270091, 0.3551233730, 0.4354402894, 0.5210045495, 0.6089834347, 0.6960162864,
    0.7784084484, 0.8523735326, 0.9143033652, 0.9610404797, 0.9901263448, 1.0000000000,
    0.9901263448, 0.9610404797, 0.9143033652, 0.8523735326, 0.7784084484, 0.6960162864,
    0.6089834347, 0.5210045495, 0.4354402894, 0.3551233730, 0.2822270091, 0.2182020094,
    0.1637810511, 0.1190416120, 0.0835138389, 0.0563165400, 0.0363037629, 0.0222058684,
    0.0127521667, 0.0067664313, 0.0032312239, 0.0013212953, 0.0004272315,
];

/// Which precomputed analysis window to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowType {
    /// 47-tap Chebyshev (sharpest, for strong signals).
    ///
    /// Its main lobe spans roughly 150 bins either side at `N = 2048`, so
    /// tones below about 1.8 kHz are biased by their own
    /// negative-frequency image. Suited to the 1500-2300 Hz video band.
    Cheb47,
    /// 63-tap Hann
    Hann63,
    /// 95-tap Hann
    Hann95,
    /// 127-tap Hann
    Hann127,
    /// 255-tap Hann
    Hann255,
    /// 511-tap Hann
    Hann511,
    /// 1023-tap Hann (widest, for weak signals and band power)
    Hann1023,
}

impl WindowType {
    /// Every window type, sharpest first.
    pub const ALL: [WindowType; 7] = [
        WindowType::Cheb47,
        WindowType::Hann63,
        WindowType::Hann95,
        WindowType::Hann127,
        WindowType::Hann255,
        WindowType::Hann511,
        WindowType::Hann1023,
    ];

    /// Longest supported window length.
    pub const MAX_LEN: usize = 1023;

    /// Number of taps in this window.
    pub const fn len(self) -> usize {
        match self {
            WindowType::Cheb47 => 47,
            WindowType::Hann63 => 63,
            WindowType::Hann95 => 95,
            WindowType::Hann127 => 127,
            WindowType::Hann255 => 255,
            WindowType::Hann511 => 511,
            WindowType::Hann1023 => 1023,
        }
    }

    /// Picks the window for an estimated SNR in dB.
    ///
    /// Thresholds are inclusive lower bounds. `NaN` satisfies none of them
    /// and maps to the widest window.
    pub fn for_snr(snr_db: f64) -> Self {
        if snr_db >= 20.0 {
            WindowType::Cheb47
        } else if snr_db >= 10.0 {
            WindowType::Hann63
        } else if snr_db >= 9.0 {
            WindowType::Hann95
        } else if snr_db >= 3.0 {
            WindowType::Hann127
        } else if snr_db >= -5.0 {
            WindowType::Hann255
        } else if snr_db >= -10.0 {
            WindowType::Hann511
        } else {
            WindowType::Hann1023
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Default for WindowType {
    /// Window used before any SNR estimate exists.
    fn default() -> Self {
        WindowType::for_snr(DEFAULT_SNR_DB)
    }
}

impl std::fmt::Display for WindowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WindowType::Cheb47 => "cheb47",
            WindowType::Hann63 => "hann63",
            WindowType::Hann95 => "hann95",
            WindowType::Hann127 => "hann127",
            WindowType::Hann255 => "hann255",
            WindowType::Hann511 => "hann511",
            WindowType::Hann1023 => "hann1023",
        };
        f.write_str(name)
    }
}

/// Hann coefficients `0.5 * (1 - cos(2*pi*i / (len - 1)))`.
pub fn hann(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos()))
        .collect()
}

/// Precomputed coefficient tables for every [`WindowType`].
///
/// Built once per engine and read-only afterwards.
#[derive(Debug, Clone)]
pub struct WindowBank {
    tables: Vec<Vec<f64>>,
}

impl WindowBank {
    /// Computes all Hann tables and loads the Chebyshev table.
    pub fn new() -> Self {
        let tables = WindowType::ALL
            .iter()
            .map(|&w| match w {
                WindowType::Cheb47 => CHEBYSHEV_47.to_vec(),
                _ => hann(w.len()),
            })
            .collect();
        Self { tables }
    }

    /// Coefficients for a window type.
    pub fn coefficients(&self, window: WindowType) -> &[f64] {
        &self.tables[window.index()]
    }

    /// Windows the analysis span around its centre into `moment`.
    ///
    /// `span` is the run of samples starting at the current cursor; the
    /// window is centred on `span.len() / 2`. Span index `i` contributes when
    /// `i - span.len()/2 + L/2` falls in `[0, L)`, and the product is stored at
    /// that coefficient index, so the window's support fills `moment[..L]`.
    /// Every other slot of `moment` is zeroed.
    ///
    /// Returns the number of leading slots written (the window length).
    ///
    /// # Panics
    ///
    /// Panics if `moment` is shorter than the window.
    pub fn apply(&self, window: WindowType, span: &[i16], moment: &mut [f64]) -> usize {
        let coeffs = self.coefficients(window);
        let len = coeffs.len();
        assert!(
            moment.len() >= len,
            "moment of {} cannot hold {} taps",
            moment.len(),
            len
        );

        moment.fill(0.0);

        let centre = span.len() / 2;
        let half = len / 2;
        for (i, &sample) in span.iter().enumerate() {
            // win_i = i - centre + half, kept in usize arithmetic
            let Some(win_i) = (i + half).checked_sub(centre) else {
                continue;
            };
            if win_i >= len {
                break;
            }
            moment[win_i] = f64::from(sample) * coeffs[win_i];
        }

        len
    }
}

impl Default for WindowBank {
    fn default() -> Self {
        Self::new()
    }
}
