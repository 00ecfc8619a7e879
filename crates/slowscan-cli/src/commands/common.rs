//! Shared CLI helpers used across multiple commands.

use slowscan_config::BandSetting;

/// Split `"a:b"` into two numbers.
fn parse_pair(s: &str, what: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid {what}: '{s}' (expected A:B)"))?;
    let a: f64 = a
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {what}: '{s}' ('{a}' is not a number)"))?;
    let b: f64 = b
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {what}: '{s}' ('{b}' is not a number)"))?;
    Ok((a, b))
}

/// Parse a `LO:HI` band in Hz for clap's `value_parser`.
pub fn parse_band(s: &str) -> Result<BandSetting, String> {
    let (low_hz, high_hz) = parse_pair(s, "band")?;
    if !(low_hz >= 0.0 && low_hz < high_hz) {
        return Err(format!("Invalid band: '{s}' (need 0 <= LO < HI)"));
    }
    Ok(BandSetting { low_hz, high_hz })
}

/// Parse a `FREQ:SECONDS` tone segment for clap's `value_parser`.
pub fn parse_segment(s: &str) -> Result<(f64, f64), String> {
    let (freq, secs) = parse_pair(s, "segment")?;
    if !(freq >= 0.0 && secs > 0.0) {
        return Err(format!("Invalid segment: '{s}' (need FREQ >= 0 and SECONDS > 0)"));
    }
    Ok((freq, secs))
}

/// Seeded xorshift32 white noise in `[-1, 1]`.
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x1234_5678 } else { seed },
        }
    }

    pub fn next_sample(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        f64::from(x) / f64::from(u32::MAX) * 2.0 - 1.0
    }
}

/// Scale a `[-1, 1]` sample to 16 bits, clipping out-of-range values.
pub fn to_i16(sample: f64) -> i16 {
    (sample * f64::from(i16::MAX))
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
