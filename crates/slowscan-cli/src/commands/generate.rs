//! Test signal generation command.

use super::common::{Noise, parse_segment, to_i16};
use clap::{Args, Subcommand};
use slowscan_io::write_wav_i16;
use std::f64::consts::TAU;
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(subcommand)]
    command: GenerateCommand,
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate a sine tone
    Tone {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Frequency in Hz
        #[arg(long, default_value = "1900.0")]
        freq: f64,

        /// Duration in seconds
        #[arg(long, default_value = "1.0")]
        duration: f64,

        /// Sample rate
        #[arg(long, default_value = "44100")]
        sample_rate: u32,

        /// Amplitude (0-1)
        #[arg(long, default_value = "0.5")]
        amplitude: f64,

        /// White noise amplitude added on top (0-1)
        #[arg(long, default_value = "0.0")]
        noise: f64,
    },

    /// Generate a phase-continuous sequence of tones
    Steps {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Tone segments as FREQ:SECONDS, in order (e.g. 1200:0.03 1500:0.5)
        #[arg(value_name = "SEGMENT", required = true, value_parser = parse_segment)]
        segments: Vec<(f64, f64)>,

        /// Sample rate
        #[arg(long, default_value = "44100")]
        sample_rate: u32,

        /// Amplitude (0-1)
        #[arg(long, default_value = "0.5")]
        amplitude: f64,

        /// White noise amplitude added on top (0-1)
        #[arg(long, default_value = "0.0")]
        noise: f64,
    },
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    match args.command {
        GenerateCommand::Tone {
            output,
            freq,
            duration,
            sample_rate,
            amplitude,
            noise,
        } => {
            check_levels(sample_rate, amplitude, noise)?;
            if duration <= 0.0 {
                anyhow::bail!("Duration must be positive");
            }

            println!("Generating {freq} Hz tone...");
            println!("  {:.2}s at {} Hz", duration, sample_rate);

            let samples = synthesize(&[(freq, duration)], sample_rate, amplitude, noise);
            write_wav_i16(&output, &samples, sample_rate)?;
            println!("Wrote {} samples to {}", samples.len(), output.display());
        }

        GenerateCommand::Steps {
            output,
            segments,
            sample_rate,
            amplitude,
            noise,
        } => {
            check_levels(sample_rate, amplitude, noise)?;

            let total: f64 = segments.iter().map(|(_, secs)| secs).sum();
            println!("Generating {} tone segment(s)...", segments.len());
            println!("  {:.2}s at {} Hz", total, sample_rate);

            let samples = synthesize(&segments, sample_rate, amplitude, noise);
            write_wav_i16(&output, &samples, sample_rate)?;
            println!("Wrote {} samples to {}", samples.len(), output.display());
        }
    }

    Ok(())
}

fn check_levels(sample_rate: u32, amplitude: f64, noise: f64) -> anyhow::Result<()> {
    if sample_rate == 0 {
        anyhow::bail!("Sample rate must be positive");
    }
    if !(0.0..=1.0).contains(&amplitude) || !(0.0..=1.0).contains(&noise) {
        anyhow::bail!("Amplitude and noise must be within 0-1");
    }
    Ok(())
}

/// Renders tone segments back to back, keeping the phase continuous across
/// frequency changes.
fn synthesize(segments: &[(f64, f64)], sample_rate: u32, amplitude: f64, noise: f64) -> Vec<i16> {
    let rate = f64::from(sample_rate);
    let mut rng = Noise::new(0x5eed_0001);
    let mut phase = 0.0_f64;
    let mut samples = Vec::new();

    for &(freq, secs) in segments {
        let n = (secs * rate).round() as usize;
        let step = TAU * freq / rate;
        samples.extend((0..n).map(|_| {
            let s = amplitude * phase.sin() + noise * rng.next_sample();
            phase = (phase + step) % TAU;
            to_i16(s)
        }));
    }
    samples
}
