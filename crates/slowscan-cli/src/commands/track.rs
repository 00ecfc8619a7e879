//! Tone tracking command.

use super::common::parse_band;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use serde::Serialize;
use slowscan_config::{BandSetting, Settings};
use slowscan_dsp::{
    DspEngine, EngineWorker, Error as DspError, FrequencyBand, SessionState, StatusEvent,
    WindowType,
};
use slowscan_io::{OpenStatus, WavSource, open_capture};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc;

/// Output formats for tracked estimates
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `time,peak_hz,...` row per estimate
    #[default]
    Csv,
    /// A single JSON array written when tracking ends
    Json,
}

#[derive(Args)]
pub struct TrackArgs {
    /// WAV file to analyze (omit to capture live input)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Capture device name or index
    #[arg(short, long)]
    device: Option<String>,

    /// Settings file (defaults to the user settings)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Expected sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Lower edge of the peak search in Hz
    #[arg(long)]
    min: Option<f64>,

    /// Upper edge of the peak search in Hz
    #[arg(long)]
    max: Option<f64>,

    /// Time between estimates in milliseconds
    #[arg(long)]
    step_ms: Option<f64>,

    /// Signal-to-noise ratio in dB used to pick the analysis window
    #[arg(long, allow_negative_numbers = true)]
    snr: Option<f64>,

    /// Report power density in a band (LO:HI in Hz, repeatable)
    #[arg(long = "band", value_parser = parse_band)]
    bands: Vec<BandSetting>,

    /// Stop after this many seconds of audio
    #[arg(long)]
    duration: Option<f64>,

    /// Write estimates here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

/// One estimate.
#[derive(Debug, Clone, Serialize)]
struct Row {
    time_s: f64,
    peak_hz: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    band_density: Vec<f64>,
}

/// Destination for rows, streamed as CSV or collected for JSON.
enum RowSink {
    Csv(Box<dyn Write + Send>),
    Json {
        out: Box<dyn Write + Send>,
        rows: Vec<Row>,
    },
}

impl RowSink {
    fn new(out: Box<dyn Write + Send>, format: OutputFormat, bands: &[FrequencyBand]) -> anyhow::Result<Self> {
        Ok(match format {
            OutputFormat::Csv => {
                let mut out = out;
                write!(out, "time,peak_hz")?;
                for band in bands {
                    write!(out, ",band_{}_{}", band.low_hz, band.high_hz)?;
                }
                writeln!(out)?;
                RowSink::Csv(out)
            }
            OutputFormat::Json => RowSink::Json {
                out,
                rows: Vec::new(),
            },
        })
    }

    fn push(&mut self, row: Row) -> anyhow::Result<()> {
        match self {
            RowSink::Csv(out) => {
                write!(out, "{:.6},{:.3}", row.time_s, row.peak_hz)?;
                for density in &row.band_density {
                    write!(out, ",{density:.6e}")?;
                }
                writeln!(out)?;
            }
            RowSink::Json { rows, .. } => rows.push(row),
        }
        Ok(())
    }

    fn finish(self) -> anyhow::Result<()> {
        match self {
            RowSink::Csv(mut out) => out.flush()?,
            RowSink::Json { mut out, rows } => {
                serde_json::to_writer_pretty(&mut out, &rows)?;
                writeln!(out)?;
                out.flush()?;
            }
        }
        Ok(())
    }
}

/// Analysis parameters fixed for a whole run.
struct TrackPlan {
    min_hz: f64,
    max_hz: f64,
    window: WindowType,
    step_ms: f64,
    bands: Vec<FrequencyBand>,
    max_secs: Option<f64>,
}

/// What the worker reports when it returns.
#[derive(Debug)]
struct TrackSummary {
    estimates: u64,
    elapsed: f64,
    state: SessionState,
    consumed: u64,
    dropped: u64,
}

fn resolve_settings(args: &TrackArgs) -> anyhow::Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::load_or_default()?,
    };

    if let Some(device) = &args.device {
        settings.device.clone_from(device);
    }
    if let Some(rate) = args.sample_rate {
        settings.sample_rate = rate;
    }
    if let Some(min) = args.min {
        settings.min_hz = min;
    }
    if let Some(max) = args.max {
        settings.max_hz = max;
    }
    if let Some(step) = args.step_ms {
        settings.step_ms = step;
    }
    if let Some(snr) = args.snr {
        settings.snr_db = snr;
    }
    if !args.bands.is_empty() {
        settings.bands.clone_from(&args.bands);
    }

    settings.validate()?;
    Ok(settings)
}

pub fn run(args: TrackArgs) -> anyhow::Result<()> {
    if args.duration.is_some_and(|d| !(d > 0.0)) {
        anyhow::bail!("Duration must be positive");
    }
    let settings = resolve_settings(&args)?;

    let mut engine = DspEngine::new(settings.engine_config())?;
    let (event_tx, event_rx) = mpsc::channel();
    engine.set_status_callback(Box::new(move |event: &StatusEvent| {
        let _ = event_tx.send(event.clone());
    }));

    let progress = match &args.input {
        Some(path) => {
            let source = WavSource::open(path)?;
            let info = source.info().clone();
            eprintln!(
                "Tracking {} ({:.2}s, {} Hz, {} ch)",
                path.display(),
                info.duration_secs,
                info.sample_rate,
                info.channels
            );
            engine.attach(source)?;

            let pb = ProgressBar::new(info.num_frames);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => {
            let opened = open_capture(&settings.device, settings.sample_rate)?;
            let name = opened.source.device_name().to_string();
            match opened.status {
                OpenStatus::Ready => eprintln!("Listening on {name} at {} Hz", settings.sample_rate),
                OpenStatus::Degraded { actual_rate } => eprintln!(
                    "Listening on {name} at {actual_rate} Hz (requested {} Hz; estimates use the actual rate)",
                    settings.sample_rate
                ),
            }
            engine.attach(opened.source)?;
            eprintln!("Press Ctrl+C to stop...");
            ProgressBar::hidden()
        }
    };

    let plan = TrackPlan {
        min_hz: settings.min_hz,
        max_hz: settings.max_hz,
        window: WindowType::for_snr(settings.snr_db),
        step_ms: settings.step_ms,
        bands: settings.frequency_bands(),
        max_secs: args.duration,
    };
    tracing::info!(
        window = %plan.window,
        min_hz = plan.min_hz,
        max_hz = plan.max_hz,
        step_ms = plan.step_ms,
        bands = plan.bands.len(),
        "tracking"
    );

    let out: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let sink = RowSink::new(out, args.format, &plan.bands)?;

    let worker_pb = progress.clone();
    let worker = EngineWorker::spawn(engine, move |engine| track_loop(engine, &plan, sink, &worker_pb))?;

    let stop = worker.stop_token();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        stop.request_stop();
    })?;

    let summary = worker.join()??;
    progress.finish_and_clear();

    report(&summary, event_rx.try_iter());
    Ok(())
}

fn track_loop(
    engine: &Mutex<DspEngine>,
    plan: &TrackPlan,
    mut sink: RowSink,
    progress: &ProgressBar,
) -> anyhow::Result<TrackSummary> {
    let mut estimates = 0;

    loop {
        let mut engine = engine.lock();
        if !engine.is_listening() {
            break;
        }
        let time_s = engine.elapsed();
        if plan.max_secs.is_some_and(|limit| time_s >= limit) {
            break;
        }

        let peak_hz = match engine.peak_frequency(plan.min_hz, plan.max_hz, plan.window) {
            Ok(hz) => hz,
            Err(DspError::Cancelled) => break,
            Err(e) => return Err(e.into()),
        };
        let band_density = if plan.bands.is_empty() {
            Vec::new()
        } else {
            match engine.band_power_density(&plan.bands) {
                Ok(density) => density,
                Err(DspError::Cancelled) => break,
                Err(e) => return Err(e.into()),
            }
        };

        engine.advance_ms(plan.step_ms);
        progress.set_position(engine.consumed_samples());
        drop(engine);

        sink.push(Row {
            time_s,
            peak_hz,
            band_density,
        })?;
        estimates += 1;
    }

    sink.finish()?;

    let engine = engine.lock();
    Ok(TrackSummary {
        estimates,
        elapsed: engine.elapsed(),
        state: engine.state(),
        consumed: engine.consumed_samples(),
        dropped: engine.dropped_samples(),
    })
}

fn report(summary: &TrackSummary, events: impl Iterator<Item = StatusEvent>) {
    for event in events {
        match event {
            StatusEvent::RateMismatch { expected, actual } => {
                eprintln!("Note: source runs at {actual} Hz, expected {expected} Hz");
            }
            StatusEvent::SourceError(reason) => eprintln!("Source error: {reason}"),
            StatusEvent::SamplesDropped { .. } | StatusEvent::Exhausted | StatusEvent::Aborted => {}
        }
    }

    let ended = match summary.state {
        SessionState::Exhausted => "source ended",
        SessionState::Aborted => "stopped",
        SessionState::Idle | SessionState::Listening => "duration reached",
    };
    eprintln!(
        "{} estimate(s) over {:.2}s ({} samples), {ended}",
        summary.estimates, summary.elapsed, summary.consumed
    );
    if summary.dropped > 0 {
        eprintln!("Warning: {} sample(s) dropped by the source", summary.dropped);
    }
}
