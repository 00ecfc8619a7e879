//! Live capture source backed by a cpal input stream.
//!
//! The cpal stream lives on a dedicated thread for its whole life, since
//! streams are not `Send` on every host. The input callback downmixes each
//! buffer to mono `i16` and pushes it through a bounded channel; when the
//! consumer falls behind, the chunk is discarded and counted as dropped.

use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, SupportedStreamConfig};
use slowscan_dsp::{AudioSource, ReadOutcome, ReadStatus};

use crate::{Error, Result};

/// Chunks the callback may queue before samples are dropped.
const CHANNEL_DEPTH: usize = 64;

/// Longest a read waits for the device before returning what it has.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Commands sent to the capture thread.
pub(crate) enum CaptureCommand {
    Stop,
}

/// State written by the stream callbacks and read by the source.
#[derive(Debug, Default)]
pub(crate) struct CaptureShared {
    dropped: AtomicU64,
    glitches: AtomicU64,
    lost: AtomicBool,
    lost_reason: OnceLock<String>,
}

impl CaptureShared {
    fn mark_lost(&self, reason: String) {
        let _ = self.lost_reason.set(reason);
        self.lost.store(true, Ordering::SeqCst);
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}

/// Mono 16-bit samples from a capture device.
///
/// Reads block until a full buffer has arrived or [`READ_TIMEOUT`] passes,
/// so a silent device cannot pin the engine past a stop request. Samples lost
/// to overruns are reported as [`ReadStatus::Dropped`]; a disconnected device
/// ends the session with [`ReadStatus::Failed`].
pub struct CaptureSource {
    samples_rx: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    pending_pos: usize,
    shared: Arc<CaptureShared>,
    command_tx: mpsc::Sender<CaptureCommand>,
    thread: Option<JoinHandle<()>>,
    sample_rate: u32,
    device_name: String,
    reported_dropped: u64,
    reported_glitches: u64,
}

impl CaptureSource {
    pub(crate) fn new(
        samples_rx: Receiver<Vec<i16>>,
        shared: Arc<CaptureShared>,
        command_tx: mpsc::Sender<CaptureCommand>,
        thread: Option<JoinHandle<()>>,
        sample_rate: u32,
        device_name: String,
    ) -> Self {
        Self {
            samples_rx,
            pending: Vec::new(),
            pending_pos: 0,
            shared,
            command_tx,
            thread,
            sample_rate,
            device_name,
            reported_dropped: 0,
            reported_glitches: 0,
        }
    }

    /// Name of the capture device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Samples dropped by overruns since the stream started.
    pub fn dropped_samples(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Stops the stream and joins the capture thread.
    pub fn stop(&mut self) {
        let _ = self.command_tx.send(CaptureCommand::Stop);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
            tracing::debug!(device = %self.device_name, "capture stopped");
        }
    }

    fn lost_status(&self) -> ReadStatus {
        let reason = self.shared.lost_reason.get().map_or("device lost", String::as_str);
        ReadStatus::Failed(format!("{}: {reason}", self.device_name))
    }
}

impl AudioSource for CaptureSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, buf: &mut [i16]) -> ReadOutcome {
        let mut count = 0;

        while count < buf.len() {
            if self.pending_pos < self.pending.len() {
                let n = (buf.len() - count).min(self.pending.len() - self.pending_pos);
                buf[count..count + n]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                count += n;
                continue;
            }

            let next = match self.samples_rx.try_recv() {
                Ok(chunk) => Ok(chunk),
                Err(TryRecvError::Empty) if self.shared.is_lost() => {
                    return ReadOutcome {
                        count,
                        status: self.lost_status(),
                    };
                }
                Err(TryRecvError::Empty) => self.samples_rx.recv_timeout(READ_TIMEOUT),
                Err(TryRecvError::Disconnected) => Err(RecvTimeoutError::Disconnected),
            };

            match next {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pending_pos = 0;
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::trace!(count, "capture read timed out");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let status = if self.shared.is_lost() {
                        self.lost_status()
                    } else {
                        ReadStatus::Failed(format!("{}: capture stream closed", self.device_name))
                    };
                    return ReadOutcome { count, status };
                }
            }
        }

        let dropped = self.shared.dropped.load(Ordering::Relaxed);
        let glitches = self.shared.glitches.load(Ordering::Relaxed);
        let new_drops = dropped - self.reported_dropped;
        if new_drops > 0 || glitches > self.reported_glitches {
            self.reported_dropped = dropped;
            self.reported_glitches = glitches;
            return ReadOutcome {
                count,
                status: ReadStatus::Dropped(new_drops),
            };
        }

        ReadOutcome::ok(count)
    }

    fn describe(&self) -> String {
        format!("capture {} @ {} Hz", self.device_name, self.sample_rate)
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSource")
            .field("device", &self.device_name)
            .field("sample_rate", &self.sample_rate)
            .field("dropped", &self.dropped_samples())
            .finish_non_exhaustive()
    }
}

/// Averages one interleaved frame to a mono 16-bit sample.
pub(crate) fn downmix_frame(frame: &[f32]) -> i16 {
    if frame.is_empty() {
        return 0;
    }
    let mean = frame.iter().sum::<f32>() / frame.len() as f32;
    (mean * f32::from(i16::MAX))
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Builds and plays the input stream. Must run on the thread that keeps it.
pub(crate) fn start_stream(
    device: &Device,
    config: &SupportedStreamConfig,
    shared: &Arc<CaptureShared>,
) -> Result<(cpal::Stream, Receiver<Vec<i16>>)> {
    let (tx, rx) = mpsc::sync_channel::<Vec<i16>>(CHANNEL_DEPTH);
    let channels = usize::from(config.channels());
    let stream_config = config.config();

    let stream = match config.sample_format() {
        SampleFormat::I16 => build_stream::<i16>(device, &stream_config, channels, tx, shared),
        SampleFormat::F32 => build_stream::<f32>(device, &stream_config, channels, tx, shared),
        SampleFormat::I32 => build_stream::<i32>(device, &stream_config, channels, tx, shared),
        SampleFormat::U16 => build_stream::<u16>(device, &stream_config, channels, tx, shared),
        other => return Err(Error::UnsupportedFormat(format!("{other:?}"))),
    }
    .map_err(|e| Error::Unusable(e.to_string()))?;

    stream.play().map_err(|e| Error::Unusable(e.to_string()))?;
    Ok((stream, rx))
}

fn build_stream<T: cpal::Sample + cpal::SizedSample>(
    device: &Device,
    config: &cpal::StreamConfig,
    channels: usize,
    tx: SyncSender<Vec<i16>>,
    shared: &Arc<CaptureShared>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    f32: cpal::FromSample<T>,
{
    let data_shared = Arc::clone(shared);
    let error_shared = Arc::clone(shared);
    let mut frame: Vec<f32> = Vec::with_capacity(channels);

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mono: Vec<i16> = data
                .chunks(channels.max(1))
                .map(|chunk| {
                    frame.clear();
                    frame.extend(chunk.iter().map(|&s| <f32 as cpal::Sample>::from_sample(s)));
                    downmix_frame(&frame)
                })
                .collect();

            match tx.try_send(mono) {
                Ok(()) => {}
                Err(TrySendError::Full(lost)) => {
                    data_shared
                        .dropped
                        .fetch_add(lost.len() as u64, Ordering::Relaxed);
                }
                // Source dropped; the stream is about to be torn down
                Err(TrySendError::Disconnected(_)) => {}
            }
        },
        move |err| match err {
            cpal::StreamError::DeviceNotAvailable => {
                tracing::error!("capture device disconnected");
                error_shared.mark_lost("device not available".into());
            }
            other => {
                tracing::warn!(error = %other, "capture stream error");
                error_shared.glitches.fetch_add(1, Ordering::Relaxed);
            }
        },
        None,
    )
}
