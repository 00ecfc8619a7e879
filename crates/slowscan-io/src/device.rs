//! Capture device enumeration and opening.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SampleFormat, SupportedStreamConfig};

use crate::capture::{CaptureCommand, CaptureShared, CaptureSource, start_stream};
use crate::{Error, Result};

/// Device name that selects the host's default input without enumerating.
pub const DEFAULT_DEVICE: &str = "default";

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Capture device information.
#[derive(Debug, Clone)]
pub struct InputDevice {
    /// Position in the host's input device list.
    pub index: usize,
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub channels: u16,
    /// Whether this is the host's default input.
    pub is_default: bool,
}

/// How well an opened device matches the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    /// Running at the requested rate.
    Ready,
    /// Running, but at a different rate; estimates are less accurate.
    Degraded {
        /// Rate the device actually runs at.
        actual_rate: u32,
    },
}

/// A capture source and how it was opened.
#[derive(Debug)]
pub struct OpenedCapture {
    /// The running source.
    pub source: CaptureSource,
    /// Whether the requested rate was honoured.
    pub status: OpenStatus,
}

/// List all available capture devices.
pub fn list_input_devices() -> Result<Vec<InputDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| device_name(&d).ok());

    let devices = host
        .input_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    Ok(devices
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device_name(&device).ok()?;
            let (default_sample_rate, channels) = device
                .default_input_config()
                .map(|c| (c.sample_rate(), c.channels()))
                .unwrap_or((44100, 1));
            Some(InputDevice {
                index,
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                default_sample_rate,
                channels,
            })
        })
        .collect())
}

/// Get the default capture device info.
pub fn default_input_device() -> Result<InputDevice> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(Error::NoDevice)?;
    let name = device_name(&device).map_err(|e| Error::Unusable(e.to_string()))?;
    let (default_sample_rate, channels) = device
        .default_input_config()
        .map(|c| (c.sample_rate(), c.channels()))
        .map_err(|e| Error::Unusable(e.to_string()))?;

    Ok(InputDevice {
        index: 0,
        name,
        default_sample_rate,
        channels,
        is_default: true,
    })
}

/// Opens a capture device and starts streaming from it.
///
/// `wanted` is [`DEFAULT_DEVICE`] (or empty) for the host default, otherwise
/// a numeric index, an exact device name, or a case-insensitive partial name.
///
/// # Errors
///
/// - [`Error::NoDevice`] / [`Error::DeviceNotFound`]: nothing matches `wanted`
///   or the device has disappeared
/// - [`Error::Unusable`]: the device was found but could not be opened
/// - [`Error::UnsupportedFormat`]: the device only offers sample formats
///   that cannot be converted
///
/// A device that opens at a rate other than `sample_rate` is not an error; it
/// is reported as [`OpenStatus::Degraded`].
pub fn open_capture(wanted: &str, sample_rate: u32) -> Result<OpenedCapture> {
    let wanted = wanted.trim().to_string();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let (command_tx, command_rx) = mpsc::channel::<CaptureCommand>();
    let shared = Arc::new(CaptureShared::default());
    let thread_shared = Arc::clone(&shared);

    let handle = thread::Builder::new()
        .name("slowscan-capture".into())
        .spawn(move || {
            let started = resolve_input_device(&cpal::default_host(), &wanted).and_then(|device| {
                let (config, status) = choose_config(&device, sample_rate)?;
                let name = device_name(&device).unwrap_or_else(|_| wanted.clone());
                let (stream, rx) = start_stream(&device, &config, &thread_shared)?;
                Ok((stream, rx, name, config.sample_rate(), status))
            });

            match started {
                Ok((stream, rx, name, rate, status)) => {
                    if ready_tx.send(Ok((rx, name, rate, status))).is_err() {
                        return;
                    }
                    // Keep the stream alive until told to stop or the source is dropped
                    let _ = command_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        })
        .map_err(|e| Error::Stream(format!("failed to spawn capture thread: {e}")))?;

    let (rx, name, rate, status) = match ready_rx.recv() {
        Ok(Ok(started)) => started,
        Ok(Err(e)) => {
            let _ = handle.join();
            return Err(e);
        }
        Err(_) => {
            let _ = handle.join();
            return Err(Error::Stream("capture thread exited during setup".into()));
        }
    };

    match status {
        OpenStatus::Ready => {
            tracing::info!(device = %name, sample_rate = rate, "capture started");
        }
        OpenStatus::Degraded { actual_rate } => {
            tracing::warn!(
                device = %name,
                requested = sample_rate,
                actual = actual_rate,
                "capture started at a different sample rate"
            );
        }
    }

    Ok(OpenedCapture {
        source: CaptureSource::new(rx, shared, command_tx, Some(handle), rate, name),
        status,
    })
}

fn resolve_input_device(host: &Host, wanted: &str) -> Result<Device> {
    if wanted.is_empty() || wanted.eq_ignore_ascii_case(DEFAULT_DEVICE) {
        return host.default_input_device().ok_or(Error::NoDevice);
    }

    let devices: Vec<Device> = host
        .input_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();
    let names: Vec<String> = devices
        .iter()
        .map(|d| device_name(d).unwrap_or_default())
        .collect();

    let index = match_device_name(&names, wanted)?;
    Ok(devices[index].clone())
}

/// Find a device in a name list by index, exact name, or fuzzy match.
fn match_device_name(names: &[String], name_or_index: &str) -> Result<usize> {
    // Try parsing as index first
    if let Ok(index) = name_or_index.parse::<usize>() {
        if index < names.len() {
            return Ok(index);
        }
        return Err(Error::DeviceNotFound(format!(
            "input device index {} (only {} devices available)",
            index,
            names.len()
        )));
    }

    // Try exact match
    if let Some(index) = names.iter().position(|n| n == name_or_index) {
        return Ok(index);
    }

    // Try case-insensitive partial match
    let search_lower = name_or_index.to_lowercase();
    let matches: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.to_lowercase().contains(&search_lower))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [] => Err(Error::DeviceNotFound(format!(
            "no input device matching '{name_or_index}'"
        ))),
        [only] => Ok(*only),
        [first, ..] => {
            let candidates: Vec<&str> = matches.iter().map(|&i| names[i].as_str()).collect();
            tracing::warn!(
                search = name_or_index,
                ?candidates,
                chosen = %names[*first],
                "device name matches several inputs, using the first"
            );
            Ok(*first)
        }
    }
}

/// Preference order among the formats the capture path converts.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::I32 => Some(2),
        SampleFormat::U16 => Some(3),
        _ => None,
    }
}

/// Picks a stream config at `sample_rate` if the device offers one, otherwise
/// falls back to the device default and reports the rate it runs at.
fn choose_config(device: &Device, sample_rate: u32) -> Result<(SupportedStreamConfig, OpenStatus)> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| Error::Unusable(e.to_string()))?;

    let exact = ranges
        .filter(|r| r.min_sample_rate() <= sample_rate && sample_rate <= r.max_sample_rate())
        .filter_map(|r| format_rank(r.sample_format()).map(|rank| (rank, r.channels(), r)))
        .min_by_key(|(rank, channels, _)| (*rank, *channels));

    if let Some((_, _, range)) = exact {
        return Ok((range.with_sample_rate(sample_rate), OpenStatus::Ready));
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| Error::Unusable(e.to_string()))?;
    if format_rank(fallback.sample_format()).is_none() {
        return Err(Error::UnsupportedFormat(format!("{:?}", fallback.sample_format())));
    }

    let status = if fallback.sample_rate() == sample_rate {
        OpenStatus::Ready
    } else {
        OpenStatus::Degraded {
            actual_rate: fallback.sample_rate(),
        }
    };
    Ok((fallback, status))
}
