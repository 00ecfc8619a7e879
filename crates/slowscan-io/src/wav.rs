//! WAV file input and test-signal output.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use slowscan_dsp::{AudioSource, ReadOutcome, ReadStatus};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

impl WavInfo {
    fn from_spec(spec: hound::WavSpec, num_frames: u64) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            num_frames,
            duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
            format: match spec.sample_format {
                SampleFormat::Float => WavFormat::IeeeFloat,
                SampleFormat::Int => WavFormat::Pcm,
            },
        }
    }
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    Ok(WavInfo::from_spec(reader.spec(), u64::from(reader.duration())))
}

/// Write mono 16-bit samples to a WAV file.
///
/// # Example
/// ```ignore
/// let silence = vec![0i16; 44100]; // 1 second
/// write_wav_i16("silence.wav", &silence, 44100)?;
/// ```
pub fn write_wav_i16<P: AsRef<Path>>(path: P, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Streaming WAV reader delivering mono 16-bit samples.
///
/// Integer files of any depth are rescaled to 16 bits, float files are scaled
/// by `i16::MAX`, and multi-channel frames are averaged. The file is read
/// incrementally; nothing is buffered beyond hound's reader.
///
/// A read that cannot fill the whole buffer reports
/// [`ReadStatus::Exhausted`]. A decoding error part-way through reports
/// [`ReadStatus::Failed`] along with the samples decoded before it.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    info: WavInfo,
    path: PathBuf,
    frames_read: u64,
}

impl WavSource {
    /// Opens a WAV file for streaming.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path)?;
        let spec = reader.spec();

        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 8 | 16 | 24 | 32) | (SampleFormat::Float, 32) => {}
            (format, bits) => {
                return Err(Error::UnsupportedFormat(format!("{format:?} at {bits} bits")));
            }
        }
        if spec.channels == 0 {
            return Err(Error::UnsupportedFormat("zero channels".into()));
        }

        let info = WavInfo::from_spec(spec, u64::from(reader.duration()));
        tracing::info!(
            path = %path.display(),
            sample_rate = info.sample_rate,
            channels = info.channels,
            bits = info.bits_per_sample,
            duration_s = info.duration_secs,
            "opened WAV source"
        );

        Ok(Self {
            reader,
            info,
            path,
            frames_read: 0,
        })
    }

    /// Header information of the open file.
    pub fn info(&self) -> &WavInfo {
        &self.info
    }

    /// Frames delivered so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn read_frames<S, F>(&mut self, buf: &mut [i16], to_i16_range: F) -> ReadOutcome
    where
        S: hound::Sample,
        F: Fn(S) -> i32,
    {
        let channels = usize::from(self.info.channels);
        let mut samples = self.reader.samples::<S>();
        let mut count = 0;

        let status = 'frames: loop {
            if count == buf.len() {
                break ReadStatus::Ok;
            }

            let mut sum: i64 = 0;
            for _ in 0..channels {
                match samples.next() {
                    Some(Ok(s)) => sum += i64::from(to_i16_range(s)),
                    Some(Err(e)) => break 'frames ReadStatus::Failed(e.to_string()),
                    // A trailing partial frame is discarded
                    None => break 'frames ReadStatus::Exhausted,
                }
            }

            buf[count] = (sum / channels as i64) as i16;
            count += 1;
        };

        self.frames_read += count as u64;
        ReadOutcome { count, status }
    }
}

impl AudioSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    fn read(&mut self, buf: &mut [i16]) -> ReadOutcome {
        match self.info.format {
            WavFormat::Pcm => {
                let bits = u32::from(self.info.bits_per_sample);
                self.read_frames::<i32, _>(buf, |s| {
                    if bits >= 16 {
                        s >> (bits - 16)
                    } else {
                        s << (16 - bits)
                    }
                })
            }
            WavFormat::IeeeFloat => self.read_frames::<f32, _>(buf, |s| {
                (f64::from(s) * f64::from(i16::MAX))
                    .round()
                    .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i32
            }),
        }
    }

    fn describe(&self) -> String {
        format!("wav {}", self.path.display())
    }
}

impl std::fmt::Debug for WavSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavSource")
            .field("path", &self.path)
            .field("info", &self.info)
            .field("frames_read", &self.frames_read)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_with_spec(spec: hound::WavSpec, write: impl FnOnce(&mut WavWriter<std::io::BufWriter<File>>)) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        write(&mut writer);
        writer.finalize().unwrap();
        file
    }

    #[test]
    fn test_roundtrip_i16() {
        let samples: Vec<i16> = (0..1000).map(|i| ((i * 37) % 2000 - 1000) as i16).collect();
        let file = NamedTempFile::new().unwrap();
        write_wav_i16(file.path(), &samples, 44100).unwrap();

        let mut source = WavSource::open(file.path()).unwrap();
        assert_eq!(source.sample_rate(), 44100);

        let mut buf = vec![0i16; 1024];
        let outcome = source.read(&mut buf);
        assert_eq!(outcome, ReadOutcome::exhausted(1000));
        assert_eq!(&buf[..1000], &samples[..]);
        assert_eq!(source.frames_read(), 1000);
    }

    #[test]
    fn test_full_chunks_then_exhaustion() {
        let file = NamedTempFile::new().unwrap();
        write_wav_i16(file.path(), &vec![5; 2048], 44100).unwrap();

        let mut source = WavSource::open(file.path()).unwrap();
        let mut buf = vec![0i16; 1024];
        assert_eq!(source.read(&mut buf), ReadOutcome::ok(1024));
        assert_eq!(source.read(&mut buf), ReadOutcome::ok(1024));
        assert_eq!(source.read(&mut buf), ReadOutcome::exhausted(0));
    }

    #[test]
    fn test_stereo_is_averaged() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let file = write_with_spec(spec, |w| {
            for _ in 0..4 {
                w.write_sample(1000i16).unwrap();
                w.write_sample(-200i16).unwrap();
            }
        });

        let mut source = WavSource::open(file.path()).unwrap();
        assert_eq!(source.info().channels, 2);
        let mut buf = [0i16; 8];
        let outcome = source.read(&mut buf);
        assert_eq!(outcome.count, 4);
        assert_eq!(&buf[..4], &[400, 400, 400, 400]);
    }

    #[test]
    fn test_24_bit_is_rescaled() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let file = write_with_spec(spec, |w| {
            w.write_sample(0x40_0000i32).unwrap();
            w.write_sample(-0x80_0000i32).unwrap();
        });

        let mut source = WavSource::open(file.path()).unwrap();
        let mut buf = [0i16; 2];
        source.read(&mut buf);
        assert_eq!(buf, [0x4000, i16::MIN]);
    }

    #[test]
    fn test_float_is_scaled() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let file = write_with_spec(spec, |w| {
            w.write_sample(0.5f32).unwrap();
            w.write_sample(-1.0f32).unwrap();
            w.write_sample(3.0f32).unwrap();
        });

        let mut source = WavSource::open(file.path()).unwrap();
        let mut buf = [0i16; 3];
        source.read(&mut buf);
        assert_eq!(buf, [16384, -i16::MAX, i16::MAX]);
    }

    #[test]
    fn test_read_wav_info() {
        let file = NamedTempFile::new().unwrap();
        write_wav_i16(file.path(), &vec![0; 22050], 44100).unwrap();

        let info = read_wav_info(file.path()).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.num_frames, 22050);
        assert!((info.duration_secs - 0.5).abs() < 1e-9);
        assert_eq!(info.format, WavFormat::Pcm);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(matches!(
            WavSource::open("/nonexistent/slowscan.wav"),
            Err(Error::Wav(_))
        ));
    }
}
