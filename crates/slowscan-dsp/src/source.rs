//! Audio source contract and an in-memory implementation.
//!
//! The engine pulls mono 16-bit samples through [`AudioSource::read`]. Adapters
//! for files and capture devices live in `slowscan-io`; [`MemorySource`] serves
//! synthetic signals and tests.

/// How a read ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// The source can keep delivering.
    Ok,
    /// Samples were lost upstream (overrun); reading may continue.
    Dropped(u64),
    /// Normal end of input.
    Exhausted,
    /// Unrecoverable read failure, such as a lost device.
    Failed(String),
}

impl ReadStatus {
    /// Whether the source can be read again after this status.
    pub fn is_live(&self) -> bool {
        matches!(self, ReadStatus::Ok | ReadStatus::Dropped(_))
    }
}

/// Result of one [`AudioSource::read`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Samples written to the front of the buffer.
    pub count: usize,
    /// Source condition after the read.
    pub status: ReadStatus,
}

impl ReadOutcome {
    /// A read that delivered `count` samples with nothing to report.
    pub fn ok(count: usize) -> Self {
        Self {
            count,
            status: ReadStatus::Ok,
        }
    }

    /// A read that delivered `count` samples and then hit the end of input.
    pub fn exhausted(count: usize) -> Self {
        Self {
            count,
            status: ReadStatus::Exhausted,
        }
    }
}

/// A pull-based source of mono 16-bit samples at a fixed rate.
///
/// `read` may block until samples are available. It fills the front of `buf`
/// with up to `buf.len()` samples and reports how many it wrote. A short read
/// from a file means the file has ended and is reported as
/// [`ReadStatus::Exhausted`].
pub trait AudioSource: Send {
    /// Sample rate in Hz, fixed at construction.
    fn sample_rate(&self) -> u32;

    /// Reads up to `buf.len()` samples.
    fn read(&mut self, buf: &mut [i16]) -> ReadOutcome;

    /// Short description for logs.
    fn describe(&self) -> String {
        "audio source".to_string()
    }
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read(&mut self, buf: &mut [i16]) -> ReadOutcome {
        (**self).read(buf)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Source serving a sample vector, then reporting exhaustion.
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<i16>,
    pos: usize,
    sample_rate: u32,
}

impl MemorySource {
    /// Wraps samples recorded at `sample_rate` Hz.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            pos: 0,
            sample_rate,
        }
    }

    /// Builds a source from normalised `[-1.0, 1.0]` samples.
    pub fn from_f64(samples: &[f64], sample_rate: u32) -> Self {
        let samples = samples
            .iter()
            .map(|&s| (s * f64::from(i16::MAX)).round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Samples not yet read.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.pos
    }
}

impl AudioSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, buf: &mut [i16]) -> ReadOutcome {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.samples[self.pos..self.pos + n]);
        self.pos += n;

        if n < buf.len() {
            ReadOutcome::exhausted(n)
        } else {
            ReadOutcome::ok(n)
        }
    }

    fn describe(&self) -> String {
        format!("memory ({} samples @ {} Hz)", self.samples.len(), self.sample_rate)
    }
}
