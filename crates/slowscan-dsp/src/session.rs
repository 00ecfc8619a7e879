//! Session lifecycle, cooperative stop flag, and status events.
//!
//! ```text
//!   Idle ──attach──▶ Listening ──source ends / fails──▶ Exhausted
//!                        │
//!                        └──────stop requested──────▶ Aborted
//! ```
//!
//! `Exhausted` and `Aborted` are terminal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Engine session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No source attached yet.
    Idle,
    /// Reading from the attached source.
    Listening,
    /// The source ended or failed.
    Exhausted,
    /// A cooperative stop was requested.
    Aborted,
}

impl SessionState {
    /// Whether no further refill or advance can succeed.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Exhausted | SessionState::Aborted)
    }
}

/// Shared cooperative-stop flag.
///
/// Cloning shares the flag. A stop requested from any clone is seen by the
/// engine at its next refill or analysis call; nothing is interrupted mid-way.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Whether the source runs at the rate the engine was configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateStatus {
    /// Rates agree.
    Matched,
    /// The source runs at a different rate. The engine converts with the
    /// actual rate, but downstream timing tuned for `expected` may drift.
    Mismatch {
        /// Configured rate in Hz.
        expected: u32,
        /// Rate reported by the source in Hz.
        actual: u32,
    },
}

impl RateStatus {
    /// Compares a configured rate against a source's rate.
    pub fn compare(expected: u32, actual: u32) -> Self {
        if expected == actual {
            RateStatus::Matched
        } else {
            RateStatus::Mismatch { expected, actual }
        }
    }

    /// Whether accuracy is degraded by a rate mismatch.
    pub fn is_degraded(self) -> bool {
        matches!(self, RateStatus::Mismatch { .. })
    }
}

/// Condition reported by the engine to its status callback.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// The attached source runs at an unexpected rate.
    RateMismatch {
        /// Configured rate in Hz.
        expected: u32,
        /// Source rate in Hz.
        actual: u32,
    },
    /// The source lost samples; the session continues.
    SamplesDropped {
        /// Samples lost in this report.
        count: u64,
        /// Samples lost since attach.
        total: u64,
    },
    /// The source failed; the session has ended.
    SourceError(String),
    /// The source ran out of samples; the session has ended.
    Exhausted,
    /// A stop request ended the session.
    Aborted,
}

/// Callback receiving [`StatusEvent`]s on the engine's thread.
pub type StatusCallback = Box<dyn FnMut(&StatusEvent) + Send>;
