//! Time normalization for independently clocked sensor streams
//!
//! Recorded logs and live envelopes both encode sample time as a
//! `(seconds, microseconds)` pair. Before any two streams can be compared
//! the pair is collapsed into one integer microsecond axis:
//!
//! ```text
//! t = seconds * 1_000_000 + microseconds
//! ```
//!
//! On top of that axis an optional quantization granularity can be applied.
//! The streams are sampled by independent clocks with visible jitter, so a
//! direct equality join almost never matches; rounding every timestamp to
//! the nearest granularity tick (e.g. 0.5 s) gives jittered records a
//! common key before the tolerance window is even consulted.

use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};

/// Timestamp in microseconds since epoch
pub type Timestamp = u64;

/// Microseconds per second, the normalization factor
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Collapse a `(seconds, microseconds)` pair into one microsecond timestamp.
///
/// Injective on valid pairs (`micros < 1_000_000`): distinct pairs always
/// map to distinct timestamps.
pub fn normalize(seconds: u64, micros: u32) -> PipelineResult<Timestamp> {
    seconds
        .checked_mul(MICROS_PER_SEC)
        .and_then(|s| s.checked_add(micros as u64))
        .ok_or(PipelineError::TimestampOverflow)
}

/// Rounding granularity for timestamp quantization, in microseconds.
///
/// Wraps a non-zero tick width. Typical values for the recorded kiwi-car
/// logs are 0.5 s and 1 s; the right value is an open tuning question, so
/// it stays configurable rather than constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Granularity(u64);

impl Granularity {
    /// Half a second, the most common choice in the recorded data
    pub const HALF_SECOND: Granularity = Granularity(500_000);

    /// One second
    pub const ONE_SECOND: Granularity = Granularity(MICROS_PER_SEC);

    /// Create a granularity of `micros` microseconds. Zero is rejected.
    pub fn from_micros(micros: u64) -> PipelineResult<Self> {
        if micros == 0 {
            return Err(PipelineError::InvalidConfig("granularity must be non-zero"));
        }
        Ok(Self(micros))
    }

    /// Tick width in microseconds
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Round `t` to the nearest multiple of this granularity, half up.
    ///
    /// Idempotent: quantizing an already quantized timestamp is a no-op.
    pub fn quantize(&self, t: Timestamp) -> Timestamp {
        let g = self.0;
        // saturating: a timestamp within g/2 of u64::MAX rounds down
        let shifted = t.saturating_add(g / 2);
        (shifted / g) * g
    }
}

/// Source of current time for tagging outbound messages
pub trait TimeSource {
    /// Current timestamp in microseconds
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source backed by the system clock
#[derive(Debug, Clone, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as Timestamp
    }
}

/// Fixed time source for tests
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, micros: u64) {
        self.timestamp += micros;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}
