//! Pipeline configuration
//!
//! Tolerance window, rounding granularity, stream set, and split ratio are
//! deliberately configuration rather than constants: the recorded source
//! material disagrees about the right values (0.5 s vs 1 s rounding, 20 %
//! vs 80 % test splits) with no documented rationale, so the pipeline takes
//! them as validated inputs.
//!
//! Both structs deserialize from JSON with serde and are validated through
//! [`AlignConfig::validate`] / [`TrainConfig::validate`] before use;
//! constructors that bypass validation do not exist outside this module.

use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};
use crate::record::StreamId;
use crate::time::Granularity;

/// Default tolerance window: 500 ms expressed in microseconds
pub const DEFAULT_TOLERANCE_US: u64 = 500_000;

/// Default minimum joined row count for training
pub const DEFAULT_MIN_ROWS: usize = 2;

/// Configuration for the time-aligned join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Maximum time difference, in microseconds, for two records to be
    /// considered aligned
    pub tolerance_us: u64,
    /// Optional quantization applied to every timestamp before joining
    pub granularity: Option<Granularity>,
    /// Stream whose timestamps define the output rows
    pub anchor: StreamId,
    /// Streams participating in the join, in row-schema order
    pub streams: Vec<StreamId>,
}

impl AlignConfig {
    /// The join used for training: all four streams, anchored on the IMU,
    /// half-second quantization
    pub fn training_default() -> Self {
        Self {
            tolerance_us: DEFAULT_TOLERANCE_US,
            granularity: Some(Granularity::HALF_SECOND),
            anchor: StreamId::AngularVelocity,
            streams: vec![
                StreamId::AngularVelocity,
                StreamId::IrLeft,
                StreamId::IrRight,
                StreamId::GroundSteering,
            ],
        }
    }

    /// The join used for batch replay: feature streams only, no target
    pub fn prediction_default() -> Self {
        Self {
            tolerance_us: DEFAULT_TOLERANCE_US,
            granularity: Some(Granularity::HALF_SECOND),
            anchor: StreamId::AngularVelocity,
            streams: vec![
                StreamId::AngularVelocity,
                StreamId::IrLeft,
                StreamId::IrRight,
            ],
        }
    }

    /// Check internal consistency, returning `self` for chaining.
    pub fn validate(self) -> PipelineResult<Self> {
        if self.tolerance_us == 0 {
            return Err(PipelineError::InvalidConfig("tolerance window must be non-zero"));
        }
        if self.streams.is_empty() {
            return Err(PipelineError::InvalidConfig("stream set must not be empty"));
        }
        if !self.streams.contains(&self.anchor) {
            return Err(PipelineError::InvalidConfig("anchor stream must be in the stream set"));
        }
        let mut seen = Vec::with_capacity(self.streams.len());
        for s in &self.streams {
            if seen.contains(s) {
                return Err(PipelineError::InvalidConfig("duplicate stream in stream set"));
            }
            seen.push(*s);
        }
        Ok(self)
    }
}

/// Configuration for an offline training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Join configuration; must include [`StreamId::GroundSteering`]
    pub align: AlignConfig,
    /// Fraction of joined rows held out for evaluation, in (0, 1)
    pub split_ratio: f32,
    /// Minimum joined row count; fewer rows aborts the run
    pub min_rows: usize,
    /// Seed for the deterministic train/test shuffle
    pub seed: u32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            align: AlignConfig::training_default(),
            split_ratio: 0.2,
            min_rows: DEFAULT_MIN_ROWS,
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// Check internal consistency, returning `self` for chaining.
    pub fn validate(self) -> PipelineResult<Self> {
        let align = self.align.validate()?;
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig("split ratio must lie in (0, 1)"));
        }
        if self.min_rows < DEFAULT_MIN_ROWS {
            return Err(PipelineError::InvalidConfig("min_rows below 2 makes a split meaningless"));
        }
        if !align.streams.contains(&StreamId::GroundSteering) {
            return Err(PipelineError::InvalidConfig("training requires the ground steering stream"));
        }
        Ok(Self { align, ..self })
    }
}
