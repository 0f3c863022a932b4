//! Sensor Stream Records
//!
//! ## Overview
//!
//! A [`StreamRecord`] is one timestamped observation from one sensor
//! stream: the angular velocity of the IMU, the voltage of the left or
//! right infrared distance sensor, or the recorded ground-truth steering
//! command. Records are the unit that flows into both the offline join and
//! the online accumulator, and they are immutable once constructed.
//!
//! ## Field schemas
//!
//! Every [`StreamId`] carries a fixed field schema, known at compile time.
//! Field names are *qualified*: the two IR sensors both report a `voltage`
//! column in the raw logs, so the qualified names (`ir_left.voltage`,
//! `ir_right.voltage`) disambiguate them the moment a record is built
//! rather than leaving the collision for the join to resolve.
//!
//! Construction is checked: a record whose field set does not exactly match
//! its stream's schema is a [`PipelineError::Schema`], raised where the bad
//! data entered the system instead of deep inside the aligner.

use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};
use crate::time::Timestamp;

/// Maximum number of fields any single stream carries
pub const MAX_STREAM_FIELDS: usize = 4;

/// Identifies one of the recorded sensor streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamId {
    /// IMU angular velocity, three axes
    AngularVelocity,
    /// Left infrared distance sensor
    IrLeft,
    /// Right infrared distance sensor
    IrRight,
    /// Ground-truth steering command (training target, offline only)
    GroundSteering,
}

impl StreamId {
    /// Qualified field names in schema order
    pub const fn fields(&self) -> &'static [&'static str] {
        match self {
            StreamId::AngularVelocity => {
                &["angular_velocity_x", "angular_velocity_y", "angular_velocity_z"]
            }
            StreamId::IrLeft => &["ir_left.voltage"],
            StreamId::IrRight => &["ir_right.voltage"],
            StreamId::GroundSteering => &["ground_steering"],
        }
    }

    /// Column names as they appear in the recorded CSV logs, in the same
    /// order as [`fields`](Self::fields)
    pub const fn raw_columns(&self) -> &'static [&'static str] {
        match self {
            StreamId::AngularVelocity => {
                &["angularVelocityX", "angularVelocityY", "angularVelocityZ"]
            }
            StreamId::IrLeft | StreamId::IrRight => &["voltage"],
            StreamId::GroundSteering => &["groundSteering"],
        }
    }

    /// Human-readable stream name
    pub const fn name(&self) -> &'static str {
        match self {
            StreamId::AngularVelocity => "angular_velocity",
            StreamId::IrLeft => "ir_left",
            StreamId::IrRight => "ir_right",
            StreamId::GroundSteering => "ground_steering",
        }
    }
}

/// One timestamped observation from a single stream.
///
/// Invariants, enforced at construction:
/// - `fields` holds exactly the stream's schema fields, in schema order
/// - all values are finite
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    stream: StreamId,
    timestamp: Timestamp,
    fields: heapless::Vec<f32, MAX_STREAM_FIELDS>,
}

impl StreamRecord {
    /// Build a record from values given in the stream's schema order.
    ///
    /// Fails with [`PipelineError::Schema`] when the value count does not
    /// match the schema, and rejects NaN/infinite values the same way since
    /// a non-finite reading can never satisfy its field.
    pub fn new(stream: StreamId, timestamp: Timestamp, values: &[f32]) -> PipelineResult<Self> {
        let schema = stream.fields();
        if values.len() != schema.len() {
            let field = schema.get(values.len()).copied().unwrap_or(schema[0]);
            return Err(PipelineError::Schema { stream, field });
        }
        let mut fields = heapless::Vec::new();
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(PipelineError::Schema {
                    stream,
                    field: schema[i],
                });
            }
            // capacity checked above against MAX_STREAM_FIELDS schemas
            let _ = fields.push(v);
        }
        Ok(Self {
            stream,
            timestamp,
            fields,
        })
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Values in schema order
    pub fn values(&self) -> &[f32] {
        &self.fields
    }

    /// Look up a value by qualified field name
    pub fn get(&self, field: &str) -> Option<f32> {
        self.stream
            .fields()
            .iter()
            .position(|&f| f == field)
            .map(|i| self.fields[i])
    }

    /// Iterate `(qualified_name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.stream
            .fields()
            .iter()
            .zip(self.fields.iter())
            .map(|(&name, &value)| (name, value))
    }
}

/// All records of one stream from one recording session
#[derive(Debug, Clone)]
pub struct StreamLog {
    /// Which stream these records belong to
    pub stream: StreamId,
    /// Records, not assumed sorted
    pub records: Vec<StreamRecord>,
}

impl StreamLog {
    pub fn new(stream: StreamId, records: Vec<StreamRecord>) -> Self {
        Self { stream, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
