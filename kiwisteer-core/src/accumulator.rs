//! Online Sensor Accumulator
//!
//! ## Overview
//!
//! Live envelopes arrive one sensor at a time, in no guaranteed order: an
//! IMU reading here, a left-IR voltage there. The model, however, consumes
//! one complete feature vector. The accumulator sits between the two: it
//! collects the most recent raw value per required feature and reports the
//! moment every slot is filled.
//!
//! ## State machine
//!
//! ```text
//!          insert            insert (last slot)
//! Empty ──────────► Partial ───────────────────► Complete
//!   ▲                                                │
//!   └────────────────── take_complete ───────────────┘
//! ```
//!
//! - **Last-write-wins**: a second value for an already-set field simply
//!   overwrites it. No averaging, no cross-field ordering guarantee.
//! - **Exactly one fire per complete set**: `take_complete` returns the
//!   snapshot and resets every slot, so the same set can never be taken
//!   twice. A record arriving after the take starts a fresh cycle.
//! - Completeness is an explicit predicate over the fixed required-field
//!   set, not an implicit truthiness check; a legitimately zero-valued
//!   reading still counts as set.
//!
//! There is no timeout on the partial state: an accumulator that never
//! completes never fires. Prediction timing is therefore inherently tied
//! to bus arrival order, an accepted property of the design.

use crate::features::{FeatureSchema, MAX_FEATURES};
use crate::record::StreamRecord;

/// Observable accumulator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    /// No slots set
    Empty,
    /// Some but not all slots set
    Partial,
    /// Every required slot set; ready to take
    Complete,
}

/// Assembles a complete raw feature snapshot from partial sensor updates.
///
/// Owned exclusively by one online session; never shared across sessions.
pub struct OnlineAccumulator {
    schema: FeatureSchema,
    slots: heapless::Vec<Option<f32>, MAX_FEATURES>,
    filled: usize,
}

impl OnlineAccumulator {
    /// Create an all-unset accumulator for the given required-field schema
    pub fn new(schema: FeatureSchema) -> Self {
        let mut slots = heapless::Vec::new();
        for _ in 0..schema.len().min(MAX_FEATURES) {
            let _ = slots.push(None);
        }
        Self {
            schema,
            slots,
            filled: 0,
        }
    }

    /// The required-field schema this accumulator fills
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Set one field slot, last-write-wins. Fields outside the schema are
    /// ignored and reported as `false`.
    pub fn insert(&mut self, field: &str, value: f32) -> bool {
        match self.schema.position(field) {
            Some(i) => {
                if self.slots[i].is_none() {
                    self.filled += 1;
                }
                self.slots[i] = Some(value);
                true
            }
            None => false,
        }
    }

    /// Apply every field of a record, returning how many slots it touched.
    ///
    /// Fields outside the schema (e.g. ground steering arriving during a
    /// live session) are skipped, not errors: prediction-time streams
    /// legally overlap with training-only streams.
    pub fn apply_record(&mut self, record: &StreamRecord) -> usize {
        record
            .iter()
            .filter(|(name, value)| self.insert(name, *value))
            .count()
    }

    /// Explicit completeness predicate over the fixed required-field set
    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len() && !self.slots.is_empty()
    }

    /// Current state for observability
    pub fn state(&self) -> FillState {
        if self.filled == 0 {
            FillState::Empty
        } else if self.is_complete() {
            FillState::Complete
        } else {
            FillState::Partial
        }
    }

    /// Take the complete raw snapshot and reset all slots to unset.
    ///
    /// Returns `None` while any slot is unset. After a successful take the
    /// accumulator is empty, so one complete set fires exactly once.
    pub fn take_complete(&mut self) -> Option<Vec<Option<f32>>> {
        if !self.is_complete() {
            return None;
        }
        let snapshot = self.slots.iter().copied().collect();
        self.reset();
        Some(snapshot)
    }

    /// Clear all slots back to unset
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StreamId;

    fn feature_schema() -> FeatureSchema {
        FeatureSchema::for_streams(&[
            StreamId::AngularVelocity,
            StreamId::IrLeft,
            StreamId::IrRight,
        ])
    }

    fn angular(t: u64, x: f32, y: f32, z: f32) -> StreamRecord {
        StreamRecord::new(StreamId::AngularVelocity, t, &[x, y, z]).unwrap()
    }

    #[test]
    fn fires_only_after_all_five_fields() {
        let mut acc = OnlineAccumulator::new(feature_schema());

        acc.apply_record(&angular(1, 0.1, 0.2, 0.3));
        assert_eq!(acc.state(), FillState::Partial);
        assert!(acc.take_complete().is_none());

        acc.apply_record(&StreamRecord::new(StreamId::IrLeft, 2, &[0.5]).unwrap());
        assert!(acc.take_complete().is_none());

        acc.apply_record(&StreamRecord::new(StreamId::IrRight, 3, &[0.6]).unwrap());
        assert_eq!(acc.state(), FillState::Complete);

        let snapshot = acc.take_complete().unwrap();
        assert_eq!(
            snapshot,
            vec![Some(0.1), Some(0.2), Some(0.3), Some(0.5), Some(0.6)]
        );
        assert_eq!(acc.state(), FillState::Empty);
    }

    #[test]
    fn take_resets_and_next_record_starts_fresh_cycle() {
        let mut acc = OnlineAccumulator::new(feature_schema());
        acc.apply_record(&angular(1, 0.1, 0.2, 0.3));
        acc.apply_record(&StreamRecord::new(StreamId::IrLeft, 2, &[0.5]).unwrap());
        acc.apply_record(&StreamRecord::new(StreamId::IrRight, 3, &[0.6]).unwrap());
        assert!(acc.take_complete().is_some());

        // a sixth arrival begins a new cycle; the old IR values are gone
        acc.apply_record(&angular(4, 0.7, 0.8, 0.9));
        assert_eq!(acc.state(), FillState::Partial);
        assert!(acc.take_complete().is_none());
    }

    #[test]
    fn last_write_wins_before_completion() {
        let mut acc = OnlineAccumulator::new(feature_schema());
        acc.apply_record(&angular(1, 0.1, 0.2, 0.3));
        acc.apply_record(&angular(2, 1.1, 1.2, 1.3));
        acc.apply_record(&StreamRecord::new(StreamId::IrLeft, 3, &[0.5]).unwrap());
        acc.apply_record(&StreamRecord::new(StreamId::IrRight, 4, &[0.6]).unwrap());

        let snapshot = acc.take_complete().unwrap();
        assert_eq!(snapshot[0], Some(1.1));
    }

    #[test]
    fn zero_valued_reading_counts_as_set() {
        let mut acc = OnlineAccumulator::new(feature_schema());
        acc.apply_record(&angular(1, 0.0, 0.0, 0.0));
        acc.apply_record(&StreamRecord::new(StreamId::IrLeft, 2, &[0.0]).unwrap());
        acc.apply_record(&StreamRecord::new(StreamId::IrRight, 3, &[0.0]).unwrap());
        assert!(acc.is_complete());
    }

    #[test]
    fn out_of_schema_fields_are_skipped() {
        let mut acc = OnlineAccumulator::new(feature_schema());
        let steering = StreamRecord::new(StreamId::GroundSteering, 1, &[0.2]).unwrap();
        assert_eq!(acc.apply_record(&steering), 0);
        assert_eq!(acc.state(), FillState::Empty);
    }

    #[test]
    fn exactly_one_fire_per_cycle_for_every_arrival_order() {
        // all 3! orderings of the three contributing records
        let records = [
            angular(1, 0.1, 0.2, 0.3),
            StreamRecord::new(StreamId::IrLeft, 2, &[0.5]).unwrap(),
            StreamRecord::new(StreamId::IrRight, 3, &[0.6]).unwrap(),
        ];
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in orders {
            let mut acc = OnlineAccumulator::new(feature_schema());
            let mut fires = 0;
            // two full cycles in this arrival order
            for _ in 0..2 {
                for &i in &order {
                    acc.apply_record(&records[i]);
                    if acc.take_complete().is_some() {
                        fires += 1;
                    }
                }
            }
            assert_eq!(fires, 2, "order {order:?} must fire exactly once per cycle");
        }
    }
}
