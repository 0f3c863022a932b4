//! Time-Aligned Multi-Stream Join
//!
//! ## Overview
//!
//! The four recorded streams are sampled by independent, unsynchronized
//! clocks at different cadences: the IMU near 100 Hz, the IR sensors near
//! 10 Hz, steering commands whenever the driver moved the wheel. A naive
//! equality join on timestamps matches almost nothing, so alignment is
//! tolerant: one stream is designated the *anchor*, its (optionally
//! quantized) timestamps define the output rows, and every other stream
//! contributes the value of its record nearest to the anchor timestamp
//! within a tolerance window τ.
//!
//! ```text
//! anchor   ──a────a────a────a──►  one candidate row per anchor record
//! ir_left  ─x──────x───────x───►  nearest within τ, else null
//! ir_right ───x───x─────x─────►
//! steering ─────x──────────x──►
//! ```
//!
//! ## Join modes
//!
//! - **Inner** (training): a row is emitted only when *every* configured
//!   stream has a match within τ; incomplete rows are dropped. The target
//!   column must exist for every training row, so this is the only mode
//!   the trainer uses.
//! - **Outer** (batch replay / prediction): every anchor record yields a
//!   row; unmatched fields stay null and downstream imputation decides.
//!
//! ## Determinism
//!
//! Streams are sorted by (quantized, raw) timestamp before matching, so
//! input order is irrelevant. When two candidates are equally near the
//! anchor, the earlier timestamp wins. Output rows are ascending by
//! timestamp and are never re-ordered downstream.

use crate::config::AlignConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::features::{FeatureSchema, RawRow};
use crate::record::{StreamId, StreamLog, StreamRecord};
use crate::time::Timestamp;

/// One output row of the join: an anchor timestamp plus one optional value
/// per field of the row schema.
///
/// Exactly one slot exists per requested field; a missing match is an
/// explicit `None`, never a dropped or duplicated column.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    /// Anchor timestamp (quantized when a granularity is configured)
    pub timestamp: Timestamp,
    /// Values in row-schema order
    pub values: RawRow,
}

/// Join mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinMode {
    /// Require all configured streams; drop incomplete rows
    Inner,
    /// Keep every anchor record; leave misses null
    Outer,
}

/// A stream's records keyed and sorted for matching
struct SortedStream<'a> {
    stream: StreamId,
    /// `(quantized_ts, raw_ts, record)` ascending by `(quantized, raw)`
    keyed: Vec<(Timestamp, Timestamp, &'a StreamRecord)>,
    /// Column offset of this stream's first field in the row schema
    offset: usize,
}

impl<'a> SortedStream<'a> {
    /// Index of the record nearest to `anchor` within `tolerance`,
    /// preferring the earlier timestamp on exact distance ties.
    fn nearest_within(&self, anchor: Timestamp, tolerance: u64) -> Option<&'a StreamRecord> {
        if self.keyed.is_empty() {
            return None;
        }
        let idx = self.keyed.partition_point(|(q, _, _)| *q < anchor);

        let before = idx.checked_sub(1).map(|i| &self.keyed[i]);
        let after = self.keyed.get(idx);

        let dist = |q: Timestamp| anchor.abs_diff(q);
        let best = match (before, after) {
            (Some(b), Some(a)) => {
                // earlier wins on a tie
                if dist(b.0) <= dist(a.0) {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        (dist(best.0) <= tolerance).then_some(best.2)
    }
}

/// Performs tolerant joins across independently sampled streams.
///
/// Construction validates the configuration; the row schema is the
/// concatenation of the configured streams' qualified fields in
/// configuration order.
pub struct TimeAligner {
    config: AlignConfig,
    schema: FeatureSchema,
}

impl TimeAligner {
    pub fn new(config: AlignConfig) -> PipelineResult<Self> {
        let config = config.validate()?;
        let schema = FeatureSchema::for_streams(&config.streams);
        Ok(Self { config, schema })
    }

    /// The row schema rows of this aligner follow
    pub fn row_schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Training-mode join: every configured stream must match within τ.
    ///
    /// Fails with [`PipelineError::EmptyStream`] when any configured stream
    /// has no records at all.
    pub fn inner_join(&self, logs: &[StreamLog]) -> PipelineResult<Vec<AlignedRow>> {
        self.join(logs, JoinMode::Inner)
    }

    /// Prediction-mode join: one row per anchor record, misses stay null.
    pub fn outer_join(&self, logs: &[StreamLog]) -> PipelineResult<Vec<AlignedRow>> {
        self.join(logs, JoinMode::Outer)
    }

    fn join(&self, logs: &[StreamLog], mode: JoinMode) -> PipelineResult<Vec<AlignedRow>> {
        let sorted = self.sort_streams(logs, mode)?;

        let anchor = sorted
            .iter()
            .find(|s| s.stream == self.config.anchor)
            // validated: anchor is always in the stream set
            .ok_or(PipelineError::EmptyStream {
                stream: self.config.anchor,
            })?;

        let mut rows = Vec::with_capacity(anchor.keyed.len());
        'anchors: for &(anchor_ts, _, anchor_rec) in &anchor.keyed {
            let mut values: RawRow = vec![None; self.schema.len()];

            for stream in &sorted {
                let matched = if stream.stream == self.config.anchor {
                    Some(anchor_rec)
                } else {
                    stream.nearest_within(anchor_ts, self.config.tolerance_us)
                };

                match matched {
                    Some(rec) => {
                        for (i, &v) in rec.values().iter().enumerate() {
                            values[stream.offset + i] = Some(v);
                        }
                    }
                    None if mode == JoinMode::Inner => continue 'anchors,
                    None => {}
                }
            }

            rows.push(AlignedRow {
                timestamp: anchor_ts,
                values,
            });
        }

        log::debug!(
            "{:?} join: {} anchor records -> {} rows",
            mode,
            anchor.keyed.len(),
            rows.len()
        );
        Ok(rows)
    }

    /// Collect, verify, quantize, and sort the configured streams.
    fn sort_streams<'a>(
        &self,
        logs: &'a [StreamLog],
        mode: JoinMode,
    ) -> PipelineResult<Vec<SortedStream<'a>>> {
        let mut sorted = Vec::with_capacity(self.config.streams.len());
        let mut offset = 0;

        for &stream in &self.config.streams {
            let mut keyed: Vec<(Timestamp, Timestamp, &StreamRecord)> = Vec::new();
            for log in logs.iter().filter(|l| l.stream == stream) {
                for rec in &log.records {
                    if rec.stream() != stream {
                        return Err(PipelineError::Schema {
                            stream,
                            field: stream.fields()[0],
                        });
                    }
                    let raw = rec.timestamp();
                    let q = match self.config.granularity {
                        Some(g) => g.quantize(raw),
                        None => raw,
                    };
                    keyed.push((q, raw, rec));
                }
            }

            if keyed.is_empty() && mode == JoinMode::Inner {
                return Err(PipelineError::EmptyStream { stream });
            }

            keyed.sort_by_key(|&(q, raw, _)| (q, raw));
            sorted.push(SortedStream {
                stream,
                keyed,
                offset,
            });
            offset += stream.fields().len();
        }

        for log in logs {
            if !self.config.streams.contains(&log.stream) {
                log::debug!("ignoring unconfigured stream {:?}", log.stream);
            }
        }

        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Granularity;

    fn rec(stream: StreamId, t: Timestamp, values: &[f32]) -> StreamRecord {
        StreamRecord::new(stream, t, values).unwrap()
    }

    fn feature_config(tolerance_us: u64) -> AlignConfig {
        AlignConfig {
            tolerance_us,
            granularity: None,
            anchor: StreamId::AngularVelocity,
            streams: vec![StreamId::AngularVelocity, StreamId::IrLeft, StreamId::IrRight],
        }
    }

    #[test]
    fn inner_join_aligns_jittered_streams() {
        // IR-left at t=1000000, IR-right at t=1000200, angular anchor at
        // t=1000100, tolerance 500us: one fully populated row at 1000100
        let aligner = TimeAligner::new(feature_config(500)).unwrap();
        let logs = vec![
            StreamLog::new(
                StreamId::AngularVelocity,
                vec![rec(StreamId::AngularVelocity, 1_000_100, &[0.1, 0.2, 0.3])],
            ),
            StreamLog::new(StreamId::IrLeft, vec![rec(StreamId::IrLeft, 1_000_000, &[0.5])]),
            StreamLog::new(StreamId::IrRight, vec![rec(StreamId::IrRight, 1_000_200, &[0.6])]),
        ];

        let rows = aligner.inner_join(&logs).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1_000_100);
        assert_eq!(
            rows[0].values,
            vec![Some(0.1), Some(0.2), Some(0.3), Some(0.5), Some(0.6)]
        );
    }

    #[test]
    fn inner_join_drops_rows_outside_tolerance() {
        // IR-right is 2s away with a 500us window: no complete row
        let aligner = TimeAligner::new(feature_config(500)).unwrap();
        let logs = vec![
            StreamLog::new(
                StreamId::AngularVelocity,
                vec![rec(StreamId::AngularVelocity, 1_000_100, &[0.1, 0.2, 0.3])],
            ),
            StreamLog::new(StreamId::IrLeft, vec![rec(StreamId::IrLeft, 1_000_000, &[0.5])]),
            StreamLog::new(
                StreamId::IrRight,
                vec![rec(StreamId::IrRight, 1_000_000 + 2_000_000, &[0.6])],
            ),
        ];

        let rows = aligner.inner_join(&logs).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn outer_join_keeps_anchor_rows_with_nulls() {
        let aligner = TimeAligner::new(feature_config(500)).unwrap();
        let logs = vec![
            StreamLog::new(
                StreamId::AngularVelocity,
                vec![rec(StreamId::AngularVelocity, 1_000_100, &[0.1, 0.2, 0.3])],
            ),
            StreamLog::new(StreamId::IrLeft, vec![rec(StreamId::IrLeft, 1_000_000, &[0.5])]),
            StreamLog::new(
                StreamId::IrRight,
                vec![rec(StreamId::IrRight, 3_000_000, &[0.6])],
            ),
        ];

        let rows = aligner.outer_join(&logs).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].values,
            vec![Some(0.1), Some(0.2), Some(0.3), Some(0.5), None]
        );
    }

    #[test]
    fn outer_join_tolerates_absent_streams() {
        // batch replay with only the IMU log on hand
        let aligner = TimeAligner::new(feature_config(500)).unwrap();
        let logs = vec![StreamLog::new(
            StreamId::AngularVelocity,
            vec![
                rec(StreamId::AngularVelocity, 1_000, &[0.1, 0.2, 0.3]),
                rec(StreamId::AngularVelocity, 2_000, &[0.4, 0.5, 0.6]),
            ],
        )];

        let rows = aligner.outer_join(&logs).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values[3], None);
        assert_eq!(rows[0].values[4], None);
    }

    #[test]
    fn inner_join_requires_nonempty_streams() {
        let aligner = TimeAligner::new(feature_config(500)).unwrap();
        let logs = vec![
            StreamLog::new(
                StreamId::AngularVelocity,
                vec![rec(StreamId::AngularVelocity, 1_000, &[0.1, 0.2, 0.3])],
            ),
            StreamLog::new(StreamId::IrLeft, vec![rec(StreamId::IrLeft, 1_000, &[0.5])]),
            StreamLog::new(StreamId::IrRight, vec![]),
        ];

        let err = aligner.inner_join(&logs).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::EmptyStream {
                stream: StreamId::IrRight
            }
        ));
    }

    #[test]
    fn nearest_match_wins_and_ties_pick_earlier() {
        let mut cfg = feature_config(1_000);
        cfg.streams = vec![StreamId::AngularVelocity, StreamId::IrLeft];
        let aligner = TimeAligner::new(cfg).unwrap();

        // candidates at 900 and 1100 are both 100us from the anchor at
        // 1000: the earlier one must win
        let logs = vec![
            StreamLog::new(
                StreamId::AngularVelocity,
                vec![rec(StreamId::AngularVelocity, 1_000, &[0.0, 0.0, 0.0])],
            ),
            StreamLog::new(
                StreamId::IrLeft,
                vec![
                    rec(StreamId::IrLeft, 1_100, &[0.9]),
                    rec(StreamId::IrLeft, 900, &[0.4]),
                ],
            ),
        ];

        let rows = aligner.inner_join(&logs).unwrap();
        assert_eq!(rows[0].values[3], Some(0.4));
    }

    #[test]
    fn quantization_gives_jittered_records_a_common_key() {
        let mut cfg = feature_config(0);
        cfg.tolerance_us = 1; // effectively exact match on quantized keys
        cfg.granularity = Some(Granularity::HALF_SECOND);
        cfg.streams = vec![StreamId::AngularVelocity, StreamId::GroundSteering];
        let aligner = TimeAligner::new(cfg).unwrap();

        // 1.4s and 1.6s both quantize to 1.5s
        let logs = vec![
            StreamLog::new(
                StreamId::AngularVelocity,
                vec![rec(StreamId::AngularVelocity, 1_400_000, &[0.1, 0.2, 0.3])],
            ),
            StreamLog::new(
                StreamId::GroundSteering,
                vec![rec(StreamId::GroundSteering, 1_600_000, &[0.25])],
            ),
        ];

        let rows = aligner.inner_join(&logs).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1_500_000);
        assert_eq!(rows[0].values[3], Some(0.25));
    }

    #[test]
    fn output_is_ascending_regardless_of_input_order() {
        let mut cfg = feature_config(100);
        cfg.streams = vec![StreamId::AngularVelocity];
        let aligner = TimeAligner::new(cfg).unwrap();

        let logs = vec![StreamLog::new(
            StreamId::AngularVelocity,
            vec![
                rec(StreamId::AngularVelocity, 3_000, &[0.3, 0.3, 0.3]),
                rec(StreamId::AngularVelocity, 1_000, &[0.1, 0.1, 0.1]),
                rec(StreamId::AngularVelocity, 2_000, &[0.2, 0.2, 0.2]),
            ],
        )];

        let rows = aligner.inner_join(&logs).unwrap();
        let timestamps: Vec<_> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);
    }
}
