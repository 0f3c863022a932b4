//! Recorded Log File Reader
//!
//! ## Overview
//!
//! Recording sessions dump each sensor stream to its own semicolon-
//! separated CSV file. The first line is a header naming the columns;
//! every following line is one observation. This module reads one such
//! file into a [`StreamLog`], resolving columns *by header name* rather
//! than by position so that reordered or extended exports keep working.
//!
//! Required columns per file:
//!
//! - `sampleTimeStamp.seconds` and `sampleTimeStamp.microseconds`, which
//!   normalize into one microsecond [`Timestamp`](crate::time::Timestamp)
//! - the stream's own value columns ([`StreamId::raw_columns`])
//!
//! ## Error policy
//!
//! A missing required column is fatal (`Schema`): the whole file is
//! unusable. A malformed *data* line is not: it is skipped, counted in
//! [`ReaderStats`], and logged at warn level, matching how recorded logs
//! occasionally truncate their final line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{PipelineError, PipelineResult};
use crate::record::{StreamId, StreamLog, StreamRecord};
use crate::time::{self, Timestamp};

const SEPARATOR: char = ';';
const SECONDS_COLUMN: &str = "sampleTimeStamp.seconds";
const MICROS_COLUMN: &str = "sampleTimeStamp.microseconds";

/// Counters from one file read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Data lines seen (header excluded)
    pub lines: usize,
    /// Records successfully parsed
    pub records: usize,
    /// Malformed data lines skipped
    pub skipped: usize,
}

/// Column indices resolved from one header line
struct ColumnMap {
    seconds: usize,
    micros: usize,
    values: Vec<usize>,
}

impl ColumnMap {
    fn resolve(header: &str, stream: StreamId) -> PipelineResult<Self> {
        let columns: Vec<&str> = header.trim_end().split(SEPARATOR).collect();
        let find = |name: &'static str| -> PipelineResult<usize> {
            columns
                .iter()
                .position(|&c| c == name)
                .ok_or(PipelineError::Schema {
                    stream,
                    field: name,
                })
        };

        let seconds = find(SECONDS_COLUMN)?;
        let micros = find(MICROS_COLUMN)?;
        let mut values = Vec::with_capacity(stream.raw_columns().len());
        for &column in stream.raw_columns() {
            values.push(find(column)?);
        }
        Ok(Self {
            seconds,
            micros,
            values,
        })
    }
}

/// Parse one data line into a record; `None` means the line is malformed
fn parse_line(line: &str, map: &ColumnMap, stream: StreamId) -> Option<StreamRecord> {
    let cells: Vec<&str> = line.trim_end().split(SEPARATOR).collect();
    let width = map
        .values
        .iter()
        .copied()
        .chain([map.seconds, map.micros])
        .max()
        .unwrap_or(0);
    if cells.len() <= width {
        return None;
    }

    let seconds: u64 = cells[map.seconds].trim().parse().ok()?;
    let micros: u32 = cells[map.micros].trim().parse().ok()?;
    let timestamp: Timestamp = time::normalize(seconds, micros).ok()?;

    let mut values = heapless::Vec::<f32, { crate::record::MAX_STREAM_FIELDS }>::new();
    for &i in &map.values {
        let v: f32 = cells[i].trim().parse().ok()?;
        values.push(v).ok()?;
    }
    StreamRecord::new(stream, timestamp, &values).ok()
}

/// Read one stream's recorded log.
///
/// Returns the parsed log together with skip counters. The log's record
/// order is the file's line order; sorting is the aligner's job.
pub fn read_stream_log(path: &Path, stream: StreamId) -> PipelineResult<(StreamLog, ReaderStats)> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(PipelineError::Parse {
                line: 1,
                reason: "empty log file, expected a header line",
            })
        }
    };
    let map = ColumnMap::resolve(&header, stream)?;

    let mut stats = ReaderStats::default();
    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;
        match parse_line(&line, &map, stream) {
            Some(record) => {
                stats.records += 1;
                records.push(record);
            }
            None => {
                stats.skipped += 1;
                // header is line 1, first data line is line 2
                log::warn!(
                    "{}: skipping malformed line {}",
                    stream.name(),
                    i + 2
                );
            }
        }
    }

    log::info!(
        "{}: read {} records from {} ({} skipped)",
        stream.name(),
        stats.records,
        path.display(),
        stats.skipped
    );
    Ok((StreamLog::new(stream, records), stats))
}
