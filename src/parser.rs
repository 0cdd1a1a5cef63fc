//! Reads signals from delimited text files (time column + value column).

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use cyclecount::config::InputConfig;
use cyclecount::Signal;

/// Reads the signal stored in `path` using the layout described by `input`.
pub fn read_signal<P: AsRef<Path>>(path: P, input: &InputConfig) -> Result<Signal> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_signal(file, input).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parses a signal from any reader.
///
/// The first `input.header` file lines are skipped and blank lines are ignored. Errors
/// name the file line they occurred on. Timestamps that are not numbers (dates, for
/// example) are replaced by the sample position.
pub fn parse_signal<R: Read>(mut reader: R, input: &InputConfig) -> Result<Signal> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let mut lines = LineIndex::new(&data);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(input.delimiter_byte())
        .from_reader(data.as_slice());

    let mut times = Vec::new();
    let mut values = Vec::new();
    let mut positional_times = 0usize;

    for record in reader.records() {
        let record = record.context("malformed record")?;
        let line = lines.line_at(record.position().map_or(0, |p| p.byte()));
        if line <= input.header as u64 || record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let value = field(&record, input.value_column, line)?
            .parse::<f64>()
            .map_err(|e| anyhow!("line {}: invalid value: {}", line, e))?;
        let time = match field(&record, input.time_column, line)?.parse::<f64>() {
            Ok(time) => time,
            Err(_) => {
                positional_times += 1;
                values.len() as f64
            }
        };
        times.push(time);
        values.push(value);
    }

    if positional_times > 0 {
        warn!(rows = positional_times, "non-numeric timestamps replaced by sample positions");
    }
    debug!(samples = values.len(), "parsed signal");
    Ok(Signal::new(times, values)?)
}

/// Maps record offsets to file lines.
///
/// A record's position is where the reader started looking for it, which is before any
/// blank lines it skipped on the way.
struct LineIndex<'a> {
    data: &'a [u8],
    offset: usize,
    line: u64,
}

impl<'a> LineIndex<'a> {
    fn new(data: &'a [u8]) -> Self {
        LineIndex {
            data,
            offset: 0,
            line: 1,
        }
    }

    /// Line of the first byte at or after `start` that is not a line terminator.
    /// Offsets must be passed in non-decreasing order.
    fn line_at(&mut self, start: u64) -> u64 {
        let mut start = (start as usize).clamp(self.offset, self.data.len());
        while matches!(self.data.get(start), Some(b'\r' | b'\n')) {
            start += 1;
        }
        self.line += self.data[self.offset..start]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u64;
        self.offset = start;
        self.line
    }
}

fn field(record: &StringRecord, column: usize, line: u64) -> Result<&str> {
    record
        .get(column)
        .map(str::trim)
        .ok_or_else(|| anyhow!("line {}: missing column {}", line, column))
}
