//! Contains the `Signal` struct, the time-ordered input of the cycle counting pipeline.

use serde::Serialize;

use crate::error::{CycleError, CycleResult};

/// One observation of the signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// An ordered sequence of (timestamp, value) samples.
///
/// Timestamps are expected to be non-decreasing. That is the caller's
/// responsibility: the core only consumes values and their positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signal {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl Signal {
    /// Builds a signal from a time column and a value column of equal length.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> CycleResult<Self> {
        if times.len() != values.len() {
            return Err(CycleError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        Ok(Signal { times, values })
    }

    /// Builds a signal whose timestamps are the sample positions.
    pub fn from_values(values: Vec<f64>) -> Self {
        let times = (0..values.len()).map(|i| i as f64).collect();
        Signal { times, values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            time: *self.times.get(index)?,
            value: *self.values.get(index)?,
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.times
            .iter()
            .zip(&self.values)
            .map(|(&time, &value)| Sample { time, value })
    }

    /// Arithmetic mean of every value; 0.0 for an empty signal.
    pub fn mean_level(&self) -> f64 {
        mean(&self.values)
    }

    /// Whether the timestamps never decrease.
    pub fn is_time_ordered(&self) -> bool {
        self.times.windows(2).all(|w| w[0] <= w[1])
    }
}

impl FromIterator<Sample> for Signal {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        let (times, values) = iter.into_iter().map(|s| (s.time, s.value)).unzip();
        Signal { times, values }
    }
}

/// Arithmetic mean that stays finite for finite values near the f64 limits.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|v| v / n).sum()
    }
}
