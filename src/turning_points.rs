//! Turning-point extraction with hysteresis.
//!
//! A candidate extremum is only confirmed once the signal has moved back by more than
//! `delta`, so reversals smaller than the threshold are treated as noise.

use serde::Serialize;
use tracing::debug;

use crate::config::validate_delta;
use crate::error::{ensure_finite, CycleResult};

/// A local extremum: its position in the original signal and its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurningPoint {
    pub index: usize,
    pub value: f64,
}

impl TurningPoint {
    fn new(index: usize, value: f64) -> Self {
        TurningPoint { index, value }
    }
}

/// Confirmed local maxima and minima, each in position order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extrema {
    pub maxima: Vec<TurningPoint>,
    pub minima: Vec<TurningPoint>,
}

impl Extrema {
    pub fn len(&self) -> usize {
        self.maxima.len() + self.minima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty() && self.minima.is_empty()
    }

    /// Maxima and minima merged into one sequence ordered by position.
    pub fn merged(&self) -> Vec<TurningPoint> {
        let mut merged: Vec<TurningPoint> =
            self.maxima.iter().chain(&self.minima).copied().collect();
        merged.sort_by_key(|tp| tp.index);
        merged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    Max,
    Min,
}

/// Extracts the local maxima and minima of `values`.
///
/// The first sample is never confirmed on its own; detection starts by looking for a
/// maximum and then alternates. Empty and single-sample input yield empty lists.
///
/// # Errors
///
/// `InvalidConfiguration` when `delta` is not a finite positive number, and
/// `NonFiniteSample` when `values` holds a NaN or an infinity.
///
/// # Examples
///
/// ```
/// use cyclecount::extract_turning_points;
///
/// let extrema = extract_turning_points(&[0.0, 1.0, 0.0, 1.0, 0.0], 0.5).unwrap();
/// assert_eq!(extrema.maxima.iter().map(|tp| tp.index).collect::<Vec<_>>(), vec![1, 3]);
/// assert_eq!(extrema.minima.iter().map(|tp| tp.index).collect::<Vec<_>>(), vec![2]);
/// ```
pub fn extract_turning_points(values: &[f64], delta: f64) -> CycleResult<Extrema> {
    validate_delta(delta)?;
    ensure_finite(values)?;

    let mut extrema = Extrema::default();
    let mut max = TurningPoint::new(0, f64::NEG_INFINITY);
    let mut min = TurningPoint::new(0, f64::INFINITY);
    let mut search = Search::Max;

    for (index, &value) in values.iter().enumerate() {
        if value > max.value {
            max = TurningPoint::new(index, value);
        }
        if value < min.value {
            min = TurningPoint::new(index, value);
        }

        match search {
            Search::Max if value < max.value - delta => {
                extrema.maxima.push(max);
                min = TurningPoint::new(index, value);
                search = Search::Min;
            }
            Search::Min if value > min.value + delta => {
                extrema.minima.push(min);
                max = TurningPoint::new(index, value);
                search = Search::Max;
            }
            _ => {}
        }
    }

    debug!(
        samples = values.len(),
        maxima = extrema.maxima.len(),
        minima = extrema.minima.len(),
        "extracted turning points"
    );
    Ok(extrema)
}

/// The alternating turning-point sequence fed to the rainflow counter.
///
/// Empty when no extremum is confirmed. Otherwise the merged extrema, bracketed by the
/// first and last samples of the signal unless an extremum already sits there.
pub fn turning_point_sequence(values: &[f64], delta: f64) -> CycleResult<Vec<TurningPoint>> {
    let mut sequence = extract_turning_points(values, delta)?.merged();

    let (Some(first), Some(last)) = (sequence.first().copied(), sequence.last().copied()) else {
        return Ok(sequence);
    };
    if first.index != 0 {
        sequence.insert(0, TurningPoint::new(0, values[0]));
    }
    let end = values.len() - 1;
    if last.index != end {
        sequence.push(TurningPoint::new(end, values[end]));
    }
    Ok(sequence)
}
