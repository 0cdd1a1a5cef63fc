//! Rainflow cycle counting with Goodman mean-stress correction.
//!
//! Turning points are pushed onto a working stack. Whenever the three most recent points
//! A, B, C satisfy `|A - B| <= |B - C|`, the interval A-B is closed as a cycle and its
//! points are removed. Whatever is left on the stack once the input is exhausted is
//! emitted as residual half cycles.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{CountingConfig, CountingMethod};
use crate::error::{CycleError, CycleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    /// Closed by the three-point rule.
    Full,
    /// Residual (or starting-point) interval, weighted by `partial_cycle_weight`.
    Half,
}

/// One counted cycle, annotated with its Goodman-corrected ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cycle {
    pub range: f64,
    pub mean: f64,
    /// Range rescaled against the fixed-load margin `ultimate_load - |fixed_load_mean|`.
    pub goodman_range: f64,
    /// Range rescaled as if the fixed load mean were zero.
    pub goodman_zero_mean_range: f64,
    pub weight: f64,
    pub kind: CycleKind,
}

/// Incremental rainflow counter.
///
/// Cycles are kept in discovery order. A failed [`push`](Self::push) or
/// [`finish`](Self::finish) leaves every cycle counted before the failure in
/// [`cycles`](Self::cycles).
#[derive(Debug, Clone)]
pub struct RainflowCounter {
    ultimate_load: f64,
    load_margin: f64,
    partial_cycle_weight: f64,
    method: CountingMethod,
    stack: Vec<f64>,
    cycles: Vec<Cycle>,
    pushed: usize,
    discarded_full: usize,
    discarded_half: usize,
}

impl RainflowCounter {
    /// Creates a counter. Only the counting knobs of `config` are validated; `delta` is
    /// ignored.
    pub fn new(config: &CountingConfig) -> CycleResult<Self> {
        config.validate_counting()?;
        Ok(RainflowCounter {
            ultimate_load: config.ultimate_load,
            load_margin: config.ultimate_load - config.fixed_load_mean.abs(),
            partial_cycle_weight: config.partial_cycle_weight,
            method: config.method,
            stack: Vec::new(),
            cycles: Vec::new(),
            pushed: 0,
            discarded_full: 0,
            discarded_half: 0,
        })
    }

    /// Pushes the next turning point and collapses every cycle it closes.
    pub fn push(&mut self, value: f64) -> CycleResult<()> {
        if !value.is_finite() {
            return Err(CycleError::NonFiniteSample { index: self.pushed });
        }
        self.pushed += 1;
        self.stack.push(value);

        while let Some((a, b, c)) = self.top_three() {
            if (a - b).abs() > (b - c).abs() {
                break;
            }
            let len = self.stack.len();
            if self.method == CountingMethod::Astm && len == 3 {
                self.record(a, b, CycleKind::Half)?;
                self.stack.remove(0);
            } else {
                self.record(a, b, CycleKind::Full)?;
                self.stack.drain(len - 3..len - 1);
            }
        }
        Ok(())
    }

    /// Drains the remaining stack as residual half cycles.
    pub fn finish(&mut self) -> CycleResult<()> {
        let residual = std::mem::take(&mut self.stack);
        for pair in residual.windows(2) {
            self.record(pair[0], pair[1], CycleKind::Half)?;
        }
        debug!(
            turning_points = self.pushed,
            cycles = self.cycles.len(),
            residual = residual.len().saturating_sub(1),
            discarded = self.discarded(),
            "rainflow counting finished"
        );
        Ok(())
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn into_cycles(self) -> Vec<Cycle> {
        self.cycles
    }

    /// Unresolved turning points currently on the working stack.
    pub fn pending(&self) -> &[f64] {
        &self.stack
    }

    /// Number of zero-range cycles dropped so far.
    pub fn discarded(&self) -> usize {
        self.discarded_full + self.discarded_half
    }

    /// Number of turning-point intervals consumed by dropped zero-range cycles.
    ///
    /// A dropped full cycle consumes two intervals and a dropped half cycle one, so after
    /// [`finish`](Self::finish) `2 * full + half + discarded_intervals == pushed - 1`.
    pub fn discarded_intervals(&self) -> usize {
        2 * self.discarded_full + self.discarded_half
    }

    fn top_three(&self) -> Option<(f64, f64, f64)> {
        match self.stack[..] {
            [.., a, b, c] => Some((a, b, c)),
            _ => None,
        }
    }

    fn record(&mut self, p: f64, q: f64, kind: CycleKind) -> CycleResult<()> {
        let range = (p - q).abs();
        if !range.is_finite() {
            return Err(CycleError::Overflow {
                quantity: "range",
                from: p,
                to: q,
            });
        }
        if range == 0.0 {
            trace!(value = p, ?kind, "discarding zero-range interval");
            match kind {
                CycleKind::Full => self.discarded_full += 1,
                CycleKind::Half => self.discarded_half += 1,
            }
            return Ok(());
        }

        let mean = p / 2.0 + q / 2.0;
        let denominator = self.ultimate_load - mean.abs();
        if denominator == 0.0 {
            return Err(CycleError::DegenerateLoadMargin {
                mean,
                ultimate_load: self.ultimate_load,
            });
        }
        let goodman_range = range * (self.load_margin / denominator);
        let goodman_zero_mean_range = range * (self.ultimate_load / denominator);
        if !goodman_range.is_finite() || !goodman_zero_mean_range.is_finite() {
            return Err(CycleError::Overflow {
                quantity: "goodman range",
                from: p,
                to: q,
            });
        }
        let weight = match kind {
            CycleKind::Full => 1.0,
            CycleKind::Half => self.partial_cycle_weight,
        };
        self.cycles.push(Cycle {
            range,
            mean,
            goodman_range,
            goodman_zero_mean_range,
            weight,
            kind,
        });
        Ok(())
    }
}

/// Counts the cycles of an ordered turning-point sequence.
///
/// Fewer than two turning points yield no cycles.
///
/// # Examples
///
/// ```
/// use cyclecount::{count_cycles, CountingConfig};
///
/// let square = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
/// let cycles = count_cycles(&square, &CountingConfig::default()).unwrap();
/// assert_eq!(cycles.len(), 3);
/// assert!(cycles.iter().all(|c| c.range == 1.0 && c.weight == 1.0));
/// ```
pub fn count_cycles(turning_points: &[f64], config: &CountingConfig) -> CycleResult<Vec<Cycle>> {
    let mut counter = RainflowCounter::new(config)?;
    for &value in turning_points {
        counter.push(value)?;
    }
    counter.finish()?;
    Ok(counter.into_cycles())
}
