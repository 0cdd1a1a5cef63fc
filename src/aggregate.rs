//! Cycle aggregation: signal -> turning points -> rainflow cycles -> cycle table.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::{validate_scale, CountingConfig};
use crate::error::CycleResult;
use crate::rainflow::{count_cycles, Cycle};
use crate::timeseries::{mean, Signal};
use crate::turning_points::{turning_point_sequence, TurningPoint};

/// The `{range, mean, weight}` row handed to stress-model evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleRecord {
    pub range: f64,
    pub mean: f64,
    pub weight: f64,
}

/// Everything the pipeline derives from one signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    /// Arithmetic mean of the whole signal, not just of its turning points.
    pub mean_level: f64,
    pub turning_points: Vec<TurningPoint>,
    /// Cycles in discovery order.
    pub cycles: Vec<Cycle>,
}

impl CycleSummary {
    /// The cycle table with ranges and means multiplied by `scale`; weights are unchanged.
    pub fn table(&self, scale: f64) -> CycleResult<Vec<CycleRecord>> {
        validate_scale(scale)?;
        Ok(self
            .cycles
            .iter()
            .map(|c| CycleRecord {
                range: c.range * scale,
                mean: c.mean * scale,
                weight: c.weight,
            })
            .collect())
    }

    pub fn scaled_mean_level(&self, scale: f64) -> CycleResult<f64> {
        validate_scale(scale)?;
        Ok(self.mean_level * scale)
    }

    /// Returns a copy with the cycles in ascending range; equal ranges keep discovery order.
    pub fn sorted_by_range(&self) -> CycleSummary {
        let mut sorted = self.clone();
        sorted.cycles.sort_by(|a, b| a.range.total_cmp(&b.range));
        sorted
    }

    /// Sum of the cycle weights, i.e. the number of equivalent full cycles.
    pub fn total_weight(&self) -> f64 {
        self.cycles.iter().map(|c| c.weight).sum()
    }
}

/// Runs the whole pipeline on one signal.
///
/// # Examples
///
/// ```
/// use cyclecount::{aggregate, CountingConfig, Signal};
///
/// let signal = Signal::from_values(vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
/// let summary = aggregate(&signal, &CountingConfig::with_delta(0.5)).unwrap();
/// assert_eq!(summary.turning_points.len(), 7);
/// assert_eq!(summary.cycles.len(), 3);
/// assert_eq!(summary.total_weight(), 3.0);
/// ```
pub fn aggregate(signal: &Signal, config: &CountingConfig) -> CycleResult<CycleSummary> {
    aggregate_values(signal.values(), config)
}

/// Same as [`aggregate`] for callers holding only the values.
pub fn aggregate_values(values: &[f64], config: &CountingConfig) -> CycleResult<CycleSummary> {
    config.validate()?;

    let turning_points = turning_point_sequence(values, config.delta)?;
    let extremes: Vec<f64> = turning_points.iter().map(|tp| tp.value).collect();
    let cycles = count_cycles(&extremes, config)?;
    let mean_level = mean(values);

    debug!(
        samples = values.len(),
        turning_points = turning_points.len(),
        cycles = cycles.len(),
        mean_level,
        "aggregated signal"
    );
    Ok(CycleSummary {
        mean_level,
        turning_points,
        cycles,
    })
}

/// Aggregates independent signals in parallel.
///
/// Results keep the order of `signals`; each one succeeds or fails on its own.
pub fn aggregate_batch(
    signals: &[Signal],
    config: &CountingConfig,
) -> Vec<CycleResult<CycleSummary>> {
    signals
        .par_iter()
        .map(|signal| aggregate(signal, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CycleError;
    use crate::rainflow::CycleKind;
    use approx::assert_relative_eq;

    fn soc_profile() -> Vec<f64> {
        // Charge to 90 %, shallow cycling around 70 %, discharge to 20 %, partial recharge.
        vec![
            50.0, 70.0, 90.0, 80.0, 70.0, 75.0, 80.0, 65.0, 60.0, 70.0, 40.0, 20.0, 30.0, 45.0,
            40.0,
        ]
    }

    #[test]
    fn test_square_wave_scenario() {
        let signal = Signal::from_values(vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let summary = aggregate(&signal, &CountingConfig::with_delta(0.5)).unwrap();
        assert_eq!(summary.turning_points.len(), 7);
        assert_eq!(summary.cycles.len(), 3);
        for cycle in &summary.cycles {
            assert_eq!(cycle.kind, CycleKind::Full);
            assert_relative_eq!(cycle.range, 1.0);
            assert_relative_eq!(cycle.mean, 0.5);
            assert_relative_eq!(cycle.weight, 1.0);
        }
        assert_relative_eq!(summary.mean_level, 3.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_soc_profile() {
        let signal = Signal::from_values(soc_profile());
        let summary = aggregate(&signal, &CountingConfig::with_delta(1.0)).unwrap();

        let values: Vec<f64> = summary.turning_points.iter().map(|tp| tp.value).collect();
        assert_eq!(values, vec![50.0, 90.0, 70.0, 80.0, 60.0, 70.0, 20.0, 45.0, 40.0]);

        let ranges: Vec<(f64, CycleKind)> =
            summary.cycles.iter().map(|c| (c.range, c.kind)).collect();
        assert_eq!(
            ranges,
            vec![
                (10.0, CycleKind::Full),
                (10.0, CycleKind::Full),
                (40.0, CycleKind::Full),
                (25.0, CycleKind::Half),
                (5.0, CycleKind::Half),
            ]
        );
        assert_relative_eq!(summary.total_weight(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(summary.mean_level, 59.0, epsilon = 1e-9);
    }

    #[test]
    fn test_table_scaling_and_sorting() {
        let signal = Signal::from_values(soc_profile());
        let summary = aggregate(&signal, &CountingConfig::with_delta(1.0)).unwrap();
        let sorted = summary.sorted_by_range();

        let ranges: Vec<f64> = sorted.cycles.iter().map(|c| c.range).collect();
        assert_eq!(ranges, vec![5.0, 10.0, 10.0, 25.0, 40.0]);
        assert_eq!(sorted.cycles.len(), summary.cycles.len());

        let table = sorted.table(0.01).unwrap();
        assert_relative_eq!(table[0].range, 0.05, epsilon = 1e-12);
        assert_relative_eq!(table[3].range, 0.25, epsilon = 1e-12);
        assert_relative_eq!(table[3].weight, 0.5);
        assert_relative_eq!(table[4].weight, 1.0);
        assert_relative_eq!(
            sorted.scaled_mean_level(0.01).unwrap(),
            summary.mean_level / 100.0,
            epsilon = 1e-12
        );

        assert!(summary.table(0.0).is_err());
        assert!(summary.table(f64::NAN).is_err());
        assert!(matches!(
            summary.table(-0.01),
            Err(CycleError::InvalidConfiguration { field: "scale", .. })
        ));
        assert!(summary.scaled_mean_level(-1.0).is_err());
    }

    #[test]
    fn test_degenerate_signals() {
        let config = CountingConfig::default();
        let empty = aggregate(&Signal::default(), &config).unwrap();
        assert_eq!(empty, CycleSummary::default());

        let flat = aggregate(&Signal::from_values(vec![3.0; 20]), &config).unwrap();
        assert!(flat.turning_points.is_empty());
        assert!(flat.cycles.is_empty());
        assert_relative_eq!(flat.mean_level, 3.0);

        let monotonic: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let summary = aggregate_values(&monotonic, &CountingConfig::with_delta(20.0)).unwrap();
        assert!(summary.turning_points.is_empty());
        assert!(summary.cycles.is_empty());
    }

    #[test]
    fn test_values_near_f64_limits() {
        let config = CountingConfig::with_delta(1.0);
        let summary = aggregate_values(&[f64::MAX, f64::MAX, 0.0], &config).unwrap();
        assert!(summary.mean_level.is_finite());
        assert_relative_eq!(summary.mean_level, 2.0 * (f64::MAX / 3.0), max_relative = 1e-12);
        assert_eq!(summary.cycles.len(), 1);
        assert_eq!(summary.cycles[0].range, f64::MAX);

        assert!(matches!(
            aggregate_values(&[f64::MAX, -f64::MAX, f64::MAX], &config),
            Err(CycleError::Overflow { .. })
        ));
    }

    #[test]
    fn test_validates_eagerly() {
        let signal = Signal::from_values(soc_profile());
        assert!(matches!(
            aggregate(&signal, &CountingConfig::with_delta(0.0)),
            Err(CycleError::InvalidConfiguration { field: "delta", .. })
        ));
        let config = CountingConfig {
            ultimate_load: -1.0,
            ..Default::default()
        };
        assert!(aggregate(&signal, &config).is_err());
    }

    #[test]
    fn test_degenerate_load_margin_propagates() {
        let config = CountingConfig {
            delta: 1.0,
            ultimate_load: 10.0,
            ..Default::default()
        };
        let signal = Signal::from_values(vec![0.0, 20.0, 0.0]);
        assert!(matches!(
            aggregate(&signal, &config),
            Err(CycleError::DegenerateLoadMargin { .. })
        ));
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let signals = vec![
            Signal::from_values(soc_profile()),
            Signal::from_values(vec![0.0, 20.0, 0.0]),
            Signal::from_values(vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        ];
        let config = CountingConfig {
            delta: 0.5,
            ultimate_load: 10.0,
            ..Default::default()
        };
        let results = aggregate_batch(&signals, &config);
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().cycles.len(), 3);
        assert_eq!(results[0], aggregate(&signals[0], &config));
    }
}
