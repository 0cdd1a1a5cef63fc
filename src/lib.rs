// src/lib.rs
//! Rainflow cycle counting for battery state-of-charge (and any other load) signals.
//!
//! The pipeline is strictly one-directional: a [`Signal`] is reduced to turning points
//! by [`turning_points`], the turning points are reduced to cycles by [`rainflow`], and
//! [`aggregate`] composes both into a [`CycleSummary`] for stress-model evaluation.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub mod aggregate;
pub mod config;
pub mod error;
pub mod rainflow;
pub mod timeseries;
pub mod turning_points;

pub use aggregate::{aggregate, aggregate_batch, aggregate_values, CycleRecord, CycleSummary};
pub use config::{CountingConfig, CountingMethod};
pub use error::{CycleError, CycleResult};
pub use rainflow::{count_cycles, Cycle, CycleKind, RainflowCounter};
pub use timeseries::{Sample, Signal};
pub use turning_points::{extract_turning_points, turning_point_sequence, Extrema, TurningPoint};

// When the "wasm" feature is enabled, use wasm_bindgen to expose the counter to the host
// environment.
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn run_rainflow(turning_points: &[f64]) -> Result<Vec<f64>, JsValue> {
    let cycles = count_cycles(turning_points, &CountingConfig::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    // Flattened as [range, mean, weight] triples, one per cycle.
    Ok(cycles
        .iter()
        .flat_map(|c| [c.range, c.mean, c.weight])
        .collect())
}
