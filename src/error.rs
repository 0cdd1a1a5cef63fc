//! Error types for turning-point extraction and cycle counting

use thiserror::Error;

/// Result type for cycle counting operations
pub type CycleResult<T> = Result<T, CycleError>;

/// Errors raised by the extractor, the counter and the aggregator.
///
/// Too-short input is not an error: both stages return empty results for it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    /// A configuration value is out of its valid domain
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// The Goodman correction is undefined because the cycle mean sits on the ultimate load
    #[error("degenerate load margin: cycle mean {mean} sits on ultimate load ±{ultimate_load}")]
    DegenerateLoadMargin { mean: f64, ultimate_load: f64 },

    /// Finite inputs produced a value that does not fit in an f64
    #[error("{quantity} overflows between turning points {from} and {to}")]
    Overflow {
        quantity: &'static str,
        from: f64,
        to: f64,
    },

    /// A NaN or infinite value reached the pipeline
    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    /// Time and value columns differ in length
    #[error("signal length mismatch: {times} timestamps, {values} values")]
    LengthMismatch { times: usize, values: usize },
}

impl CycleError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CycleError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejects the first NaN/infinite value of `values`.
pub(crate) fn ensure_finite(values: &[f64]) -> CycleResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(CycleError::NonFiniteSample { index }),
        None => Ok(()),
    }
}
