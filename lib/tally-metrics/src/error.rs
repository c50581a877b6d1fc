use std::collections::TryReserveError;

use ddsketch::SketchError;
use snafu::Snafu;

/// Errors returned by aggregators to the metric pipeline.
///
/// None of these are retryable with the same inputs.
#[derive(Debug, PartialEq, Snafu)]
pub enum AggregatorError {
    /// Nothing was recorded, so there is nothing to estimate.
    #[snafu(display("No values recorded for instrument '{}'.", name))]
    EmptySketch {
        /// Name of the instrument.
        name: String,
    },

    /// The requested quantile was NaN or outside of `[0, 1]`.
    #[snafu(display("Quantile must be between 0.0 and 1.0 (inclusive), got {}.", quantile))]
    InvalidQuantile {
        /// The rejected quantile.
        quantile: f64,
    },

    /// The aggregators were built with sketch configurations that cannot be merged.
    #[snafu(display("Cannot merge aggregators for instrument '{}'.", name))]
    IncompatibleAggregator {
        /// Name of the instrument.
        name: String,

        /// Error source.
        source: SketchError,
    },

    /// The recorded value was NaN or infinite.
    #[snafu(display("Instrument '{}' recorded non-finite value {}.", name, value))]
    NonFiniteValue {
        /// Name of the instrument.
        name: String,

        /// The rejected value.
        value: f64,
    },

    /// The sketch failed to allocate while growing, and should no longer be used.
    #[snafu(display("Out of memory while updating sketch for instrument '{}'.", name))]
    OutOfMemory {
        /// Name of the instrument.
        name: String,

        /// Error source.
        source: TryReserveError,
    },

    /// Any other sketch failure.
    #[snafu(display("Sketch operation failed for instrument '{}'.", name))]
    Sketch {
        /// Name of the instrument.
        name: String,

        /// Error source.
        source: SketchError,
    },
}

impl AggregatorError {
    pub(crate) fn from_sketch(name: &str, error: SketchError) -> Self {
        let name = name.to_string();
        match error {
            SketchError::EmptySketch => Self::EmptySketch { name },
            SketchError::InvalidQuantile { quantile } => Self::InvalidQuantile { quantile },
            SketchError::IncompatibleSketch { .. } => Self::IncompatibleAggregator { name, source: error },
            SketchError::NonFiniteValue { value } => Self::NonFiniteValue { name, value },
            SketchError::OutOfMemory { source } => Self::OutOfMemory { name, source },
            source => Self::Sketch { name, source },
        }
    }
}
