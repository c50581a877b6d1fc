use std::collections::TryReserveError;

use snafu::Snafu;

use crate::config::SketchConfig;

/// Errors that can occur when configuring, updating, or querying a sketch.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SketchError {
    /// The relative accuracy was outside of `(0, 1)`.
    #[snafu(display(
        "Relative accuracy must be between 0.0 and 1.0 (exclusive), got {}.",
        relative_accuracy
    ))]
    InvalidRelativeAccuracy {
        /// The rejected relative accuracy.
        relative_accuracy: f64,
    },

    /// The bucket limit was too small to hold both positive and negative values.
    #[snafu(display("Maximum number of buckets must be at least 2, got {}.", max_num_buckets))]
    InvalidMaxNumBuckets {
        /// The rejected bucket limit.
        max_num_buckets: usize,
    },

    /// The minimum indexable value was not finite, or was too small to be indexed at the configured accuracy.
    #[snafu(display(
        "Minimum indexable value must be finite and at least {}, got {}.",
        smallest_indexable_value,
        min_indexable_value
    ))]
    InvalidMinIndexableValue {
        /// The rejected minimum indexable value.
        min_indexable_value: f64,

        /// Smallest value the configured relative accuracy can index.
        smallest_indexable_value: f64,
    },

    /// The sketch holds no values, so there is nothing to estimate.
    #[snafu(display("Sketch is empty."))]
    EmptySketch,

    /// The requested quantile was NaN or outside of `[0, 1]`.
    #[snafu(display("Quantile must be between 0.0 and 1.0 (inclusive), got {}.", quantile))]
    InvalidQuantile {
        /// The rejected quantile.
        quantile: f64,
    },

    /// The two sketches do not share the same relative accuracy and minimum indexable value.
    #[snafu(display("Sketches are not mergeable: {:?} vs {:?}.", ours, theirs))]
    IncompatibleSketch {
        /// Configuration of the destination sketch.
        ours: SketchConfig,

        /// Configuration of the source sketch.
        theirs: SketchConfig,
    },

    /// The value was NaN or infinite.
    #[snafu(display("Cannot add non-finite value {} to a sketch.", value))]
    NonFiniteValue {
        /// The rejected value.
        value: f64,
    },

    /// The value's magnitude was too large to be indexed at the configured accuracy.
    #[snafu(display(
        "Cannot add value {} to a sketch: magnitude exceeds the largest indexable value {}.",
        value,
        max_indexable_value
    ))]
    ValueOutOfRange {
        /// The rejected value.
        value: f64,

        /// Largest magnitude the sketch can index.
        max_indexable_value: f64,
    },

    /// Growing a bucket store failed to allocate.
    ///
    /// The sketch should not be used after this error is returned from a merge, as only part of the source may have
    /// been folded in.
    #[snafu(display("Failed to grow bucket store."))]
    OutOfMemory {
        /// Error source.
        source: TryReserveError,
    },
}
