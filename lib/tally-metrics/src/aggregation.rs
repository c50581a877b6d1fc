//! Aggregation kinds and the capabilities exporters read through.
//!
//! The metric pipeline does not care which concrete aggregator sits behind an instrument. It asks for the
//! [`AggregationKind`] and then reads through whichever narrow capability traits that kind supports: a sketch, for
//! example, supports every capability and so implements [`Distribution`].

use std::fmt;

use crate::error::AggregatorError;
use crate::number::Number;

/// The kind of aggregation an aggregator performs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AggregationKind {
    /// A running sum.
    Sum,

    /// Minimum, maximum, sum, and count, without quantiles.
    MinMaxSumCount,

    /// Counts over fixed bucket boundaries.
    Histogram,

    /// A relative-error quantile sketch.
    Sketch,
}

impl AggregationKind {
    /// Returns the tag used for this kind by exporters.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::MinMaxSumCount => "min_max_sum_count",
            Self::Histogram => "histogram",
            Self::Sketch => "sketch",
        }
    }

    /// Returns `true` if aggregations of this kind can answer quantile queries.
    pub const fn is_distribution(&self) -> bool {
        matches!(self, Self::Sketch)
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An aggregation of some kind.
pub trait Aggregation {
    /// Returns the kind of this aggregation.
    fn kind(&self) -> AggregationKind;
}

/// Sum of the values that were aggregated.
pub trait Sum {
    /// Returns the sum of the aggregated values, or zero if there were none.
    fn sum(&self) -> Result<Number, AggregatorError>;
}

/// Number of values that were aggregated.
pub trait Count {
    /// Returns the number of aggregated values.
    fn count(&self) -> Result<u64, AggregatorError>;
}

/// Extremes of the values that were aggregated.
pub trait MinMax {
    /// Returns the smallest aggregated value.
    fn min(&self) -> Result<Number, AggregatorError>;

    /// Returns the largest aggregated value.
    fn max(&self) -> Result<Number, AggregatorError>;
}

/// An exact or estimated quantile over the values that were aggregated.
pub trait Quantile {
    /// Returns the value at the given quantile, which must be in `[0, 1]`.
    fn quantile(&self, q: f64) -> Result<Number, AggregatorError>;
}

/// Everything needed to describe a distribution of values.
pub trait Distribution: Aggregation + Sum + Count + MinMax + Quantile {}

impl<T> Distribution for T where T: Aggregation + Sum + Count + MinMax + Quantile {}
