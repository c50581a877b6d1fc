//! Sketch-backed aggregators for a metrics pipeline.
//!
//! Instruments record [`Number`]s into a [`SketchAggregator`] from any number of threads. Once per reporting cycle, a
//! collector swaps each live aggregator's sketch into a snapshot with [`SketchAggregator::snapshot_into`], merges
//! snapshots as needed, and reads them back through the capability traits in [`aggregation`].
//!
//! ```
//! use tally_metrics::{new_aggregators, Count, Descriptor, Number, NumberKind, Quantile};
//!
//! let descriptor = Descriptor::new("request.latency", NumberKind::Float);
//! let mut aggregators = new_aggregators(2, &descriptor, None);
//! let snapshot = aggregators.pop().unwrap();
//! let live = aggregators.pop().unwrap();
//!
//! for ms in [12.0, 15.0, 230.0] {
//!     live.update(Number::Float(ms), &descriptor).unwrap();
//! }
//!
//! live.snapshot_into(&snapshot);
//! assert_eq!(snapshot.count().unwrap(), 3);
//! assert_eq!(live.count().unwrap(), 0);
//!
//! let p50 = snapshot.quantile(0.5).unwrap();
//! assert!((p50.as_f64() - 15.0).abs() <= 0.15);
//! ```
#![deny(warnings)]
#![deny(missing_docs)]

pub mod aggregation;
pub use self::aggregation::{Aggregation, AggregationKind, Count, Distribution, MinMax, Quantile, Sum};

mod aggregator;
pub use self::aggregator::{new_aggregators, SketchAggregator};

mod descriptor;
pub use self::descriptor::Descriptor;

mod error;
pub use self::error::AggregatorError;

mod number;
pub use self::number::{Number, NumberKind};

mod sharded;
pub use self::sharded::ShardedSketchAggregator;

pub use ddsketch::{SketchConfig, SketchError};
