//! A relative-error quantile sketch (DDSketch) for summarizing streams of floating-point measurements.
//!
//! A [`DDSketch`] answers quantile queries with a bounded relative error, tracks the exact count, sum, minimum, and
//! maximum of everything added, and can be merged with other sketches built from the same configuration. Memory use is
//! bounded by the configured number of buckets.
//!
//! # Quick Start
//!
//! ```
//! use ddsketch::{DDSketch, SketchConfig};
//!
//! // 1% relative accuracy, at most 2048 buckets, magnitudes below 1e-9 counted as zero.
//! let config = SketchConfig::new(0.01, 2048, 1e-9).unwrap();
//! let mut sketch = DDSketch::new(config);
//!
//! for value in [1.5, 2.5, 3.5] {
//!     sketch.add(value).unwrap();
//! }
//!
//! let p50 = sketch.quantile(0.5).unwrap();
//! let p99 = sketch.quantile(0.99).unwrap();
//! assert!(p50 <= p99);
//! ```
#![deny(warnings)]
#![deny(missing_docs)]

mod common;
pub use self::common::float_eq;

mod config;
pub use self::config::{
    SketchConfig, DEFAULT_MAX_NUM_BUCKETS, DEFAULT_MIN_INDEXABLE_VALUE, DEFAULT_RELATIVE_ACCURACY,
};

mod error;
pub use self::error::SketchError;

mod mapping;
pub use self::mapping::BucketMapping;

mod sketch;
pub use self::sketch::DDSketch;

mod store;
pub use self::store::{Bin, BucketStore};
