//! Sketch aggregator.

#[cfg(not(feature = "loom"))]
use std::sync::{Mutex, MutexGuard};
use std::{ptr, sync::PoisonError};

use ddsketch::{DDSketch, SketchConfig};
#[cfg(feature = "loom")]
use loom::sync::{Mutex, MutexGuard};
use tracing::trace;

use crate::aggregation::{Aggregation, AggregationKind, Count, MinMax, Quantile, Sum};
use crate::descriptor::Descriptor;
use crate::error::AggregatorError;
use crate::number::Number;

/// Creates `count` aggregators for the given instrument, all sharing the same sketch configuration.
///
/// When no configuration is given, the sketch defaults are used: 1% relative accuracy, 2048 buckets, and a minimum
/// indexable value of `1e-9`.
pub fn new_aggregators(count: usize, descriptor: &Descriptor, config: Option<SketchConfig>) -> Vec<SketchAggregator> {
    let config = config.unwrap_or_default();
    (0..count).map(|_| SketchAggregator::new(descriptor, config)).collect()
}

/// A metric aggregator backed by a [`DDSketch`].
///
/// Producers record values with [`update`][Self::update] from any number of threads. Once per reporting cycle, a
/// collector calls [`snapshot_into`][Self::snapshot_into] to atomically swap the live sketch for an empty one, handing
/// the previous sketch to a snapshot aggregator. Snapshots can be folded together with
/// [`merge_from`][Self::merge_from] and are then read through the capability traits ([`Sum`], [`Count`], [`MinMax`],
/// [`Quantile`]), which narrow results back to the instrument's numeric kind.
///
/// Reading an aggregator that is still receiving updates is allowed, but the results only reflect whatever had been
/// recorded at the time of each call.
#[derive(Debug)]
pub struct SketchAggregator {
    descriptor: Descriptor,
    live: Mutex<DDSketch>,
}

impl SketchAggregator {
    /// Creates an empty `SketchAggregator` for the given instrument.
    pub fn new(descriptor: &Descriptor, config: SketchConfig) -> Self {
        Self {
            descriptor: descriptor.clone(),
            live: Mutex::new(DDSketch::new(config)),
        }
    }

    /// Returns the descriptor of the instrument this aggregator is attached to.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Returns the configuration of the sketch currently held.
    ///
    /// A snapshot destination takes on the configuration of whichever sketch was last swapped into it.
    pub fn config(&self) -> SketchConfig {
        *self.lock().config()
    }

    /// Records a value.
    ///
    /// The value is coerced to the descriptor's numeric kind and widened to `f64` before being added to the live
    /// sketch.
    ///
    /// # Errors
    ///
    /// If the value is not finite, or the sketch fails to allocate while growing, an error is returned. After an
    /// allocation failure, the aggregator should be discarded.
    pub fn update(&self, number: Number, descriptor: &Descriptor) -> Result<(), AggregatorError> {
        let value = descriptor.number_kind().to_f64(number);
        let result = self.lock().add(value);
        result.map_err(|e| AggregatorError::from_sketch(descriptor.name(), e))
    }

    /// Moves the live sketch into `dst`, leaving this aggregator with an empty sketch.
    ///
    /// Every update that completed before this call is visible in `dst` afterwards, and every update that starts after
    /// it lands in the new, empty sketch. Whatever `dst` held before is discarded, configuration included: `dst` ends
    /// up reporting this aggregator's configuration.
    pub fn snapshot_into(&self, dst: &SketchAggregator) {
        let previous = {
            let mut live = self.lock();
            // An empty sketch holds no buckets, so this doesn't allocate.
            let fresh = DDSketch::new(*live.config());
            std::mem::replace(&mut *live, fresh)
        };
        let count = previous.count();

        let stale = std::mem::replace(&mut *dst.lock(), previous);
        drop(stale);

        trace!(instrument = self.descriptor.name(), count, "Swapped live sketch into snapshot.");
    }

    /// Moves the live sketch into a new snapshot aggregator, leaving this aggregator with an empty sketch.
    pub fn snapshot(&self) -> SketchAggregator {
        let snapshot = SketchAggregator::new(&self.descriptor, self.config());
        self.snapshot_into(&snapshot);
        snapshot
    }

    /// Merges the contents of `other` into this aggregator.
    ///
    /// Merging an aggregator into itself doubles its contents.
    ///
    /// # Errors
    ///
    /// If the two aggregators' sketch configurations are not compatible, an error is returned and neither aggregator
    /// is changed. If the sketch fails to allocate while growing, an error is returned and this aggregator should be
    /// discarded.
    pub fn merge_from(&self, other: &SketchAggregator, descriptor: &Descriptor) -> Result<(), AggregatorError> {
        let result = if ptr::eq(self, other) {
            let mut live = self.lock();
            let copy = live.clone();
            live.merge(&copy)
        } else {
            // Always lock the lower address first.
            let (mut ours, theirs) = if (self as *const Self) < (other as *const Self) {
                let ours = self.lock();
                (ours, other.lock())
            } else {
                let theirs = other.lock();
                (self.lock(), theirs)
            };
            ours.merge(&theirs)
        };

        result.map_err(|e| AggregatorError::from_sketch(descriptor.name(), e))
    }

    /// Returns the average of the recorded values, narrowed to the instrument's numeric kind.
    ///
    /// # Errors
    ///
    /// If nothing has been recorded, an error is returned.
    pub fn avg(&self) -> Result<Number, AggregatorError> {
        let avg = self.lock().avg();
        self.narrow(avg)
    }

    /// Runs `f` against the underlying sketch.
    ///
    /// This is meant for exporters that need raw bucket access on a snapshot. The aggregator is locked for the
    /// duration of `f`, so `f` must not call back into this aggregator.
    pub fn with_snapshot<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&DDSketch) -> R,
    {
        f(&*self.lock())
    }

    fn narrow(&self, result: Result<f64, ddsketch::SketchError>) -> Result<Number, AggregatorError> {
        result
            .map(|value| self.descriptor.number_kind().from_f64(value))
            .map_err(|e| AggregatorError::from_sketch(self.descriptor.name(), e))
    }

    fn lock(&self) -> MutexGuard<'_, DDSketch> {
        // Sketch methods leave the sketch valid on every return path, so a poisoned sketch is still usable.
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Aggregation for SketchAggregator {
    fn kind(&self) -> AggregationKind {
        AggregationKind::Sketch
    }
}

impl Sum for SketchAggregator {
    fn sum(&self) -> Result<Number, AggregatorError> {
        let sum = self.lock().sum();
        Ok(self.descriptor.number_kind().from_f64(sum))
    }
}

impl Count for SketchAggregator {
    fn count(&self) -> Result<u64, AggregatorError> {
        Ok(self.lock().count())
    }
}

impl MinMax for SketchAggregator {
    fn min(&self) -> Result<Number, AggregatorError> {
        let min = self.lock().min();
        self.narrow(min)
    }

    fn max(&self) -> Result<Number, AggregatorError> {
        let max = self.lock().max();
        self.narrow(max)
    }
}

impl Quantile for SketchAggregator {
    fn quantile(&self, q: f64) -> Result<Number, AggregatorError> {
        let value = self.lock().quantile(q);
        self.narrow(value)
    }
}


#[cfg(all(test, feature = "loom"))]
mod loom_tests {
    use loom::sync::Arc;

    use super::*;
    use crate::number::NumberKind;

    #[test]
    fn snapshot_isolation() {
        // Two producers race a collector. Whatever the interleaving, every update lands in exactly one of the two
        // snapshots or the live sketch.
        loom::model(|| {
            let descriptor = Descriptor::new("loom", NumberKind::Float);
            let aggregator = Arc::new(SketchAggregator::new(&descriptor, SketchConfig::default()));

            let producers = (0..2)
                .map(|_| {
                    let aggregator = Arc::clone(&aggregator);
                    let descriptor = descriptor.clone();
                    loom::thread::spawn(move || {
                        aggregator.update(Number::Float(1.0), &descriptor).unwrap();
                    })
                })
                .collect::<Vec<_>>();

            let first = aggregator.snapshot();

            for producer in producers {
                producer.join().unwrap();
            }

            let second = aggregator.snapshot();
            let total = first.count().unwrap() + second.count().unwrap() + aggregator.count().unwrap();
            assert_eq!(total, 2);
            assert_eq!(aggregator.count().unwrap(), 0);
        });
    }
}
