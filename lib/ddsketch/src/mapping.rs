//! Logarithmic bucket mapping.

use crate::error::SketchError;

/// Maps positive values to bucket indices and back.
///
/// Bucket `k` covers the values in `(γ^(k-1), γ^k]`, where `γ = (1 + α) / (1 - α)` and `α` is the relative accuracy.
/// The representative value of a bucket, `2γ^k / (γ + 1)`, is within a factor of `1 ± α` of every value that maps to
/// it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketMapping {
    /// The base of the logarithm, determines bucket widths.
    gamma: f64,

    /// Precomputed `ln(gamma)`.
    gamma_ln: f64,

    /// Precomputed `1 / ln(gamma)`.
    multiplier: f64,

    relative_accuracy: f64,

    /// Smallest positive value whose index fits in an `i32`.
    min_indexable_value: f64,

    /// Largest value whose index fits in an `i32`, and whose representative value is finite.
    max_indexable_value: f64,
}

impl BucketMapping {
    /// Creates a new `BucketMapping` with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0.0 and 1.0 (exclusive), an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use ddsketch::BucketMapping;
    ///
    /// let mapping = BucketMapping::new(0.01).unwrap();
    /// let index = mapping.index(42.0);
    /// let estimate = mapping.value(index);
    /// assert!((estimate - 42.0).abs() <= 0.42);
    /// ```
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        if !(relative_accuracy > 0.0 && relative_accuracy < 1.0) {
            return Err(SketchError::InvalidRelativeAccuracy { relative_accuracy });
        }

        let gamma = (1.0 + relative_accuracy) / (1.0 - relative_accuracy);
        let gamma_ln = gamma.ln();

        // Keep one index of headroom on either side of the `i32` range, so that neither end saturates.
        let min_indexable_value = f64::MIN_POSITIVE.max(((f64::from(i32::MIN) + 1.0) * gamma_ln).exp());
        let max_indexable_value = ((f64::from(i32::MAX) - 1.0) * gamma_ln).exp().min(f64::MAX / gamma);

        Ok(Self {
            gamma,
            gamma_ln,
            multiplier: 1.0 / gamma_ln,
            relative_accuracy,
            min_indexable_value,
            max_indexable_value,
        })
    }

    /// Returns the index of the bucket holding the given positive value.
    ///
    /// `value` must be within [`min_indexable_value`][Self::min_indexable_value] and
    /// [`max_indexable_value`][Self::max_indexable_value]. Callers are expected to have already folded smaller
    /// magnitudes into the zero count, and rejected larger ones.
    #[inline]
    pub fn index(&self, value: f64) -> i32 {
        (value.ln() * self.multiplier).ceil() as i32
    }

    /// Returns the representative value of the bucket at the given index.
    #[inline]
    pub fn value(&self, index: i32) -> f64 {
        // `2γ^k / (γ + 1)`, in log space so the top bucket's value can't overflow.
        (f64::from(index) * self.gamma_ln - (0.5 * (self.gamma + 1.0)).ln()).exp()
    }

    /// Returns the exclusive lower bound of the bucket at the given index.
    pub fn lower_bound(&self, index: i32) -> f64 {
        ((f64::from(index) - 1.0) * self.gamma_ln).exp()
    }

    /// Returns the inclusive upper bound of the bucket at the given index.
    pub fn upper_bound(&self, index: i32) -> f64 {
        (f64::from(index) * self.gamma_ln).exp()
    }

    /// Returns the gamma value (base of the logarithm) of this mapping.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Returns the relative accuracy guaranteed by this mapping.
    pub fn relative_accuracy(&self) -> f64 {
        self.relative_accuracy
    }

    /// Returns the smallest positive value that can be indexed.
    pub fn min_indexable_value(&self) -> f64 {
        self.min_indexable_value
    }

    /// Returns the largest value that can be indexed.
    pub fn max_indexable_value(&self) -> f64 {
        self.max_indexable_value
    }
}
