use float_cmp::ApproxEqRatio as _;

/// Largest relative difference at which two configuration parameters are still considered the same.
const CONFIG_RATIO_TOLERANCE: f64 = 1e-8;

/// Returns `true` if the two values are equal within a small relative tolerance.
///
/// Configuration parameters that went through a round of serialization, or were derived from one another, rarely
/// compare bit-for-bit equal. NaN is equal only to NaN.
pub fn float_eq(l_value: f64, r_value: f64) -> bool {
    if l_value.is_nan() || r_value.is_nan() {
        return l_value.is_nan() && r_value.is_nan();
    }

    l_value.approx_eq_ratio(&r_value, CONFIG_RATIO_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::float_eq;

    #[test]
    fn ratio_comparison() {
        assert!(float_eq(0.01, 0.01));
        assert!(float_eq(1e-9, 1e-9 * (1.0 + 1e-12)));
        assert!(!float_eq(0.01, 0.011));
        assert!(float_eq(f64::NAN, f64::NAN));
        assert!(!float_eq(f64::NAN, 1.0));
        assert!(!float_eq(1.0, f64::NAN));
    }
}
