//! Unit normalization and rounding for chart-ready values

/// Decimal places kept for fractional outputs
pub const PERCENT_PRECISION: i32 = 2;

/// Megabytes per gigabyte
pub const MB_PER_GB: f64 = 1024.0;

/// Round half away from zero to `precision` decimal places
pub fn round_to(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}

/// Round to the nearest whole unit
pub fn round_whole(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.round() as i64)
}

/// Convert megabytes to whole gigabytes
pub fn mb_to_gb(mb: f64) -> Option<i64> {
    round_whole(mb / MB_PER_GB)
}

/// Rescale a 0-100 usage rate to a 0-1 fraction.
///
/// Values outside 0-100 are clamped after the x/100 mapping; non-finite
/// values count as unmeasured.
pub fn percent_to_fraction(rate: f64) -> Option<f64> {
    if !rate.is_finite() {
        return None;
    }

    let fraction = rate / 100.0;
    if !(0.0..=1.0).contains(&fraction) {
        tracing::debug!(rate, "Clamping out-of-range usage rate");
    }

    Some(round_to(fraction.clamp(0.0, 1.0), PERCENT_PRECISION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent_to_fraction(87.5), Some(0.88));
        assert_eq!(percent_to_fraction(90.0), Some(0.9));
        assert_eq!(percent_to_fraction(0.0), Some(0.0));
    }

    #[test]
    fn test_percent_clamped_to_unit_interval() {
        assert_eq!(percent_to_fraction(130.0), Some(1.0));
        assert_eq!(percent_to_fraction(-4.0), Some(0.0));
        assert_eq!(percent_to_fraction(f64::NAN), None);
    }

    #[test]
    fn test_percent_mapping_is_monotonic() {
        let mut previous = 0.0;
        for rate in 0..=100 {
            let fraction = percent_to_fraction(rate as f64).unwrap();
            assert!(fraction >= previous);
            previous = fraction;
        }
    }

    #[test]
    fn test_memory_to_gb() {
        assert_eq!(mb_to_gb(8192.0), Some(8));
        assert_eq!(mb_to_gb(1536.0), Some(2));
        assert_eq!(mb_to_gb(1000.0), Some(1));
        assert_eq!(mb_to_gb(0.0), Some(0));
    }

    #[test]
    fn test_round_whole() {
        assert_eq!(round_whole(3.4), Some(3));
        assert_eq!(round_whole(3.5), Some(4));
        assert_eq!(round_whole(f64::INFINITY), None);
    }
}
