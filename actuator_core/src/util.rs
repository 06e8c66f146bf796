use std::time::Duration;

/// Scale `d` by `tenths / 10` without going through floating point.
#[inline]
pub fn scale_tenths(d: Duration, tenths: u32) -> Duration {
    d.saturating_mul(tenths) / 10
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn as_ms(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenths_scaling_is_exact() {
        let p = Duration::from_millis(312);
        assert_eq!(scale_tenths(p, 10), p);
        assert_eq!(scale_tenths(p, 1), Duration::from_micros(31_200));
        assert_eq!(scale_tenths(p, 25), Duration::from_millis(780));
    }

    #[test]
    fn as_ms_truncates() {
        assert_eq!(as_ms(Duration::from_micros(6_250)), 6);
    }
}
