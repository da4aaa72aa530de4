//! Rolling midpoint-of-range — the statistic behind every Ichimoku line.

/// Midpoint of the price range, `(max + min) / 2`, over each `period`-long
/// sub-window of `prices`.
///
/// Produces `prices.len() - period` values; output `i` covers
/// `prices[i..i + period]`. The newest observation only enters the last
/// sub-window one round after it arrives.
pub fn rolling_midpoint(prices: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "midpoint period must be >= 1");
    if prices.len() < period {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(prices.len() - period);
    for i in 0..prices.len() - period {
        let window = &prices[i..i + period];
        let mut max_val = f64::NEG_INFINITY;
        let mut min_val = f64::INFINITY;
        for &p in window {
            if p > max_val {
                max_val = p;
            }
            if p < min_val {
                min_val = p;
            }
        }
        result.push((max_val + min_val) / 2.0);
    }
    result
}
