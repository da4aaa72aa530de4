//! Indicator engine — rolling midpoint statistics and the Ichimoku cloud.

pub mod ichimoku;
pub mod midpoint;

pub use ichimoku::{CloudError, CloudSnapshot, IchimokuCloud, value_at};
pub use midpoint::rolling_midpoint;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
