//! Synthetic quote provider — a seeded random walk per symbol.
//!
//! Used for developer/trial sessions and tests: no network, deterministic
//! for a given seed, and the walk is gentle enough to exercise the strategy
//! without instantly blowing through the exit buffer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

use super::provider::{QuoteError, QuoteProvider};

struct WalkState {
    rng: StdRng,
    prices: HashMap<String, f64>,
}

/// Random-walk quotes, independent per symbol, shared RNG stream.
pub struct SyntheticQuotes {
    state: Mutex<WalkState>,
    start_price: f64,
    step_pct: f64,
}

impl SyntheticQuotes {
    pub fn new(seed: u64, start_price: f64, step_pct: f64) -> Self {
        Self {
            state: Mutex::new(WalkState {
                rng: StdRng::seed_from_u64(seed),
                prices: HashMap::new(),
            }),
            start_price,
            step_pct,
        }
    }

    /// Walk starting at 100.0 with ±0.5% steps.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(seed, 100.0, 0.005)
    }
}

impl QuoteProvider for SyntheticQuotes {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str) -> Result<f64, QuoteError> {
        let mut state = self.state.lock().unwrap();
        let start = self.start_price;
        let current = *state.prices.entry(symbol.to_string()).or_insert(start);
        let step = state.rng.gen_range(-self.step_pct..=self.step_pct);
        let next = (current * (1.0 + step)).max(0.01);
        state.prices.insert(symbol.to_string(), next);
        Ok(next)
    }
}
