//! Bounded retry on top of a quote provider.
//!
//! A one-off fetch failure must never cost an instrument its place in the
//! session. The scheduler therefore fetches through this helper, which
//! absorbs transient errors with a capped exponential backoff. The budget
//! is finite — a provider that stays down long enough exhausts it and the
//! session aborts through its normal teardown path instead of recursing
//! forever.

use std::time::Duration;

use super::provider::{QuoteError, QuoteProvider};

/// How long to keep absorbing transient fetch failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryBudget {
    /// No sleeping between attempts. For tests and zero-period sessions.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        // Exponential up to the cap; the exponent is clamped so the shift
        // cannot overflow for large budgets.
        let exp = attempt.min(16);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }
}

/// Fetch a quote, retrying transient failures until the budget runs out.
///
/// Non-transient errors (tripped breaker, unknown symbol) are returned
/// immediately; they will not get better by waiting.
pub fn fetch_patiently(
    provider: &dyn QuoteProvider,
    symbol: &str,
    budget: &RetryBudget,
) -> Result<f64, QuoteError> {
    let mut last_error: Option<QuoteError> = None;

    for attempt in 0..budget.max_attempts {
        if attempt > 0 {
            std::thread::sleep(budget.delay_for(attempt - 1));
        }

        match provider.fetch(symbol) {
            Ok(price) => return Ok(price),
            Err(e) if e.is_transient() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(QuoteError::RetriesExhausted {
        attempts: budget.max_attempts,
        last: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".into()),
    })
}
