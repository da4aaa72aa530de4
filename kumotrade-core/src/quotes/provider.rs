//! Quote provider trait and structured error types.
//!
//! The `QuoteProvider` trait abstracts over live quote sources (Yahoo
//! Finance, synthetic random walk) so the scheduler can swap implementations
//! and tests can run without a network.

use thiserror::Error;

/// Structured error types for quote operations.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no market price in quote for {symbol}")]
    NoPrice { symbol: String },

    #[error("hard stop: quote provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("retry budget exhausted after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("quote error: {0}")]
    Other(String),
}

impl QuoteError {
    /// Whether retrying the same request can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QuoteError::NetworkUnreachable(_)
                | QuoteError::RateLimited { .. }
                | QuoteError::Other(_)
        )
    }
}

/// Trait for live quote sources.
///
/// Implementations handle the specifics of fetching one quote for one
/// symbol. Retry policy sits above this trait — providers report each
/// failure and let the caller decide.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the current price for a symbol.
    fn fetch(&self, symbol: &str) -> Result<f64, QuoteError>;

    /// Check if the provider is currently available (not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(QuoteError::NetworkUnreachable("dns".into()).is_transient());
        assert!(QuoteError::RateLimited {
            retry_after_secs: 10
        }
        .is_transient());
        assert!(!QuoteError::CircuitBreakerTripped.is_transient());
        assert!(!QuoteError::SymbolNotFound {
            symbol: "XYZ".into()
        }
        .is_transient());
    }
}
