//! Yahoo Finance live quote provider.
//!
//! Fetches the regular-market price from Yahoo's v8 chart API. Handles rate
//! limiting, retries with exponential backoff, response parsing, and the
//! circuit breaker. Yahoo has no official API and is subject to unannounced
//! format changes; the synthetic provider is the fallback for offline runs.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{QuoteError, QuoteProvider};

/// Yahoo Finance v8 chart API response, trimmed to the quote metadata.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

/// Live quote source backed by Yahoo Finance.
pub struct YahooQuotes {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooQuotes {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    fn chart_url(symbol: &str) -> String {
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?range=1d&interval=1m"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<f64, QuoteError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    QuoteError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    QuoteError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                QuoteError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::ResponseFormatChanged("result array is empty".into()))?;

        data.meta
            .regular_market_price
            .ok_or_else(|| QuoteError::NoPrice {
                symbol: symbol.to_string(),
            })
    }

    /// Execute a single quote request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, symbol: &str) -> Result<f64, QuoteError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(QuoteError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(QuoteError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        // IP ban: trip immediately, no point retrying.
                        self.circuit_breaker.trip();
                        return Err(QuoteError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(QuoteError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(QuoteError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        QuoteError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let price = Self::parse_response(symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(price);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(QuoteError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(QuoteError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| QuoteError::Other("max retries exceeded".into())))
    }
}

impl QuoteProvider for YahooQuotes {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str) -> Result<f64, QuoteError> {
        self.fetch_with_retry(symbol)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_json(body: &str) -> ChartResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn parses_regular_market_price() {
        let resp = chart_json(
            r#"{"chart":{"result":[{"meta":{"regularMarketPrice":187.44,"symbol":"AAPL"}}],"error":null}}"#,
        );
        let price = YahooQuotes::parse_response("AAPL", resp).unwrap();
        assert_eq!(price, 187.44);
    }

    #[test]
    fn missing_price_is_no_price_error() {
        let resp = chart_json(r#"{"chart":{"result":[{"meta":{}}],"error":null}}"#);
        let err = YahooQuotes::parse_response("AAPL", resp).unwrap_err();
        assert!(matches!(err, QuoteError::NoPrice { .. }));
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let resp = chart_json(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
        );
        let err = YahooQuotes::parse_response("NOPE", resp).unwrap_err();
        assert!(matches!(
            err,
            QuoteError::SymbolNotFound { symbol } if symbol == "NOPE"
        ));
    }

    #[test]
    fn other_provider_error_maps_to_format_changed() {
        let resp = chart_json(
            r#"{"chart":{"result":null,"error":{"code":"Internal","description":"boom"}}}"#,
        );
        let err = YahooQuotes::parse_response("AAPL", resp).unwrap_err();
        assert!(matches!(err, QuoteError::ResponseFormatChanged(_)));
    }

    #[test]
    fn tripped_breaker_blocks_fetch() {
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(60)));
        breaker.trip();
        let quotes = YahooQuotes::new(breaker);
        let err = quotes.fetch("AAPL").unwrap_err();
        assert!(matches!(err, QuoteError::CircuitBreakerTripped));
        assert!(!quotes.is_available());
    }
}
