//! Instrument lineup — who trades this session.
//!
//! Carried positions always get a trader (they must be unwound regardless
//! of today's screening), then fresh candidates fill the remaining slots.
//! Candidate discovery itself is an external concern behind the
//! `CandidateSource` contract; the config-backed source is the built-in
//! implementation.

use thiserror::Error;

use kumotrade_core::domain::TradeSide;
use kumotrade_core::quotes::QuoteProvider;

use crate::state::{SessionState, StateError};

#[derive(Debug, Error)]
pub enum LineupError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("candidate discovery failed: {0}")]
    Source(String),
}

/// Supplies the ordered candidate tickers for a session.
pub trait CandidateSource {
    fn candidates(&self) -> Result<Vec<String>, LineupError>;
}

/// Candidates straight from the config's ticker list.
pub struct ConfigCandidates {
    tickers: Vec<String>,
}

impl ConfigCandidates {
    pub fn new(tickers: Vec<String>) -> Self {
        Self { tickers }
    }
}

impl CandidateSource for ConfigCandidates {
    fn candidates(&self) -> Result<Vec<String>, LineupError> {
        Ok(self.tickers.clone())
    }
}

/// One slot in the session lineup.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentPlan {
    pub symbol: String,
    /// Position restored from the previous session, if any.
    pub carried: Option<(TradeSide, f64)>,
}

/// The lineup plus candidates that were dropped on the way.
#[derive(Debug, Clone)]
pub struct LineupReport {
    pub plans: Vec<InstrumentPlan>,
    /// (symbol, reason) pairs for candidates that failed screening.
    pub skipped: Vec<(String, String)>,
}

/// Candidate screening knobs.
#[derive(Debug, Clone, Copy)]
pub struct ScreenRules {
    /// Number of instruments to line up.
    pub focus: usize,
    /// Candidates quoting below this are dropped.
    pub penny_threshold: f64,
    /// Developer override: skip price screening entirely.
    pub dev_mode: bool,
}

/// Build the session lineup.
///
/// Fails fast on conflicting carryover — before any quote is fetched — and
/// otherwise never aborts on a bad candidate: screening failures are
/// recorded and skipped.
pub fn build_lineup(
    state: &SessionState,
    source: &dyn CandidateSource,
    quotes: &dyn QuoteProvider,
    rules: ScreenRules,
) -> Result<LineupReport, LineupError> {
    state.validate()?;

    let mut plans: Vec<InstrumentPlan> = state
        .carried_symbols()
        .into_iter()
        .map(|(symbol, side, buffer_price)| InstrumentPlan {
            symbol,
            carried: Some((side, buffer_price)),
        })
        .collect();
    let mut skipped = Vec::new();

    for symbol in source.candidates()? {
        if plans.len() >= rules.focus {
            break;
        }
        if plans.iter().any(|p| p.symbol == symbol) {
            continue;
        }

        if !rules.dev_mode {
            match quotes.fetch(&symbol) {
                Ok(price) if price < rules.penny_threshold => {
                    skipped.push((
                        symbol,
                        format!("price {price:.2} below threshold {:.2}", rules.penny_threshold),
                    ));
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    skipped.push((symbol, e.to_string()));
                    continue;
                }
            }
        }

        plans.push(InstrumentPlan {
            symbol,
            carried: None,
        });
    }

    Ok(LineupReport { plans, skipped })
}
