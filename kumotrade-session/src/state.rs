//! Durable session state — balance and carried positions.
//!
//! Read at session start and fully rewritten exactly once at teardown.
//! The on-disk shape is the legacy `user_info.json`:
//!
//! ```json
//! {
//!   "username": "trader",
//!   "account_balance": 10000.0,
//!   "stocks_to_sell": { "AAPL": { "buffer_price": 187.4 } },
//!   "stocks_to_buy_back": { "TSLA": { "buffer_price": 244.1 } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use kumotrade_core::domain::TradeSide;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("session state not found at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to access session state: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse session state: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("'{symbol}' appears in both stocks_to_sell and stocks_to_buy_back")]
    ConflictingCarryover { symbol: String },
}

/// A position carried across sessions; the stored price seeds the exit
/// buffer on restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarriedPosition {
    pub buffer_price: f64,
}

/// The whole durable state for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub username: String,
    pub account_balance: f64,
    /// Open longs to unwind: ticker → entry reference.
    #[serde(default)]
    pub stocks_to_sell: BTreeMap<String, CarriedPosition>,
    /// Open shorts to cover: ticker → entry reference.
    #[serde(default)]
    pub stocks_to_buy_back: BTreeMap<String, CarriedPosition>,
}

impl SessionState {
    pub fn new(username: impl Into<String>, account_balance: f64) -> Self {
        Self {
            username: username.into(),
            account_balance,
            stocks_to_sell: BTreeMap::new(),
            stocks_to_buy_back: BTreeMap::new(),
        }
    }

    /// Load and validate. A missing file is its own error so callers can
    /// distinguish "never initialised" from a broken disk.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Err(StateError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content)?;
        state.validate()?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// A ticker in both carry maps is unrecoverable: the same stock cannot
    /// be owed and owned.
    pub fn validate(&self) -> Result<(), StateError> {
        for symbol in self.stocks_to_sell.keys() {
            if self.stocks_to_buy_back.contains_key(symbol) {
                return Err(StateError::ConflictingCarryover {
                    symbol: symbol.clone(),
                });
            }
        }
        Ok(())
    }

    /// The carried side and buffer price for a symbol, if any.
    pub fn carried(&self, symbol: &str) -> Option<(TradeSide, f64)> {
        if let Some(pos) = self.stocks_to_sell.get(symbol) {
            return Some((TradeSide::Long, pos.buffer_price));
        }
        if let Some(pos) = self.stocks_to_buy_back.get(symbol) {
            return Some((TradeSide::Short, pos.buffer_price));
        }
        None
    }

    /// All carried symbols, longs first, each group in ticker order.
    pub fn carried_symbols(&self) -> Vec<(String, TradeSide, f64)> {
        self.stocks_to_sell
            .iter()
            .map(|(s, p)| (s.clone(), TradeSide::Long, p.buffer_price))
            .chain(
                self.stocks_to_buy_back
                    .iter()
                    .map(|(s, p)| (s.clone(), TradeSide::Short, p.buffer_price)),
            )
            .collect()
    }
}
