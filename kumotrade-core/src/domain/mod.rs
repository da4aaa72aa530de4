//! Domain types for kumotrade.

pub mod ledger;
pub mod position;

pub use ledger::{Ledger, LedgerEntry};
pub use position::{PositionState, TradeAction, TradeSide};

/// Symbol type alias
pub type Symbol = String;
