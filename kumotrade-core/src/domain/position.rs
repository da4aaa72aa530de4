//! Position state and trade direction types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a speculative trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Long,
    Short,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "LONG"),
            TradeSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Whether a ledger entry moved money out of (buy) or into (sell) the
/// trader's allotted capital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Per-instrument position state.
///
/// Legal transitions: Flat → Long, Flat → Short, Long → Flat, Short → Flat.
/// A side flip always passes through Flat; there is no direct Long ↔ Short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, PositionState::Short)
    }

    /// The open side, if any.
    pub fn side(&self) -> Option<TradeSide> {
        match self {
            PositionState::Flat => None,
            PositionState::Long => Some(TradeSide::Long),
            PositionState::Short => Some(TradeSide::Short),
        }
    }
}

impl From<TradeSide> for PositionState {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Long => PositionState::Long,
            TradeSide::Short => PositionState::Short,
        }
    }
}
