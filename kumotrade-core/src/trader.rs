//! Per-instrument trader — price window, position state machine, ledger.
//!
//! One `Trader` owns everything for one symbol. The scheduler feeds it a
//! quote per round; the trader updates its window, recomputes the cloud,
//! and walks the entry/exit rules. Entries are evaluated before exits, so
//! a position opened this round can be stopped out in the same round if the
//! quote already sits outside the buffer.

use chrono::NaiveTime;

use crate::domain::{Ledger, PositionState, Symbol, TradeAction, TradeSide};
use crate::indicators::{CloudError, CloudSnapshot, IchimokuCloud};
use crate::window::PriceWindow;

/// Per-trader strategy parameters.
#[derive(Debug, Clone, Copy)]
pub struct TraderConfig {
    /// Price window capacity (`W`).
    pub window: usize,
    /// Exit buffer as a fraction of the entry price.
    pub buffer_pct: f64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            window: 80,
            buffer_pct: 0.06,
        }
    }
}

/// Non-fatal conditions raised while evaluating a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraderAlert {
    /// A long entry fired but the quote exceeds the remaining capital.
    OutOfCash,
    /// The deviation stop fired on a short but there is not enough capital
    /// to buy the position back. The short stays open.
    StuckShort,
}

/// One executed buy or sell, as reported to the session observer.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub symbol: Symbol,
    pub time: NaiveTime,
    pub action: TradeAction,
    pub side: TradeSide,
    pub price: f64,
}

/// Everything a single round produced for one trader.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub snapshot: CloudSnapshot,
    pub events: Vec<TradeEvent>,
    pub alerts: Vec<TraderAlert>,
}

/// A single instrument's window, position and capital.
///
/// Capital is this trader's own copy of the session pool; traders never
/// share or deplete a common balance at runtime. Settlement reconciles the
/// copies at teardown.
#[derive(Debug, Clone)]
pub struct Trader {
    symbol: Symbol,
    window: PriceWindow,
    state: PositionState,
    reference_price: f64,
    capital: f64,
    ledger: Ledger,
    buffer_pct: f64,
}

impl Trader {
    /// A trader starting flat.
    pub fn new(symbol: impl Into<Symbol>, capital: f64, config: TraderConfig) -> Self {
        Self {
            symbol: symbol.into(),
            window: PriceWindow::new(config.window),
            state: PositionState::Flat,
            reference_price: 0.0,
            capital,
            ledger: Ledger::new(),
            buffer_pct: config.buffer_pct,
        }
    }

    /// A trader carrying a position over from the previous session. The
    /// buffer price restored from disk becomes the exit-buffer reference.
    pub fn restored(
        symbol: impl Into<Symbol>,
        capital: f64,
        side: TradeSide,
        buffer_price: f64,
        config: TraderConfig,
    ) -> Self {
        let mut trader = Self::new(symbol, capital, config);
        trader.state = side.into();
        trader.reference_price = buffer_price;
        trader
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn reference_price(&self) -> f64 {
        self.reference_price
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_warm(&self) -> bool {
        self.window.is_warm()
    }

    /// Warm-up: absorb one quote without evaluating the strategy.
    pub fn observe(&mut self, price: f64) {
        self.window.push(price);
    }

    /// Trading: absorb one quote, recompute the cloud, and walk the
    /// entry/exit rules.
    pub fn advance_round(
        &mut self,
        price: f64,
        now: NaiveTime,
    ) -> Result<RoundOutcome, CloudError> {
        self.window.push(price);
        let cloud = IchimokuCloud::compute(&self.window);
        let snapshot = cloud.snapshot(self.window.current_coord(), price)?;

        let mut events = Vec::new();
        let mut alerts = Vec::new();

        // Green cloud with price on or above it: strong bullish signal.
        let bullish = snapshot.senkou_a > snapshot.senkou_b && price >= snapshot.senkou_a;
        // Red cloud with price on or below it: strong bearish signal.
        let bearish = snapshot.senkou_a < snapshot.senkou_b && price <= snapshot.senkou_a;

        // Entries. Only a flat trader may open; a side flip has to pass
        // through an exit first.
        if bullish && self.state.is_flat() {
            if self.has_capital(price) {
                self.buy(price, TradeSide::Long, now, &mut events);
                self.state = PositionState::Long;
                self.reference_price = price;
            } else {
                alerts.push(TraderAlert::OutOfCash);
            }
        }
        if bearish && self.state.is_flat() {
            self.sell(price, TradeSide::Short, now, &mut events);
            self.state = PositionState::Short;
            self.reference_price = price;
        }

        // Deviation stop: exit once the quote drifts from the slow baseline
        // by more than the buffer, in either direction. Boundary inclusive.
        let buffer = self.reference_price * self.buffer_pct;
        let stopped = (price - snapshot.kijun).abs() >= buffer;

        if self.state.is_long() && stopped {
            self.sell(price, TradeSide::Long, now, &mut events);
            self.state = PositionState::Flat;
        }
        if self.state.is_short() && stopped {
            if self.has_capital(price) {
                self.buy(price, TradeSide::Short, now, &mut events);
                self.state = PositionState::Flat;
            } else {
                alerts.push(TraderAlert::StuckShort);
            }
        }

        Ok(RoundOutcome {
            snapshot,
            events,
            alerts,
        })
    }

    /// The open position to carry into the next session, if any.
    pub fn carryover(&self) -> Option<(TradeSide, f64)> {
        self.state.side().map(|side| (side, self.reference_price))
    }

    /// Net capital movement relative to the pool this trader was allotted.
    pub fn net_delta(&self, allotted: f64) -> f64 {
        self.capital - allotted
    }

    fn has_capital(&self, price: f64) -> bool {
        price < self.capital
    }

    fn buy(&mut self, price: f64, side: TradeSide, now: NaiveTime, events: &mut Vec<TradeEvent>) {
        self.capital -= price;
        self.ledger.record(now, TradeAction::Buy, side, price);
        events.push(TradeEvent {
            symbol: self.symbol.clone(),
            time: now,
            action: TradeAction::Buy,
            side,
            price,
        });
    }

    fn sell(&mut self, price: f64, side: TradeSide, now: NaiveTime, events: &mut Vec<TradeEvent>) {
        self.capital += price;
        self.ledger.record(now, TradeAction::Sell, side, price);
        events.push(TradeEvent {
            symbol: self.symbol.clone(),
            time: now,
            action: TradeAction::Sell,
            side,
            price,
        });
    }
}
