//! Append-only activity ledger for a single trader.
//!
//! Each entry records one buy or sell at a wall-clock time. The ledger is
//! exported at session teardown in the activity-file shape:
//! `{"10:31:02": {"trade": "LONG", "bought at": 101.5}}`.

use chrono::NaiveTime;
use serde_json::{json, Map, Value};

use super::position::{TradeAction, TradeSide};

/// One buy or sell taken by a trader during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub time: NaiveTime,
    pub action: TradeAction,
    pub side: TradeSide,
    pub price: f64,
}

/// Append-only sequence of ledger entries.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: NaiveTime, action: TradeAction, side: TradeSide, price: f64) {
        self.entries.push(LedgerEntry {
            time,
            action,
            side,
            price,
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export as the activity map keyed by `HH:MM:SS` timestamp.
    ///
    /// Two trades stamped on the same second collapse into one key, the
    /// later entry winning.
    pub fn to_activity(&self) -> Map<String, Value> {
        let mut activity = Map::new();
        for entry in &self.entries {
            let price_key = match entry.action {
                TradeAction::Buy => "bought at",
                TradeAction::Sell => "sold at",
            };
            let mut record = Map::new();
            record.insert("trade".to_string(), json!(entry.side.to_string()));
            record.insert(price_key.to_string(), json!(entry.price));
            activity.insert(
                entry.time.format("%H:%M:%S").to_string(),
                Value::Object(record),
            );
        }
        activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn record_appends_in_order() {
        let mut ledger = Ledger::new();
        ledger.record(t(10, 0, 0), TradeAction::Buy, TradeSide::Long, 100.0);
        ledger.record(t(10, 5, 0), TradeAction::Sell, TradeSide::Long, 107.0);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].action, TradeAction::Buy);
        assert_eq!(ledger.entries()[1].action, TradeAction::Sell);
    }

    #[test]
    fn activity_uses_bought_at_for_buys() {
        let mut ledger = Ledger::new();
        ledger.record(t(9, 31, 2), TradeAction::Buy, TradeSide::Long, 101.5);

        let activity = ledger.to_activity();
        let entry = activity.get("09:31:02").unwrap();
        assert_eq!(entry["trade"], "LONG");
        assert_eq!(entry["bought at"], 101.5);
        assert!(entry.get("sold at").is_none());
    }

    #[test]
    fn activity_uses_sold_at_for_sells() {
        let mut ledger = Ledger::new();
        ledger.record(t(14, 0, 59), TradeAction::Sell, TradeSide::Short, 88.25);

        let activity = ledger.to_activity();
        let entry = activity.get("14:00:59").unwrap();
        assert_eq!(entry["trade"], "SHORT");
        assert_eq!(entry["sold at"], 88.25);
    }

    #[test]
    fn same_second_collapses_to_last_entry() {
        let mut ledger = Ledger::new();
        ledger.record(t(10, 0, 0), TradeAction::Buy, TradeSide::Long, 100.0);
        ledger.record(t(10, 0, 0), TradeAction::Sell, TradeSide::Long, 101.0);

        let activity = ledger.to_activity();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity["10:00:00"]["sold at"], 101.0);
    }
}
