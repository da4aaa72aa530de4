//! Session observers — how a running session reports to the outside.
//!
//! The scheduler never prints; it calls into a `SessionObserver`. The
//! stdout implementation reproduces the console surface of an attended run
//! (progress bar, trade lines, alerts, closing summary); the journal
//! observer appends one JSON object per event to a JSONL file, which is the
//! session's durable log; the null observer keeps tests quiet.

use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use kumotrade_core::domain::TradeAction;
use kumotrade_core::indicators::CloudSnapshot;
use kumotrade_core::trader::{TradeEvent, TraderAlert};

use crate::lineup::InstrumentPlan;
use crate::scheduler::CloseReport;

pub trait SessionObserver {
    fn on_lineup(&self, _plans: &[InstrumentPlan]) {}

    fn on_warmup_progress(&self, _done: usize, _total: usize) {}

    /// The cloud as one trader saw it this round, before any decision.
    fn on_snapshot(&self, _symbol: &str, _snapshot: &CloudSnapshot) {}

    fn on_round(&self, _round: u64, _events: &[TradeEvent]) {}

    fn on_alert(&self, _symbol: &str, _alert: TraderAlert) {}

    fn on_close(&self, _report: &CloseReport) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl SessionObserver for NullObserver {}

/// Console observer for attended runs.
pub struct StdoutObserver;

const BAR_LENGTH: usize = 40;

impl SessionObserver for StdoutObserver {
    fn on_lineup(&self, plans: &[InstrumentPlan]) {
        for (i, plan) in plans.iter().enumerate() {
            match plan.carried {
                Some((side, price)) => println!(
                    "Trader #{} connected to {} (carried {side} from {price:.2})",
                    i + 1,
                    plan.symbol
                ),
                None => println!("Trader #{} connected to {}", i + 1, plan.symbol),
            }
        }
        println!();
    }

    fn on_warmup_progress(&self, done: usize, total: usize) {
        let filled = BAR_LENGTH * done / total;
        let percent = 100.0 * done as f64 / total as f64;
        print!(
            "\r\tProgress: |{}{}| {percent:.1}% Complete",
            "█".repeat(filled),
            " ".repeat(BAR_LENGTH - filled)
        );
        let _ = std::io::stdout().flush();
        if done == total {
            println!();
        }
    }

    fn on_round(&self, round: u64, events: &[TradeEvent]) {
        for event in events {
            let verb = match event.action {
                TradeAction::Buy => "bought",
                TradeAction::Sell => "sold",
            };
            println!(
                "[round {round}] {} {verb} in {} trade at ${:.2}",
                event.symbol, event.side, event.price
            );
        }
    }

    fn on_alert(&self, symbol: &str, alert: TraderAlert) {
        match alert {
            TraderAlert::OutOfCash => {
                eprintln!("[{symbol}] out of cash, long entry skipped");
            }
            TraderAlert::StuckShort => {
                eprintln!("[{symbol}] CRITICAL: out of cash to buy back short, position stays open");
            }
        }
    }

    fn on_close(&self, report: &CloseReport) {
        println!();
        println!("=== Session Result ===");
        println!("Rounds:         {}", report.rounds);
        println!("Prior balance:  ${:.2}", report.prior_balance);
        println!("New balance:    ${:.2}", report.new_balance);
        println!("Net profit:     ${:.2}", report.net_profit);
        println!("Stocks owned:   {}", report.carried_long);
        println!("Stocks owed:    {}", report.carried_short);
    }
}

/// JSONL session journal — one JSON object per line, append-only.
///
/// Each line is independent, so the file survives partial writes and can
/// be streamed. Journal failures never abort a session; a trading round is
/// worth more than its log line.
pub struct JournalObserver {
    path: PathBuf,
}

impl JournalObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append(&self, value: serde_json::Value) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{value}");
        }
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

impl SessionObserver for JournalObserver {
    fn on_lineup(&self, plans: &[InstrumentPlan]) {
        let symbols: Vec<&str> = plans.iter().map(|p| p.symbol.as_str()).collect();
        self.append(json!({
            "time": Self::timestamp(),
            "event": "lineup",
            "symbols": symbols,
        }));
    }

    fn on_snapshot(&self, symbol: &str, snapshot: &CloudSnapshot) {
        self.append(json!({
            "time": Self::timestamp(),
            "event": "status",
            "symbol": symbol,
            "price": snapshot.price,
            "tenkan": snapshot.tenkan,
            "kijun": snapshot.kijun,
            "senkou_a": snapshot.senkou_a,
            "senkou_b": snapshot.senkou_b,
        }));
    }

    fn on_round(&self, round: u64, events: &[TradeEvent]) {
        for event in events {
            let action = match event.action {
                TradeAction::Buy => "buy",
                TradeAction::Sell => "sell",
            };
            self.append(json!({
                "time": Self::timestamp(),
                "event": "trade",
                "round": round,
                "symbol": event.symbol,
                "action": action,
                "side": event.side.to_string(),
                "price": event.price,
            }));
        }
    }

    fn on_alert(&self, symbol: &str, alert: TraderAlert) {
        let kind = match alert {
            TraderAlert::OutOfCash => "out_of_cash",
            TraderAlert::StuckShort => "stuck_short",
        };
        self.append(json!({
            "time": Self::timestamp(),
            "event": "alert",
            "symbol": symbol,
            "kind": kind,
        }));
    }

    fn on_close(&self, report: &CloseReport) {
        self.append(json!({
            "time": Self::timestamp(),
            "event": "close",
            "rounds": report.rounds,
            "prior_balance": report.prior_balance,
            "new_balance": report.new_balance,
            "net_profit": report.net_profit,
        }));
    }
}

/// Forwards every event to each observer in turn.
pub struct FanoutObserver {
    observers: Vec<Box<dyn SessionObserver>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Box<dyn SessionObserver>>) -> Self {
        Self { observers }
    }
}

impl SessionObserver for FanoutObserver {
    fn on_lineup(&self, plans: &[InstrumentPlan]) {
        for obs in &self.observers {
            obs.on_lineup(plans);
        }
    }

    fn on_warmup_progress(&self, done: usize, total: usize) {
        for obs in &self.observers {
            obs.on_warmup_progress(done, total);
        }
    }

    fn on_snapshot(&self, symbol: &str, snapshot: &CloudSnapshot) {
        for obs in &self.observers {
            obs.on_snapshot(symbol, snapshot);
        }
    }

    fn on_round(&self, round: u64, events: &[TradeEvent]) {
        for obs in &self.observers {
            obs.on_round(round, events);
        }
    }

    fn on_alert(&self, symbol: &str, alert: TraderAlert) {
        for obs in &self.observers {
            obs.on_alert(symbol, alert);
        }
    }

    fn on_close(&self, report: &CloseReport) {
        for obs in &self.observers {
            obs.on_close(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use kumotrade_core::domain::TradeSide;

    fn sample_event() -> TradeEvent {
        TradeEvent {
            symbol: "AAPL".into(),
            time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            action: TradeAction::Buy,
            side: TradeSide::Long,
            price: 187.5,
        }
    }

    fn sample_snapshot() -> CloudSnapshot {
        CloudSnapshot {
            coord: 80,
            price: 101.0,
            tenkan: 100.5,
            kijun: 100.0,
            senkou_a: 99.5,
            senkou_b: 99.0,
        }
    }

    #[test]
    fn journal_appends_one_json_object_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = JournalObserver::new(&path);

        journal.on_snapshot("AAPL", &sample_snapshot());
        journal.on_round(3, &[sample_event()]);
        journal.on_alert("AAPL", TraderAlert::OutOfCash);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "status");
        assert_eq!(lines[0]["senkou_a"], 99.5);
        assert_eq!(lines[1]["event"], "trade");
        assert_eq!(lines[1]["round"], 3);
        assert_eq!(lines[1]["side"], "LONG");
        assert_eq!(lines[2]["event"], "alert");
        assert_eq!(lines[2]["kind"], "out_of_cash");
    }

    #[test]
    fn journal_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/journal.jsonl");
        let journal = JournalObserver::new(&path);
        journal.on_round(1, &[sample_event()]);
        assert!(path.exists());
    }

    #[test]
    fn fanout_forwards_to_all_observers() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.jsonl");
        let path_b = dir.path().join("b.jsonl");
        let fanout = FanoutObserver::new(vec![
            Box::new(JournalObserver::new(&path_a)),
            Box::new(JournalObserver::new(&path_b)),
        ]);

        fanout.on_round(1, &[sample_event()]);
        assert!(path_a.exists());
        assert!(path_b.exists());
    }
}
