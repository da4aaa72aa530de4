//! Session artifact export — per-trader activity files and the trade tape.
//!
//! Written once, at teardown, into the per-day session directory. Each
//! trader gets its legacy-shaped `<TICKER>.json` activity file; the
//! combined `trades.csv` is the flat tape across all traders.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use kumotrade_core::domain::TradeAction;
use kumotrade_core::trader::Trader;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub activity: Vec<PathBuf>,
    pub trades_csv: PathBuf,
}

/// Writes all artifacts for one session.
#[derive(Debug, Clone)]
pub struct SessionArtifacts {
    session_dir: PathBuf,
}

impl SessionArtifacts {
    pub fn new(session_dir: impl AsRef<Path>) -> Result<Self> {
        let session_dir = session_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&session_dir)
            .context("failed to create session artifact directory")?;
        Ok(Self { session_dir })
    }

    pub fn save(&self, traders: &[Trader]) -> Result<ArtifactPaths> {
        let mut activity = Vec::with_capacity(traders.len());
        for trader in traders {
            activity.push(self.write_activity(trader)?);
        }
        let trades_csv = self.write_trade_tape(traders)?;
        Ok(ArtifactPaths {
            activity,
            trades_csv,
        })
    }

    fn write_activity(&self, trader: &Trader) -> Result<PathBuf> {
        let path = self.session_dir.join(format!("{}.json", trader.symbol()));
        let doc = json!({
            "Ticker": trader.symbol(),
            "Activity": Value::Object(trader.ledger().to_activity()),
        });
        std::fs::write(&path, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("failed to write activity file {}", path.display()))?;
        Ok(path)
    }

    fn write_trade_tape(&self, traders: &[Trader]) -> Result<PathBuf> {
        let path = self.session_dir.join("trades.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create trade tape {}", path.display()))?;

        writer.write_record(["symbol", "time", "action", "side", "price"])?;
        for trader in traders {
            for entry in trader.ledger().entries() {
                let action = match entry.action {
                    TradeAction::Buy => "buy",
                    TradeAction::Sell => "sell",
                };
                writer.write_record([
                    trader.symbol().to_string(),
                    entry.time.format("%H:%M:%S").to_string(),
                    action.to_string(),
                    entry.side.to_string(),
                    format!("{:.4}", entry.price),
                ])?;
            }
        }
        writer.flush()?;
        Ok(path)
    }
}
