//! The round scheduler — one control loop driving every trader in lockstep.
//!
//! Single-threaded and cooperative: each round visits traders strictly in
//! lineup order, and the round finishes before the fixed-period sleep
//! begins. A blocking fetch for one trader delays them all. Any error
//! inside a trading round aborts the whole session, but teardown still
//! runs: `run()` guarantees `close_session()` on every exit path, so open
//! positions and the balance are never lost to a crash or an interrupt.

use chrono::{Local, NaiveTime};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use kumotrade_core::domain::TradeSide;
use kumotrade_core::indicators::CloudError;
use kumotrade_core::quotes::{fetch_patiently, QuoteError, QuoteProvider, RetryBudget};
use kumotrade_core::trader::{Trader, TraderConfig};

use crate::artifacts::SessionArtifacts;
use crate::config::ConfigError;
use crate::lineup::{InstrumentPlan, LineupError};
use crate::observer::SessionObserver;
use crate::state::{CarriedPosition, SessionState, StateError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Lineup(#[from] LineupError),

    #[error("quote stream failed for {symbol}: {source}")]
    Quote {
        symbol: String,
        #[source]
        source: QuoteError,
    },

    #[error("cloud invariant violated for {symbol}: {source}")]
    Cloud {
        symbol: String,
        #[source]
        source: CloudError,
    },

    #[error("artifact export failed: {0}")]
    Artifacts(String),
}

/// Everything the scheduler needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep between rounds. Zero runs rounds back to back.
    pub period: Duration,
    /// Daily stop time. `None` disables the cutoff (developer override).
    pub cutoff: Option<NaiveTime>,
    /// Warm-up rounds — equal to the price window capacity.
    pub warmup_rounds: usize,
    /// Retry budget for each quote fetch.
    pub retry: RetryBudget,
    /// Fraction of the prior balance allotted as the trading pool.
    pub feasible_pct: f64,
    /// Where the durable session state is rewritten at teardown.
    pub state_path: PathBuf,
    /// Per-day artifact directory.
    pub session_dir: PathBuf,
}

/// Outcome of a closed session.
#[derive(Debug, Clone)]
pub struct CloseReport {
    pub rounds: u64,
    pub prior_balance: f64,
    pub new_balance: f64,
    pub net_profit: f64,
    pub carried_long: usize,
    pub carried_short: usize,
}

/// Owns the trader lineup and drives warm-up, trading, and teardown.
pub struct Scheduler {
    config: SchedulerConfig,
    username: String,
    prior_balance: f64,
    /// Each trader's independent copy of the allotted pool.
    pool: f64,
    traders: Vec<Trader>,
    round: u64,
    stop: Arc<AtomicBool>,
    report: Option<CloseReport>,
}

impl Scheduler {
    /// Build the scheduler from restored state and the session lineup.
    ///
    /// Every trader receives its own full copy of the allotted pool rather
    /// than a share of it. That is the reference behavior: aggregate
    /// exposure can reach lineup-size × the pool. Settlement reconciles the
    /// copies through per-trader deltas, so no money is invented at close.
    pub fn new(
        config: SchedulerConfig,
        state: &SessionState,
        plans: &[InstrumentPlan],
        trader_config: TraderConfig,
    ) -> Self {
        let pool = state.account_balance * config.feasible_pct;
        let traders = plans
            .iter()
            .map(|plan| match plan.carried {
                Some((side, buffer_price)) => {
                    Trader::restored(plan.symbol.clone(), pool, side, buffer_price, trader_config)
                }
                None => Trader::new(plan.symbol.clone(), pool, trader_config),
            })
            .collect();

        Self {
            config,
            username: state.username.clone(),
            prior_balance: state.account_balance,
            pool,
            traders,
            round: 0,
            stop: Arc::new(AtomicBool::new(false)),
            report: None,
        }
    }

    /// Cooperative stop flag; setting it ends the trading loop at the next
    /// round boundary, through the normal teardown path.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn traders(&self) -> &[Trader] {
        &self.traders
    }

    pub fn rounds_completed(&self) -> u64 {
        self.round
    }

    /// Observation phase: one quote per trader per round until every window
    /// is warm.
    pub fn warm_up(
        &mut self,
        quotes: &dyn QuoteProvider,
        observer: &dyn SessionObserver,
    ) -> Result<(), SessionError> {
        let total = self.config.warmup_rounds;
        observer.on_warmup_progress(0, total);

        for step in 0..total {
            for trader in &mut self.traders {
                let price = fetch_patiently(quotes, trader.symbol(), &self.config.retry).map_err(
                    |source| SessionError::Quote {
                        symbol: trader.symbol().to_string(),
                        source,
                    },
                )?;
                trader.observe(price);
            }
            observer.on_warmup_progress(step + 1, total);
            if !self.config.period.is_zero() {
                std::thread::sleep(self.config.period);
            }
        }
        Ok(())
    }

    /// One trading round across every trader, in lineup order.
    pub fn run_round(
        &mut self,
        quotes: &dyn QuoteProvider,
        observer: &dyn SessionObserver,
    ) -> Result<(), SessionError> {
        self.round += 1;
        let now = Local::now().time();
        let mut events = Vec::new();

        for trader in &mut self.traders {
            let price = fetch_patiently(quotes, trader.symbol(), &self.config.retry).map_err(
                |source| SessionError::Quote {
                    symbol: trader.symbol().to_string(),
                    source,
                },
            )?;
            let outcome =
                trader
                    .advance_round(price, now)
                    .map_err(|source| SessionError::Cloud {
                        symbol: trader.symbol().to_string(),
                        source,
                    })?;

            observer.on_snapshot(trader.symbol(), &outcome.snapshot);
            for alert in &outcome.alerts {
                observer.on_alert(trader.symbol(), *alert);
            }
            events.extend(outcome.events);
        }

        observer.on_round(self.round, &events);
        Ok(())
    }

    /// Trading phase: rounds until the daily cutoff or the stop flag.
    pub fn trade(
        &mut self,
        quotes: &dyn QuoteProvider,
        observer: &dyn SessionObserver,
    ) -> Result<(), SessionError> {
        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            if let Some(cutoff) = self.config.cutoff {
                if Local::now().time() >= cutoff {
                    break;
                }
            }
            self.run_round(quotes, observer)?;
            if !self.config.period.is_zero() {
                std::thread::sleep(self.config.period);
            }
        }
        Ok(())
    }

    /// Full session: warm-up, trade, then close — teardown runs whether or
    /// not the phases succeeded, and a trading error takes precedence over
    /// a teardown error in the result.
    pub fn run(
        &mut self,
        quotes: &dyn QuoteProvider,
        observer: &dyn SessionObserver,
    ) -> Result<CloseReport, SessionError> {
        let traded = self
            .warm_up(quotes, observer)
            .and_then(|()| self.trade(quotes, observer));
        let closed = self.close_session(observer);

        match traded {
            Ok(()) => closed,
            Err(e) => Err(e),
        }
    }

    /// Settle the session and persist everything. Idempotent: the state
    /// file is written exactly once however many times this is called.
    pub fn close_session(
        &mut self,
        observer: &dyn SessionObserver,
    ) -> Result<CloseReport, SessionError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }

        // The untraded remainder plus the pool share, adjusted by what each
        // trader's copy of the pool gained or lost.
        let mut new_balance =
            self.prior_balance * (1.0 - self.config.feasible_pct) + self.pool;
        let mut state = SessionState::new(self.username.clone(), 0.0);

        for trader in &self.traders {
            new_balance += trader.net_delta(self.pool);
            if let Some((side, buffer_price)) = trader.carryover() {
                let carried = CarriedPosition { buffer_price };
                match side {
                    TradeSide::Long => {
                        state
                            .stocks_to_sell
                            .insert(trader.symbol().to_string(), carried);
                    }
                    TradeSide::Short => {
                        state
                            .stocks_to_buy_back
                            .insert(trader.symbol().to_string(), carried);
                    }
                }
            }
        }

        state.account_balance = new_balance;
        state.save(&self.config.state_path)?;

        SessionArtifacts::new(&self.config.session_dir)
            .and_then(|artifacts| artifacts.save(&self.traders))
            .map_err(|e| SessionError::Artifacts(e.to_string()))?;

        let report = CloseReport {
            rounds: self.round,
            prior_balance: self.prior_balance,
            new_balance,
            net_profit: new_balance - self.prior_balance,
            carried_long: state.stocks_to_sell.len(),
            carried_short: state.stocks_to_buy_back.len(),
        };
        observer.on_close(&report);
        self.report = Some(report.clone());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use kumotrade_core::quotes::SyntheticQuotes;

    fn test_config(dir: &std::path::Path) -> SchedulerConfig {
        SchedulerConfig {
            period: Duration::ZERO,
            cutoff: None,
            warmup_rounds: 80,
            retry: RetryBudget::immediate(5),
            feasible_pct: 0.2,
            state_path: dir.join("user_info.json"),
            session_dir: dir.join("05-03-2024"),
        }
    }

    fn plans(symbols: &[&str]) -> Vec<InstrumentPlan> {
        symbols
            .iter()
            .map(|s| InstrumentPlan {
                symbol: s.to_string(),
                carried: None,
            })
            .collect()
    }

    #[test]
    fn warm_up_fills_every_window() {
        let dir = tempfile::tempdir().unwrap();
        let state = SessionState::new("t", 10_000.0);
        let mut scheduler = Scheduler::new(
            test_config(dir.path()),
            &state,
            &plans(&["AAA", "BBB"]),
            TraderConfig::default(),
        );
        let quotes = SyntheticQuotes::with_seed(1);

        scheduler.warm_up(&quotes, &NullObserver).unwrap();
        for trader in scheduler.traders() {
            assert!(trader.is_warm());
        }
    }

    #[test]
    fn each_trader_gets_an_independent_pool_copy() {
        let dir = tempfile::tempdir().unwrap();
        let state = SessionState::new("t", 10_000.0);
        let scheduler = Scheduler::new(
            test_config(dir.path()),
            &state,
            &plans(&["AAA", "BBB", "CCC"]),
            TraderConfig::default(),
        );
        for trader in scheduler.traders() {
            assert_eq!(trader.capital(), 2_000.0);
        }
    }

    #[test]
    fn close_session_settles_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let state_path = config.state_path.clone();
        let state = SessionState::new("t", 10_000.0);
        let mut scheduler = Scheduler::new(
            config,
            &state,
            &plans(&["AAA"]),
            TraderConfig::default(),
        );
        let quotes = SyntheticQuotes::with_seed(3);

        scheduler.warm_up(&quotes, &NullObserver).unwrap();
        for _ in 0..40 {
            scheduler.run_round(&quotes, &NullObserver).unwrap();
        }
        let report = scheduler.close_session(&NullObserver).unwrap();

        // Settlement conserves money: balance moves only by trading deltas.
        let delta: f64 = scheduler
            .traders()
            .iter()
            .map(|t| t.net_delta(2_000.0))
            .sum();
        assert!((report.new_balance - (10_000.0 + delta)).abs() < 1e-9);
        assert!((report.net_profit - delta).abs() < 1e-9);
        assert_eq!(report.rounds, 40);

        let saved = SessionState::load(&state_path).unwrap();
        assert_eq!(saved.username, "t");
        assert!((saved.account_balance - report.new_balance).abs() < 1e-9);
        assert_eq!(saved.stocks_to_sell.len(), report.carried_long);
        assert_eq!(saved.stocks_to_buy_back.len(), report.carried_short);
    }

    #[test]
    fn close_session_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let state_path = config.state_path.clone();
        let state = SessionState::new("t", 10_000.0);
        let mut scheduler = Scheduler::new(
            config,
            &state,
            &plans(&["AAA"]),
            TraderConfig::default(),
        );

        let first = scheduler.close_session(&NullObserver).unwrap();
        let modified = std::fs::metadata(&state_path).unwrap().modified().unwrap();
        let second = scheduler.close_session(&NullObserver).unwrap();

        assert_eq!(first.rounds, second.rounds);
        assert!((first.new_balance - second.new_balance).abs() < f64::EPSILON);
        assert_eq!(
            std::fs::metadata(&state_path).unwrap().modified().unwrap(),
            modified
        );
    }

    #[test]
    fn untraded_session_preserves_the_balance() {
        let dir = tempfile::tempdir().unwrap();
        let state = SessionState::new("t", 10_000.0);
        let mut scheduler = Scheduler::new(
            test_config(dir.path()),
            &state,
            &plans(&["AAA", "BBB"]),
            TraderConfig::default(),
        );

        let report = scheduler.close_session(&NullObserver).unwrap();
        assert!((report.new_balance - 10_000.0).abs() < 1e-9);
        assert!((report.net_profit).abs() < 1e-9);
    }

    #[test]
    fn stop_flag_ends_trading_before_the_first_round() {
        let dir = tempfile::tempdir().unwrap();
        let state = SessionState::new("t", 10_000.0);
        let mut scheduler = Scheduler::new(
            test_config(dir.path()),
            &state,
            &plans(&["AAA"]),
            TraderConfig::default(),
        );
        let quotes = SyntheticQuotes::with_seed(5);

        scheduler.stop_flag().store(true, Ordering::SeqCst);
        scheduler.warm_up(&quotes, &NullObserver).unwrap();
        scheduler.trade(&quotes, &NullObserver).unwrap();
        assert_eq!(scheduler.rounds_completed(), 0);
    }

    #[test]
    fn run_closes_even_when_trading_fails() {
        struct FailingQuotes;
        impl QuoteProvider for FailingQuotes {
            fn name(&self) -> &str {
                "failing"
            }
            fn fetch(&self, _symbol: &str) -> Result<f64, QuoteError> {
                Err(QuoteError::CircuitBreakerTripped)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let state_path = config.state_path.clone();
        let state = SessionState::new("t", 10_000.0);
        let mut scheduler = Scheduler::new(
            config,
            &state,
            &plans(&["AAA"]),
            TraderConfig::default(),
        );

        let err = scheduler.run(&FailingQuotes, &NullObserver).unwrap_err();
        assert!(matches!(err, SessionError::Quote { .. }));

        // Teardown still persisted the balance.
        let saved = SessionState::load(&state_path).unwrap();
        assert!((saved.account_balance - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn restored_positions_survive_an_idle_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let state_path = config.state_path.clone();
        let state = SessionState::new("t", 10_000.0);
        let plans = vec![InstrumentPlan {
            symbol: "AAPL".into(),
            carried: Some((TradeSide::Long, 187.5)),
        }];
        let mut scheduler =
            Scheduler::new(config, &state, &plans, TraderConfig::default());

        scheduler.close_session(&NullObserver).unwrap();

        let saved = SessionState::load(&state_path).unwrap();
        assert_eq!(saved.stocks_to_sell["AAPL"].buffer_price, 187.5);
        assert!(saved.stocks_to_buy_back.is_empty());
    }
}
