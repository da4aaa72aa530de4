//! End-to-end session flow against the synthetic quote provider.

use std::time::Duration;

use kumotrade_core::domain::{PositionState, TradeSide};
use kumotrade_core::quotes::{QuoteError, QuoteProvider, RetryBudget, SyntheticQuotes};
use kumotrade_core::trader::TraderConfig;
use kumotrade_session::{
    build_lineup, CarriedPosition, ConfigCandidates, InstrumentPlan, NullObserver, Scheduler,
    SchedulerConfig, ScreenRules, SessionConfig, SessionState,
};

fn scheduler_config(dir: &std::path::Path) -> SchedulerConfig {
    SchedulerConfig {
        period: Duration::ZERO,
        cutoff: None,
        warmup_rounds: 80,
        retry: RetryBudget::immediate(5),
        feasible_pct: 0.2,
        state_path: dir.join("user_info.json"),
        session_dir: dir.join("artifacts"),
    }
}

#[test]
fn full_synthetic_session_produces_state_and_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = scheduler_config(dir.path());
    let state_path = config.state_path.clone();
    let session_dir = config.session_dir.clone();

    let state = SessionState::new("trader", 50_000.0);
    let source = ConfigCandidates::new(vec!["AAA".into(), "BBB".into(), "CCC".into()]);
    let quotes = SyntheticQuotes::with_seed(11);
    let lineup = build_lineup(
        &state,
        &source,
        &quotes,
        ScreenRules {
            focus: 2,
            penny_threshold: 50.0,
            dev_mode: true,
        },
    )
    .unwrap();
    assert_eq!(lineup.plans.len(), 2);

    let mut scheduler = Scheduler::new(config, &state, &lineup.plans, TraderConfig::default());
    scheduler.warm_up(&quotes, &NullObserver).unwrap();
    for _ in 0..60 {
        scheduler.run_round(&quotes, &NullObserver).unwrap();
    }
    let report = scheduler.close_session(&NullObserver).unwrap();
    assert_eq!(report.rounds, 60);

    // Durable state was rewritten.
    let saved = SessionState::load(&state_path).unwrap();
    assert_eq!(saved.username, "trader");
    assert!((saved.account_balance - report.new_balance).abs() < 1e-9);

    // One activity file per trader plus the combined tape.
    assert!(session_dir.join("AAA.json").exists());
    assert!(session_dir.join("BBB.json").exists());
    assert!(session_dir.join("trades.csv").exists());
}

#[test]
fn carried_positions_round_trip_through_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = scheduler_config(dir.path());
    let state_path = config.state_path.clone();

    // Yesterday closed with an open long and an open short.
    let mut yesterday = SessionState::new("trader", 20_000.0);
    yesterday
        .stocks_to_sell
        .insert("AAPL".into(), CarriedPosition { buffer_price: 187.5 });
    yesterday
        .stocks_to_buy_back
        .insert("TSLA".into(), CarriedPosition { buffer_price: 244.0 });
    yesterday.save(&state_path).unwrap();

    // Today restores them into the lineup.
    let restored = SessionState::load(&state_path).unwrap();
    let source = ConfigCandidates::new(vec![]);
    let quotes = SyntheticQuotes::with_seed(21);
    let lineup = build_lineup(
        &restored,
        &source,
        &quotes,
        ScreenRules {
            focus: 5,
            penny_threshold: 50.0,
            dev_mode: true,
        },
    )
    .unwrap();

    assert_eq!(
        lineup.plans,
        vec![
            InstrumentPlan {
                symbol: "AAPL".into(),
                carried: Some((TradeSide::Long, 187.5)),
            },
            InstrumentPlan {
                symbol: "TSLA".into(),
                carried: Some((TradeSide::Short, 244.0)),
            },
        ]
    );

    let scheduler = Scheduler::new(config, &restored, &lineup.plans, TraderConfig::default());
    let traders = scheduler.traders();
    assert_eq!(traders[0].state(), PositionState::Long);
    assert_eq!(traders[0].reference_price(), 187.5);
    assert_eq!(traders[1].state(), PositionState::Short);
    assert_eq!(traders[1].reference_price(), 244.0);
}

#[test]
fn idle_close_reproduces_identical_carryover() {
    let dir = tempfile::tempdir().unwrap();
    let config = scheduler_config(dir.path());
    let state_path = config.state_path.clone();

    let mut prior = SessionState::new("trader", 20_000.0);
    prior
        .stocks_to_sell
        .insert("AAPL".into(), CarriedPosition { buffer_price: 187.5 });
    prior
        .stocks_to_buy_back
        .insert("TSLA".into(), CarriedPosition { buffer_price: 244.0 });

    let plans: Vec<InstrumentPlan> = prior
        .carried_symbols()
        .into_iter()
        .map(|(symbol, side, price)| InstrumentPlan {
            symbol,
            carried: Some((side, price)),
        })
        .collect();

    let mut scheduler = Scheduler::new(config, &prior, &plans, TraderConfig::default());
    scheduler.close_session(&NullObserver).unwrap();

    // No rounds ran, so the exported carryover must be bit-identical.
    let saved = SessionState::load(&state_path).unwrap();
    assert_eq!(saved.stocks_to_sell, prior.stocks_to_sell);
    assert_eq!(saved.stocks_to_buy_back, prior.stocks_to_buy_back);
    assert!((saved.account_balance - 20_000.0).abs() < 1e-9);
}

#[test]
fn config_drives_a_dev_session_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let toml_str = format!(
        r#"
[session]
data_dir = "{}"
feasible_pct = 0.2
period_secs = 0
cutoff = "15:15:00"
dev_mode = true

[universe]
focus = 1
tickers = ["SPY"]
"#,
        dir.path().display()
    );
    let config = SessionConfig::from_toml(&toml_str).unwrap();

    let state = SessionState::new("trader", 10_000.0);
    state.save(&config.state_path()).unwrap();

    let restored = SessionState::load(&config.state_path()).unwrap();
    let source = ConfigCandidates::new(config.universe.tickers.clone());
    let quotes = SyntheticQuotes::with_seed(31);
    let lineup = build_lineup(
        &restored,
        &source,
        &quotes,
        ScreenRules {
            focus: config.universe.focus,
            penny_threshold: config.universe.penny_threshold,
            dev_mode: config.session.dev_mode,
        },
    )
    .unwrap();

    let scheduler_config = SchedulerConfig {
        period: config.period(),
        cutoff: None,
        warmup_rounds: config.strategy.window,
        retry: RetryBudget::immediate(5),
        feasible_pct: config.session.feasible_pct,
        state_path: config.state_path(),
        session_dir: config.session_dir(chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
    };
    let mut scheduler = Scheduler::new(
        scheduler_config,
        &restored,
        &lineup.plans,
        config.trader_config(),
    );

    scheduler.warm_up(&quotes, &NullObserver).unwrap();
    for _ in 0..20 {
        scheduler.run_round(&quotes, &NullObserver).unwrap();
    }
    let report = scheduler.close_session(&NullObserver).unwrap();

    let saved = SessionState::load(&config.state_path()).unwrap();
    assert!((saved.account_balance - report.new_balance).abs() < 1e-9);
    assert!(config
        .session_dir(chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        .join("SPY.json")
        .exists());
}

#[test]
fn retry_budget_absorbs_flaky_quotes_mid_session() {
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Synthetic quotes where every third fetch fails transiently.
    struct FlakySynthetic {
        inner: SyntheticQuotes,
        calls: AtomicU32,
    }

    impl QuoteProvider for FlakySynthetic {
        fn name(&self) -> &str {
            "flaky_synthetic"
        }

        fn fetch(&self, symbol: &str) -> Result<f64, QuoteError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 3 == 2 {
                return Err(QuoteError::NetworkUnreachable("flap".into()));
            }
            self.inner.fetch(symbol)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let state = SessionState::new("trader", 10_000.0);
    let plans = vec![InstrumentPlan {
        symbol: "SPY".into(),
        carried: None,
    }];
    let mut scheduler = Scheduler::new(
        scheduler_config(dir.path()),
        &state,
        &plans,
        TraderConfig::default(),
    );
    let quotes = FlakySynthetic {
        inner: SyntheticQuotes::with_seed(41),
        calls: AtomicU32::new(0),
    };

    scheduler.warm_up(&quotes, &NullObserver).unwrap();
    for _ in 0..10 {
        scheduler.run_round(&quotes, &NullObserver).unwrap();
    }
    assert_eq!(scheduler.rounds_completed(), 10);
}
