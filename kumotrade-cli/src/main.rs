//! kumotrade CLI — run, check, and init commands.
//!
//! Commands:
//! - `run` — a full trading session: restore state, line up traders, warm
//!   up, trade until the daily cutoff, settle and persist
//! - `check` — trial mode: validate config and state, confirm one quote
//!   per lineup symbol, no trading
//! - `init` — write a fresh session state file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use kumotrade_core::quotes::{
    CircuitBreaker, QuoteProvider, RetryBudget, SyntheticQuotes, YahooQuotes,
};
use kumotrade_session::{
    build_lineup, CloseReport, ConfigCandidates, FanoutObserver, JournalObserver, Scheduler,
    SchedulerConfig, ScreenRules, SessionConfig, SessionObserver, SessionState, StdoutObserver,
};

#[derive(Parser)]
#[command(name = "kumotrade", about = "Unattended Ichimoku session trader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trading session from a TOML config file.
    Run {
        /// Path to the session config.
        #[arg(long)]
        config: PathBuf,

        /// Override the round period, in seconds.
        #[arg(long)]
        period: Option<u64>,

        /// Override the idle delay, in seconds.
        #[arg(long)]
        delay: Option<u64>,

        /// Skip the idle phase entirely.
        #[arg(long, default_value_t = false)]
        no_delay: bool,

        /// Developer override: no cutoff, no candidate screening.
        #[arg(long, default_value_t = false)]
        dev: bool,

        /// Use the synthetic quote provider instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for the synthetic provider.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Validate config and state and confirm quote access, without trading.
    Check {
        /// Path to the session config.
        #[arg(long)]
        config: PathBuf,

        /// Use the synthetic quote provider instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Write a fresh session state file.
    Init {
        /// Path to the session config.
        #[arg(long)]
        config: PathBuf,

        /// Opening account balance.
        #[arg(long)]
        balance: f64,

        /// Account name stored in the state file.
        #[arg(long, default_value = "trader")]
        username: String,

        /// Overwrite an existing state file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            period,
            delay,
            no_delay,
            dev,
            synthetic,
            seed,
        } => run_session(config, period, delay, no_delay, dev, synthetic, seed),
        Commands::Check { config, synthetic } => run_check(config, synthetic),
        Commands::Init {
            config,
            balance,
            username,
            force,
        } => run_init(config, balance, username, force),
    }
}

fn build_provider(synthetic: bool, seed: u64) -> Box<dyn QuoteProvider> {
    if synthetic {
        Box::new(SyntheticQuotes::with_seed(seed))
    } else {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        Box::new(YahooQuotes::new(breaker))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_session(
    config_path: PathBuf,
    period: Option<u64>,
    delay: Option<u64>,
    no_delay: bool,
    dev: bool,
    synthetic: bool,
    seed: u64,
) -> Result<()> {
    if no_delay && delay.is_some() {
        bail!("--no-delay and --delay are mutually exclusive");
    }

    let mut config = SessionConfig::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    if let Some(secs) = period {
        config.session.period_secs = secs;
    }
    if let Some(secs) = delay {
        config.session.idle_delay_secs = secs;
    }
    if no_delay {
        config.session.idle_delay_secs = 0;
    }
    if dev {
        config.session.dev_mode = true;
    }

    let idle = config.idle_delay();
    if idle.is_zero() {
        println!("Skipped idle phase");
    } else {
        println!("Idle phase: {}s before the session starts", idle.as_secs());
        std::thread::sleep(idle);
    }

    let state = SessionState::load(&config.state_path()).with_context(|| {
        format!(
            "loading session state {} (run `kumotrade init` for a fresh account)",
            config.state_path().display()
        )
    })?;

    let provider = build_provider(synthetic, seed);
    let today = chrono::Local::now().date_naive();
    let observer = FanoutObserver::new(vec![
        Box::new(StdoutObserver),
        Box::new(JournalObserver::new(
            config.session_dir(today).join("journal.jsonl"),
        )),
    ]);

    println!("Selecting instruments...");
    let lineup = build_lineup(
        &state,
        &ConfigCandidates::new(config.universe.tickers.clone()),
        provider.as_ref(),
        ScreenRules {
            focus: config.universe.focus,
            penny_threshold: config.universe.penny_threshold,
            dev_mode: config.session.dev_mode,
        },
    )?;
    for (symbol, reason) in &lineup.skipped {
        eprintln!("skipped {symbol}: {reason}");
    }
    if lineup.plans.is_empty() {
        bail!("no instruments passed screening; nothing to trade");
    }

    let cutoff = if config.session.dev_mode {
        None
    } else {
        Some(config.cutoff_time()?)
    };
    let retry = if config.session.period_secs == 0 {
        RetryBudget::immediate(60)
    } else {
        RetryBudget::default()
    };
    let scheduler_config = SchedulerConfig {
        period: config.period(),
        cutoff,
        warmup_rounds: config.strategy.window,
        retry,
        feasible_pct: config.session.feasible_pct,
        state_path: config.state_path(),
        session_dir: config.session_dir(today),
    };

    let mut scheduler = Scheduler::new(
        scheduler_config,
        &state,
        &lineup.plans,
        config.trader_config(),
    );

    let stop = scheduler.stop_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nStop requested; closing the session at the next round boundary...");
        stop.store(true, Ordering::SeqCst);
    }) {
        eprintln!("Failed to set Ctrl-C handler: {e}. Stop via cutoff only.");
    }

    observer.on_lineup(&lineup.plans);
    println!("Observation phase ({} rounds)", config.strategy.window);
    let report = scheduler.run(provider.as_ref(), &observer)?;
    print_artifacts_hint(&config, today, &report);

    Ok(())
}

fn print_artifacts_hint(config: &SessionConfig, today: chrono::NaiveDate, report: &CloseReport) {
    println!();
    println!(
        "State saved to {}; artifacts in {} ({} open position(s) carried forward)",
        config.state_path().display(),
        config.session_dir(today).display(),
        report.carried_long + report.carried_short
    );
}

fn run_check(config_path: PathBuf, synthetic: bool) -> Result<()> {
    let config = SessionConfig::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    println!("Config OK: {}", config_path.display());

    let state = SessionState::load(&config.state_path())
        .with_context(|| format!("loading session state {}", config.state_path().display()))?;
    println!(
        "State OK: balance ${:.2}, {} carried long, {} carried short",
        state.account_balance,
        state.stocks_to_sell.len(),
        state.stocks_to_buy_back.len()
    );

    let provider = build_provider(synthetic, 0);
    let lineup = build_lineup(
        &state,
        &ConfigCandidates::new(config.universe.tickers.clone()),
        provider.as_ref(),
        ScreenRules {
            focus: config.universe.focus,
            penny_threshold: config.universe.penny_threshold,
            dev_mode: config.session.dev_mode,
        },
    )?;

    println!("Confirming quote access...");
    let mut failures = 0;
    for plan in &lineup.plans {
        match provider.fetch(&plan.symbol) {
            Ok(price) => println!("  OK: {} at {price:.2}", plan.symbol),
            Err(e) => {
                println!("  FAIL: {}: {e}", plan.symbol);
                failures += 1;
            }
        }
    }
    for (symbol, reason) in &lineup.skipped {
        println!("  SKIPPED: {symbol}: {reason}");
    }

    if failures > 0 {
        bail!("{failures} symbol(s) failed the quote check");
    }
    println!("Check complete: {} instrument(s) ready", lineup.plans.len());
    Ok(())
}

fn run_init(config_path: PathBuf, balance: f64, username: String, force: bool) -> Result<()> {
    if balance <= 0.0 {
        bail!("--balance must be positive");
    }
    let config = SessionConfig::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let state_path = config.state_path();
    if state_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            state_path.display()
        );
    }

    let state = SessionState::new(username, balance);
    state.save(&state_path)?;
    println!(
        "Initialised {} with balance ${balance:.2}",
        state_path.display()
    );
    Ok(())
}
