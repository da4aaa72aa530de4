//! kumotrade session — orchestration around the core engine.
//!
//! This crate builds on `kumotrade-core` to provide:
//! - TOML session configuration (no process-wide mutable state)
//! - Durable session state (account balance + carried positions)
//! - Instrument lineup: carried positions first, screened candidates after
//! - The round scheduler: warm-up, trading rounds, teardown settlement
//! - Artifact export (per-trader activity files, trade tape)
//! - Console/silent session observers

pub mod artifacts;
pub mod config;
pub mod lineup;
pub mod observer;
pub mod scheduler;
pub mod state;

pub use artifacts::{ArtifactPaths, SessionArtifacts};
pub use config::{ConfigError, SessionConfig};
pub use lineup::{
    build_lineup, CandidateSource, ConfigCandidates, InstrumentPlan, LineupError, LineupReport,
    ScreenRules,
};
pub use observer::{
    FanoutObserver, JournalObserver, NullObserver, SessionObserver, StdoutObserver,
};
pub use scheduler::{CloseReport, Scheduler, SchedulerConfig, SessionError};
pub use state::{CarriedPosition, SessionState, StateError};
