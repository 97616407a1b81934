//! # Tomata Core Library
//!
//! This library provides the core business logic for the Tomata Pomodoro
//! timer. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary; any future GUI is a thin layer
//! over the same core library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` for progress updates
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//! - **Tasks & Sequences**: To-do entries credited by focus sessions, and
//!   user-defined phase sequences the engine can follow
//! - **Stats**: Pure aggregation of recorded sessions into dashboard
//!   summaries
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Database`]: Session, task, and sequence persistence
//! - [`Config`]: Application configuration management
//! - [`StreakRecord`]: Consecutive-active-day tracking

pub mod error;
pub mod events;
pub mod sequence;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, TimerError, ValidationError};
pub use events::Event;
pub use sequence::StoredSequence;
pub use stats::{AllTimeSummary, RecentSession, SessionRecord, TodaySummary, WeekSummary};
pub use storage::{Config, Database};
pub use task::{Task, TaskStats};
pub use timer::{
    Completion, Phase, PhaseDurations, SequenceStep, StreakRecord, TimerEngine, TimerObserver,
};
