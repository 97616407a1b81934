use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change in the engine produces an Event.
/// Frontends print or render them; collaborators react to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// Remaining time replaced by a manual edit.
    TimeEdited {
        remaining_secs: u64,
        /// A 00:00 focus edit lands on the one-minute floor instead.
        clamped_to_minimum: bool,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        total_secs: u64,
        /// Index into the active sequence, when one drives the transition.
        sequence_step: Option<usize>,
        at: DateTime<Utc>,
    },
    /// A phase ran down to zero. The engine is paused in `next_phase`.
    SessionCompleted {
        phase: Phase,
        duration_min: u64,
        focus_sessions_today: u32,
        next_phase: Phase,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        running: bool,
        remaining_secs: u64,
        total_secs: u64,
        /// 0.0 .. 1.0 progress within the current phase.
        progress: f64,
        cycle_done: u32,
        cycle_len: u32,
        sequence_step: Option<usize>,
        at: DateTime<Utc>,
    },
}
