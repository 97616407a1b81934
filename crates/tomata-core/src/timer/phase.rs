use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timed segment of the Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    /// Stable lowercase name, used in database rows and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    pub fn is_focus(&self) -> bool {
        matches!(self, Phase::Focus)
    }

    pub fn is_break(&self) -> bool {
        !self.is_focus()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown phase '{0}' (expected focus, short-break, or long-break)")]
pub struct ParsePhaseError(String);

impl FromStr for Phase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focus" => Ok(Phase::Focus),
            "short_break" | "short-break" | "shortbreak" => Ok(Phase::ShortBreak),
            "long_break" | "long-break" | "longbreak" => Ok(Phase::LongBreak),
            other => Err(ParsePhaseError(other.to_string())),
        }
    }
}

/// One step of a user-defined sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub phase: Phase,
    /// Duration in minutes.
    pub duration_min: u64,
}

impl SequenceStep {
    pub fn new(phase: Phase, duration_min: u64) -> Self {
        Self { phase, duration_min }
    }

    /// Step duration in seconds, saturating on overflow.
    pub fn duration_secs(&self) -> u64 {
        self.duration_min.saturating_mul(60)
    }
}

/// Per-phase durations and long-break cadence, snapshotted from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub focus_min: u64,
    pub short_break_min: u64,
    pub long_break_min: u64,
    pub sessions_before_long_break: u32,
}

impl PhaseDurations {
    /// Configured duration of `phase` in minutes.
    pub fn minutes_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.focus_min,
            Phase::ShortBreak => self.short_break_min,
            Phase::LongBreak => self.long_break_min,
        }
    }

    /// Configured duration of `phase` in seconds, saturating on overflow.
    pub fn secs_for(&self, phase: Phase) -> u64 {
        self.minutes_for(phase).saturating_mul(60)
    }

    /// Cycle length, never zero.
    pub fn cycle_len(&self) -> u32 {
        self.sessions_before_long_break.max(1)
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            focus_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            sessions_before_long_break: 4,
        }
    }
}
