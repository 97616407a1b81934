//! Timer engine implementation.
//!
//! The engine is a wall-clock-based state machine. It owns no threads and
//! never reads the clock for its arithmetic -- the caller passes epoch
//! milliseconds into `start()` and `tick()` and is responsible for calling
//! `tick()` periodically while the countdown runs. Remaining time is always
//! re-derived from the recorded start instant, so a late tick lands on the
//! same value an on-time tick would have.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(config.durations());
//! engine.start(now_ms)?;
//! // In a loop:
//! engine.tick(now_ms); // Returns Some(Event::SessionCompleted) at zero
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::{Phase, PhaseDurations, SequenceStep};
use crate::error::TimerError;
use crate::events::Event;

/// Maximum minutes accepted by a manual time edit (3 hours).
const EDIT_MAX_MINUTES: u64 = 180;

/// Payload handed to observers when a phase runs down to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub phase: Phase,
    pub duration_min: u64,
    pub task_id: Option<String>,
    pub focus_sessions_today: u32,
    pub next_phase: Phase,
    pub at: DateTime<Utc>,
}

/// Observer hooks for engine transitions.
///
/// All methods default to no-ops so implementors override only what they
/// need. Observers are not serialized with the engine; re-register them
/// after deserializing.
pub trait TimerObserver: Send {
    fn on_phase_changed(&mut self, _from: Phase, _to: Phase) {}
    fn on_session_completed(&mut self, _completion: &Completion) {}
}

/// A user-defined sequence installed on the engine, plus the current step.
/// Sequences loop forever; there is no terminal step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSequence {
    steps: Vec<SequenceStep>,
    index: usize,
}

impl ActiveSequence {
    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn current(&self) -> Option<SequenceStep> {
        self.steps.get(self.index).copied()
    }
}

/// Timer session state machine.
///
/// Owns the current phase, remaining time, run state, and progression
/// through the Pomodoro cycle or an installed sequence. Serializable so a
/// frontend can persist it between invocations.
#[derive(Serialize, Deserialize)]
pub struct TimerEngine {
    phase: Phase,
    /// Seconds left in the current phase. Never exceeds the total.
    time_remaining_secs: u64,
    /// Duration the current phase started with; basis for progress and
    /// drift correction.
    total_duration_secs: u64,
    running: bool,
    /// Wall-clock instant the current run began, adjusted backward by the
    /// already-elapsed time on resume. `Some` exactly while running.
    started_at_epoch_ms: Option<u64>,
    completed_focus_today: u32,
    #[serde(default)]
    sequence: Option<ActiveSequence>,
    /// Set by a manual edit; blocks immediate adoption of settings changes
    /// for the current phase.
    #[serde(default)]
    manually_edited: bool,
    #[serde(default)]
    active_task_id: Option<String>,
    #[serde(default)]
    durations: PhaseDurations,
    #[serde(skip)]
    observers: Vec<Box<dyn TimerObserver>>,
}

impl TimerEngine {
    /// Create an engine in the Focus phase, paused at full duration.
    pub fn new(durations: PhaseDurations) -> Self {
        let total = durations.secs_for(Phase::Focus);
        Self {
            phase: Phase::Focus,
            time_remaining_secs: total,
            total_duration_secs: total,
            running: false,
            started_at_epoch_ms: None,
            completed_focus_today: 0,
            sequence: None,
            manually_edited: false,
            active_task_id: None,
            durations,
            observers: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_remaining_secs(&self) -> u64 {
        self.time_remaining_secs
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.total_duration_secs
    }

    pub fn completed_focus_today(&self) -> u32 {
        self.completed_focus_today
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task_id.as_deref()
    }

    pub fn durations(&self) -> &PhaseDurations {
        &self.durations
    }

    pub fn sequence(&self) -> Option<&ActiveSequence> {
        self.sequence.as_ref()
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        if self.total_duration_secs == 0 {
            return 0.0;
        }
        1.0 - (self.time_remaining_secs as f64 / self.total_duration_secs as f64)
    }

    /// Completed-in-cycle count and cycle length for display.
    ///
    /// Shows `4/4` rather than `0/4` right after the fourth completion and
    /// for as long as the long break lasts.
    pub fn cycle_progress(&self) -> (u32, u32) {
        let len = self.durations.cycle_len();
        let done = self.completed_focus_today % len;
        if done == 0 && self.completed_focus_today > 0 {
            (len, len)
        } else {
            (done, len)
        }
    }

    /// Build a full state snapshot event for pull-based renderers.
    pub fn snapshot(&self) -> Event {
        let (cycle_done, cycle_len) = self.cycle_progress();
        Event::StateSnapshot {
            phase: self.phase,
            running: self.running,
            remaining_secs: self.time_remaining_secs,
            total_secs: self.total_duration_secs,
            progress: self.phase_progress(),
            cycle_done,
            cycle_len,
            sequence_step: self.sequence.as_ref().map(|s| s.index),
            at: Utc::now(),
        }
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, observer: Box<dyn TimerObserver>) {
        self.observers.push(observer);
    }

    fn notify_phase_changed(&mut self, from: Phase, to: Phase) {
        for obs in &mut self.observers {
            obs.on_phase_changed(from, to);
        }
    }

    fn notify_session_completed(&mut self, completion: &Completion) {
        for obs in &mut self.observers {
            obs.on_session_completed(completion);
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch to `target`, leaving any active sequence. Legal in any state;
    /// stops the countdown if it is running.
    pub fn switch_phase(&mut self, target: Phase) -> Event {
        let from = self.phase;
        self.running = false;
        self.started_at_epoch_ms = None;
        self.sequence = None;
        self.manually_edited = false;
        self.phase = target;
        self.total_duration_secs = self.durations.secs_for(target);
        self.time_remaining_secs = self.total_duration_secs;
        self.notify_phase_changed(from, target);
        Event::PhaseChanged {
            from,
            to: target,
            total_secs: self.total_duration_secs,
            sequence_step: None,
            at: Utc::now(),
        }
    }

    /// Begin or resume the countdown.
    ///
    /// The start instant is set backward by the time already elapsed, so a
    /// resume continues exactly where the pause left off.
    pub fn start(&mut self, now_ms: u64) -> Result<Event, TimerError> {
        if self.running {
            return Err(TimerError::AlreadyRunning);
        }
        if self.phase.is_focus() && self.time_remaining_secs == 0 {
            return Err(TimerError::EmptyFocusSession);
        }
        let elapsed_ms = self
            .total_duration_secs
            .saturating_sub(self.time_remaining_secs)
            .saturating_mul(1000);
        self.started_at_epoch_ms = Some(now_ms.saturating_sub(elapsed_ms));
        self.running = true;
        Ok(Event::TimerStarted {
            phase: self.phase,
            remaining_secs: self.time_remaining_secs,
            total_secs: self.total_duration_secs,
            at: Utc::now(),
        })
    }

    /// Freeze the countdown at its last computed value. No-op while paused.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.started_at_epoch_ms = None;
        Some(Event::TimerPaused {
            remaining_secs: self.time_remaining_secs,
            at: Utc::now(),
        })
    }

    /// Stop and restore the current phase to its full duration, taken from
    /// the active sequence step when one is installed.
    pub fn reset(&mut self) -> Event {
        self.running = false;
        self.started_at_epoch_ms = None;
        self.manually_edited = false;
        self.total_duration_secs = match self.sequence.as_ref().and_then(|s| s.current()) {
            Some(step) => step.duration_secs(),
            None => self.durations.secs_for(self.phase),
        };
        self.time_remaining_secs = self.total_duration_secs;
        Event::TimerReset {
            phase: self.phase,
            total_secs: self.total_duration_secs,
            at: Utc::now(),
        }
    }

    /// Re-derive remaining time from the wall clock.
    ///
    /// Returns `Some(Event::SessionCompleted)` when the countdown reaches
    /// zero. Completion fires exactly once: the engine leaves the running
    /// state before returning, so further ticks are no-ops.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.running {
            return None;
        }
        let started = self.started_at_epoch_ms?;
        let elapsed_ms = now_ms.saturating_sub(started);
        self.time_remaining_secs = self.total_duration_secs.saturating_sub(elapsed_ms / 1000);
        if self.time_remaining_secs == 0 {
            return Some(self.complete_session());
        }
        None
    }

    /// Replace the remaining time while paused. Both the remaining and the
    /// total duration adopt the new value, so progress restarts from zero.
    ///
    /// A focus phase cannot be set to 00:00; such an edit lands on one
    /// minute and the returned event reports the clamp.
    pub fn edit_time(&mut self, minutes: u64, seconds: u64) -> Result<Event, TimerError> {
        if self.running {
            return Err(TimerError::EditWhileRunning);
        }
        if minutes > EDIT_MAX_MINUTES || seconds >= 60 {
            return Err(TimerError::InvalidEdit(format!("{minutes:02}:{seconds:02}")));
        }
        let mut new_total = minutes * 60 + seconds;
        let mut clamped = false;
        if new_total == 0 && self.phase.is_focus() {
            new_total = 60;
            clamped = true;
        }
        self.time_remaining_secs = new_total;
        self.total_duration_secs = new_total;
        self.manually_edited = true;
        Ok(Event::TimeEdited {
            remaining_secs: new_total,
            clamped_to_minimum: clamped,
            at: Utc::now(),
        })
    }

    /// Adopt new settings.
    ///
    /// While paused with no manual edit and no active sequence, the current
    /// phase picks up its new duration immediately. While running, the live
    /// countdown keeps its baseline and the new durations take effect from
    /// the next phase.
    pub fn apply_settings(&mut self, durations: PhaseDurations) {
        self.durations = durations;
        if !self.running && !self.manually_edited && self.sequence.is_none() {
            self.total_duration_secs = self.durations.secs_for(self.phase);
            self.time_remaining_secs = self.total_duration_secs;
        }
    }

    /// Install a user-defined sequence and jump to its first step, paused.
    pub fn use_sequence(&mut self, steps: Vec<SequenceStep>) -> Result<Event, TimerError> {
        let first = *steps.first().ok_or(TimerError::EmptySequence)?;
        let from = self.phase;
        self.sequence = Some(ActiveSequence { steps, index: 0 });
        self.running = false;
        self.started_at_epoch_ms = None;
        self.manually_edited = false;
        self.phase = first.phase;
        self.total_duration_secs = first.duration_secs();
        self.time_remaining_secs = self.total_duration_secs;
        self.notify_phase_changed(from, first.phase);
        Ok(Event::PhaseChanged {
            from,
            to: first.phase,
            total_secs: self.total_duration_secs,
            sequence_step: Some(0),
            at: Utc::now(),
        })
    }

    /// Remove the active sequence and fall back to the standard cycle, with
    /// the current phase re-derived from settings.
    pub fn clear_sequence(&mut self) -> Option<Event> {
        self.sequence.take()?;
        let phase = self.phase;
        Some(self.switch_phase(phase))
    }

    /// Drop the sequence linkage without touching the countdown. Used when
    /// the stored sequence no longer exists.
    pub fn detach_sequence(&mut self) {
        self.sequence = None;
    }

    /// Task credited when a focus phase completes.
    pub fn set_active_task(&mut self, task_id: Option<String>) {
        self.active_task_id = task_id;
    }

    /// Reseed the daily completion counter from persisted history. Day
    /// rollover is owned by the persistence layer, not the engine.
    pub fn set_completed_focus_today(&mut self, count: u32) {
        self.completed_focus_today = count;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_session(&mut self) -> Event {
        self.running = false;
        self.started_at_epoch_ms = None;

        let finished = self.phase;
        let duration_min = self.total_duration_secs / 60;
        if finished.is_focus() {
            self.completed_focus_today += 1;
        }

        let (next_phase, next_total_secs) = self.route_next(finished);
        self.phase = next_phase;
        self.total_duration_secs = next_total_secs;
        self.time_remaining_secs = next_total_secs;
        self.manually_edited = false;

        let completion = Completion {
            phase: finished,
            duration_min,
            task_id: self.active_task_id.clone(),
            focus_sessions_today: self.completed_focus_today,
            next_phase,
            at: Utc::now(),
        };
        self.notify_session_completed(&completion);
        self.notify_phase_changed(finished, next_phase);

        Event::SessionCompleted {
            phase: completion.phase,
            duration_min: completion.duration_min,
            focus_sessions_today: completion.focus_sessions_today,
            next_phase: completion.next_phase,
            task_id: completion.task_id,
            at: completion.at,
        }
    }

    /// Pick the phase that follows `finished`: the next sequence step when
    /// a sequence is active (cyclic, wrapping at the end), otherwise the
    /// standard Pomodoro routing.
    fn route_next(&mut self, finished: Phase) -> (Phase, u64) {
        if let Some(seq) = self.sequence.as_mut() {
            if !seq.steps.is_empty() {
                seq.index = (seq.index + 1) % seq.steps.len();
                let step = seq.steps[seq.index];
                return (step.phase, step.duration_secs());
            }
        }
        let next = if finished.is_focus() {
            if self.completed_focus_today % self.durations.cycle_len() == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            }
        } else {
            Phase::Focus
        };
        (next, self.durations.secs_for(next))
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("phase", &self.phase)
            .field("time_remaining_secs", &self.time_remaining_secs)
            .field("total_duration_secs", &self.total_duration_secs)
            .field("running", &self.running)
            .field("started_at_epoch_ms", &self.started_at_epoch_ms)
            .field("completed_focus_today", &self.completed_focus_today)
            .field("sequence", &self.sequence)
            .field("manually_edited", &self.manually_edited)
            .field("active_task_id", &self.active_task_id)
            .field("durations", &self.durations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn engine() -> TimerEngine {
        TimerEngine::new(PhaseDurations::default())
    }

    fn complete_running_phase(engine: &mut TimerEngine, now_ms: u64) -> u64 {
        let deadline = now_ms + engine.time_remaining_secs() * 1000 + 1;
        let event = engine.tick(deadline);
        assert!(matches!(event, Some(Event::SessionCompleted { .. })));
        deadline
    }

    #[test]
    fn fresh_start_scenario() {
        let mut e = engine();
        assert_eq!(e.phase(), Phase::Focus);
        assert_eq!(e.time_remaining_secs(), 1500);
        assert_eq!(e.total_duration_secs(), 1500);
        assert!(!e.is_running());

        e.start(T0).unwrap();
        let done = e.tick(T0 + 1500 * 1000);
        assert!(matches!(done, Some(Event::SessionCompleted { .. })));
        assert_eq!(e.completed_focus_today(), 1);
        assert_eq!(e.phase(), Phase::ShortBreak);
        assert_eq!(e.time_remaining_secs(), 300);
        assert!(!e.is_running());
    }

    #[test]
    fn late_tick_lands_on_zero_and_completes_once() {
        let mut e = engine();
        e.start(T0).unwrap();
        let event = e.tick(T0 + 1_500_001);
        assert!(matches!(event, Some(Event::SessionCompleted { .. })));
        assert_eq!(e.time_remaining_secs(), e.total_duration_secs());
        assert_eq!(e.phase(), Phase::ShortBreak);
        // Engine is paused in the next phase; further ticks are no-ops.
        assert!(e.tick(T0 + 2_000_000).is_none());
        assert_eq!(e.completed_focus_today(), 1);
    }

    #[test]
    fn paused_time_does_not_count() {
        let mut e = engine();
        e.start(T0).unwrap();
        e.tick(T0 + 10_000);
        assert_eq!(e.time_remaining_secs(), 1490);

        assert!(e.pause().is_some());
        e.start(T0 + 60_000).unwrap();
        e.tick(T0 + 65_000);
        assert_eq!(e.time_remaining_secs(), 1485);
    }

    #[test]
    fn pause_is_idempotent() {
        let mut e = engine();
        e.start(T0).unwrap();
        e.tick(T0 + 5_000);
        assert!(e.pause().is_some());
        let frozen = e.time_remaining_secs();
        assert!(e.pause().is_none());
        assert_eq!(e.time_remaining_secs(), frozen);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut e = engine();
        e.start(T0).unwrap();
        assert!(matches!(
            e.start(T0 + 1000),
            Err(TimerError::AlreadyRunning)
        ));
    }

    #[test]
    fn cannot_start_empty_focus_session() {
        let mut e = engine();
        e.apply_settings(PhaseDurations {
            focus_min: 0,
            ..PhaseDurations::default()
        });
        assert_eq!(e.time_remaining_secs(), 0);
        assert!(matches!(e.start(T0), Err(TimerError::EmptyFocusSession)));
        assert!(!e.is_running());
        assert_eq!(e.time_remaining_secs(), 0);

        // Recoverable: edit the time, then start.
        e.edit_time(1, 0).unwrap();
        e.start(T0).unwrap();
        assert!(e.is_running());
    }

    #[test]
    fn break_may_start_at_zero_and_completes_on_first_tick() {
        let mut e = engine();
        e.switch_phase(Phase::ShortBreak);
        e.edit_time(0, 0).unwrap();
        assert_eq!(e.time_remaining_secs(), 0);
        e.start(T0).unwrap();
        let event = e.tick(T0 + 1);
        assert!(matches!(event, Some(Event::SessionCompleted { .. })));
        assert_eq!(e.phase(), Phase::Focus);
        assert_eq!(e.completed_focus_today(), 0);
    }

    #[test]
    fn fourth_completion_routes_to_long_break_fifth_to_short() {
        let mut e = engine();
        let mut now = T0;
        for expected in [
            Phase::ShortBreak,
            Phase::ShortBreak,
            Phase::ShortBreak,
            Phase::LongBreak,
            Phase::ShortBreak,
        ] {
            assert_eq!(e.phase(), Phase::Focus);
            e.start(now).unwrap();
            now = complete_running_phase(&mut e, now);
            assert_eq!(e.phase(), expected);

            e.start(now).unwrap();
            now = complete_running_phase(&mut e, now);
            assert_eq!(e.phase(), Phase::Focus);
        }
        assert_eq!(e.completed_focus_today(), 5);
    }

    #[test]
    fn sequence_loops_back_to_first_step() {
        let mut e = engine();
        e.use_sequence(vec![
            SequenceStep::new(Phase::Focus, 10),
            SequenceStep::new(Phase::ShortBreak, 5),
            SequenceStep::new(Phase::Focus, 15),
        ])
        .unwrap();
        assert_eq!(e.sequence().map(|s| s.index()), Some(0));
        assert_eq!(e.total_duration_secs(), 600);

        let mut now = T0;
        e.start(now).unwrap();
        now = complete_running_phase(&mut e, now);
        assert_eq!(e.sequence().map(|s| s.index()), Some(1));
        assert_eq!(e.phase(), Phase::ShortBreak);

        e.start(now).unwrap();
        now = complete_running_phase(&mut e, now);
        assert_eq!(e.sequence().map(|s| s.index()), Some(2));
        assert_eq!(e.total_duration_secs(), 900);

        e.start(now).unwrap();
        complete_running_phase(&mut e, now);
        assert_eq!(e.sequence().map(|s| s.index()), Some(0));
        assert_eq!(e.phase(), Phase::Focus);
        assert_eq!(e.total_duration_secs(), 600);
    }

    #[test]
    fn switching_phase_exits_sequence_mode() {
        let mut e = engine();
        e.use_sequence(vec![SequenceStep::new(Phase::Focus, 10)]).unwrap();
        assert!(e.sequence().is_some());
        e.switch_phase(Phase::ShortBreak);
        assert!(e.sequence().is_none());
        assert_eq!(e.time_remaining_secs(), 300);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let mut e = engine();
        assert!(matches!(
            e.use_sequence(vec![]),
            Err(TimerError::EmptySequence)
        ));
        assert!(e.sequence().is_none());
    }

    #[test]
    fn focus_edit_to_zero_clamps_to_one_minute() {
        let mut e = engine();
        let event = e.edit_time(0, 0).unwrap();
        match event {
            Event::TimeEdited {
                remaining_secs,
                clamped_to_minimum,
                ..
            } => {
                assert_eq!(remaining_secs, 60);
                assert!(clamped_to_minimum);
            }
            other => panic!("expected TimeEdited, got {other:?}"),
        }
        assert_eq!(e.time_remaining_secs(), 60);
        assert_eq!(e.total_duration_secs(), 60);
    }

    #[test]
    fn out_of_range_edit_is_rejected_and_state_kept() {
        let mut e = engine();
        assert!(matches!(
            e.edit_time(181, 0),
            Err(TimerError::InvalidEdit(_))
        ));
        assert!(matches!(
            e.edit_time(10, 60),
            Err(TimerError::InvalidEdit(_))
        ));
        assert_eq!(e.time_remaining_secs(), 1500);
        assert_eq!(e.total_duration_secs(), 1500);
    }

    #[test]
    fn edit_while_running_is_rejected() {
        let mut e = engine();
        e.start(T0).unwrap();
        assert!(matches!(
            e.edit_time(10, 0),
            Err(TimerError::EditWhileRunning)
        ));
    }

    #[test]
    fn edit_resets_progress_baseline() {
        let mut e = engine();
        e.start(T0).unwrap();
        e.tick(T0 + 10_000);
        e.pause();
        e.edit_time(10, 30).unwrap();
        assert_eq!(e.time_remaining_secs(), 630);
        assert_eq!(e.total_duration_secs(), 630);
        // Resume counts from the edited baseline.
        e.start(T0 + 60_000).unwrap();
        e.tick(T0 + 70_000);
        assert_eq!(e.time_remaining_secs(), 620);
    }

    #[test]
    fn cycle_progress_shows_full_cycle_at_boundary() {
        let mut e = engine();
        assert_eq!(e.cycle_progress(), (0, 4));

        let mut now = T0;
        for _ in 0..3 {
            e.start(now).unwrap();
            now = complete_running_phase(&mut e, now);
            e.start(now).unwrap();
            now = complete_running_phase(&mut e, now);
        }
        assert_eq!(e.cycle_progress(), (3, 4));

        e.start(now).unwrap();
        now = complete_running_phase(&mut e, now);
        // Right after the 4th completion: 4/4, not 0/4.
        assert_eq!(e.phase(), Phase::LongBreak);
        assert_eq!(e.cycle_progress(), (4, 4));

        e.start(now).unwrap();
        complete_running_phase(&mut e, now);
        assert_eq!(e.cycle_progress(), (4, 4));
    }

    #[test]
    fn settings_apply_immediately_when_paused_and_untouched() {
        let mut e = engine();
        let durations = PhaseDurations {
            focus_min: 50,
            ..PhaseDurations::default()
        };
        e.apply_settings(durations);
        assert_eq!(e.time_remaining_secs(), 3000);
        assert_eq!(e.total_duration_secs(), 3000);
    }

    #[test]
    fn settings_are_deferred_while_running() {
        let mut e = engine();
        e.start(T0).unwrap();
        let durations = PhaseDurations {
            focus_min: 50,
            short_break_min: 10,
            ..PhaseDurations::default()
        };
        e.apply_settings(durations);
        e.tick(T0 + 10_000);
        assert_eq!(e.total_duration_secs(), 1500);
        assert_eq!(e.time_remaining_secs(), 1490);

        // Next phase adopts the new durations.
        complete_running_phase(&mut e, T0 + 10_000);
        assert_eq!(e.phase(), Phase::ShortBreak);
        assert_eq!(e.total_duration_secs(), 600);
    }

    #[test]
    fn settings_do_not_override_manual_edit() {
        let mut e = engine();
        e.edit_time(10, 0).unwrap();
        e.apply_settings(PhaseDurations {
            focus_min: 50,
            ..PhaseDurations::default()
        });
        assert_eq!(e.time_remaining_secs(), 600);
    }

    #[test]
    fn reset_restores_sequence_step_duration() {
        let mut e = engine();
        e.use_sequence(vec![SequenceStep::new(Phase::Focus, 10)]).unwrap();
        e.start(T0).unwrap();
        e.tick(T0 + 30_000);
        assert_eq!(e.time_remaining_secs(), 570);
        e.reset();
        assert_eq!(e.time_remaining_secs(), 600);
        assert!(!e.is_running());
        assert!(e.sequence().is_some());
    }

    #[test]
    fn detach_sequence_keeps_countdown_untouched() {
        let mut e = engine();
        e.use_sequence(vec![SequenceStep::new(Phase::Focus, 10)]).unwrap();
        e.start(T0).unwrap();
        e.tick(T0 + 5_000);
        e.detach_sequence();
        assert!(e.sequence().is_none());
        assert!(e.is_running());
        assert_eq!(e.time_remaining_secs(), 595);
    }

    #[test]
    fn completion_credits_active_task() {
        let mut e = engine();
        e.set_active_task(Some("task-1".into()));
        e.start(T0).unwrap();
        let event = e.tick(T0 + 1_500_000);
        match event {
            Some(Event::SessionCompleted { task_id, phase, .. }) => {
                assert_eq!(task_id.as_deref(), Some("task-1"));
                assert_eq!(phase, Phase::Focus);
            }
            other => panic!("expected SessionCompleted, got {other:?}"),
        }
    }

    #[test]
    fn observers_hear_completions_and_phase_changes() {
        use std::sync::{Arc, Mutex};

        struct Recorder {
            completions: Arc<Mutex<Vec<Phase>>>,
            changes: Arc<Mutex<Vec<(Phase, Phase)>>>,
        }

        impl TimerObserver for Recorder {
            fn on_phase_changed(&mut self, from: Phase, to: Phase) {
                self.changes.lock().unwrap().push((from, to));
            }
            fn on_session_completed(&mut self, completion: &Completion) {
                self.completions.lock().unwrap().push(completion.phase);
            }
        }

        let completions = Arc::new(Mutex::new(Vec::new()));
        let changes = Arc::new(Mutex::new(Vec::new()));
        let mut e = engine();
        e.subscribe(Box::new(Recorder {
            completions: completions.clone(),
            changes: changes.clone(),
        }));

        e.start(T0).unwrap();
        e.tick(T0 + 1_500_000);
        assert_eq!(*completions.lock().unwrap(), vec![Phase::Focus]);
        assert_eq!(
            *changes.lock().unwrap(),
            vec![(Phase::Focus, Phase::ShortBreak)]
        );
    }

    #[test]
    fn engine_serde_round_trip_preserves_state() {
        let mut e = engine();
        e.start(T0).unwrap();
        e.tick(T0 + 10_000);
        e.pause();
        e.set_active_task(Some("t".into()));

        let json = serde_json::to_string(&e).unwrap();
        let restored: TimerEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.phase(), e.phase());
        assert_eq!(restored.time_remaining_secs(), 1490);
        assert_eq!(restored.total_duration_secs(), 1500);
        assert!(!restored.is_running());
        assert_eq!(restored.active_task_id(), Some("t"));
    }
}
