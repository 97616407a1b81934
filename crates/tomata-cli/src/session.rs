//! Engine persistence shared by the command modules.
//!
//! The engine lives in the kv table between invocations. Every command
//! that touches the timer rehydrates it the same way: load, reseed the
//! daily counter, validate stored markers, then tick once so a countdown
//! that ran out while no command was running completes before the new
//! command acts.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use tomata_core::storage::database::keys;
use tomata_core::storage::Database;
use tomata_core::{Config, Event, StreakRecord, TimerEngine};

use crate::notify;

pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// UTC instant of local midnight at the start of `day`.
pub fn day_start_utc(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.with_timezone(&Utc)
        }
        // Midnight skipped by a DST transition.
        chrono::LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

pub fn load_engine(db: &Database, config: &Config) -> TimerEngine {
    if let Ok(Some(json)) = db.kv_get(keys::TIMER_ENGINE) {
        if let Ok(engine) = serde_json::from_str::<TimerEngine>(&json) {
            return engine;
        }
    }
    TimerEngine::new(config.durations())
}

pub fn save_engine(db: &Database, engine: &TimerEngine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(engine)?;
    db.kv_set(keys::TIMER_ENGINE, &json)?;
    Ok(())
}

pub fn load_streak(db: &Database) -> StreakRecord {
    if let Ok(Some(json)) = db.kv_get(keys::STREAK) {
        if let Ok(streak) = serde_json::from_str::<StreakRecord>(&json) {
            return streak;
        }
    }
    StreakRecord::default()
}

pub fn save_streak(db: &Database, streak: &StreakRecord) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(streak)?;
    db.kv_set(keys::STREAK, &json)?;
    Ok(())
}

/// Focus sessions recorded on the local calendar day.
pub fn today_focus_count(db: &Database) -> Result<u32, Box<dyn std::error::Error>> {
    let today = Local::now().date_naive();
    let start = day_start_utc(today);
    let end = day_start_utc(today + Days::new(1));
    Ok(db.sessions_between(start, end)?.len() as u32)
}

/// Load the engine and bring it up to date with the wall clock.
///
/// Reseeds the daily focus counter from recorded sessions, drops markers
/// that point at deleted rows, then ticks a running countdown. A phase
/// that ran out between invocations completes here, with its side effects
/// recorded and the engine written back before the caller's command acts.
/// The completion event, if any, is returned for printing.
pub fn rehydrate(
    db: &Database,
    config: &Config,
) -> Result<(TimerEngine, Option<Event>), Box<dyn std::error::Error>> {
    let mut engine = load_engine(db, config);
    engine.set_completed_focus_today(today_focus_count(db)?);

    match db.kv_get(keys::ACTIVE_SEQUENCE)? {
        Some(seq_id) => {
            if db.get_sequence(&seq_id)?.is_none() {
                tracing::warn!("active sequence {seq_id} no longer exists; leaving sequence mode");
                engine.detach_sequence();
                db.kv_delete(keys::ACTIVE_SEQUENCE)?;
            } else if engine.sequence().is_none() {
                db.kv_delete(keys::ACTIVE_SEQUENCE)?;
            }
        }
        None => {
            if engine.sequence().is_some() {
                engine.detach_sequence();
            }
        }
    }

    match db.kv_get(keys::ACTIVE_TASK)? {
        Some(task_id) if db.get_task(&task_id)?.is_some() => {
            engine.set_active_task(Some(task_id));
        }
        Some(task_id) => {
            tracing::warn!("active task {task_id} no longer exists; clearing selection");
            db.kv_delete(keys::ACTIVE_TASK)?;
            engine.set_active_task(None);
        }
        None => engine.set_active_task(None),
    }

    let completed = if engine.is_running() {
        engine.tick(now_ms())
    } else {
        None
    };
    if let Some(event) = &completed {
        apply_completion(db, config, event)?;
        save_engine(db, &engine)?;
    }
    Ok((engine, completed))
}

/// Persist the side effects of a completed phase and announce it.
///
/// Focus completions are recorded, advance the streak, and credit the
/// selected task. Every completion, break or focus, is announced.
pub fn apply_completion(
    db: &Database,
    config: &Config,
    event: &Event,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Event::SessionCompleted {
        phase,
        duration_min,
        task_id,
        next_phase,
        at,
        ..
    } = event
    {
        if phase.is_focus() {
            db.record_session(task_id.as_deref(), *duration_min, *at)?;
            let streak = load_streak(db).advance(Local::now().date_naive());
            save_streak(db, &streak)?;
            if let Some(id) = task_id {
                if !db.increment_task_pomodoros(id)? {
                    tracing::warn!("completed focus session for missing task {id}");
                }
            }
        }
        notify::phase_complete(config, *phase, *next_phase);
    }
    Ok(())
}
