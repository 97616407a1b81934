use std::io::Write;

use clap::Subcommand;
use tomata_core::storage::database::keys;
use tomata_core::storage::Database;
use tomata_core::timer::Phase;
use tomata_core::{Config, TimerEngine};

use crate::session::{self, now_ms};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start,
    /// Resume a paused countdown (alias for start)
    Resume,
    /// Pause the countdown, freezing the remaining time
    Pause,
    /// Stop and restore the current phase to its full duration
    Reset,
    /// Switch phase, leaving any sequence
    Switch {
        /// Target phase: focus, short-break, or long-break
        phase: String,
    },
    /// Set the remaining time while paused
    Edit {
        /// New remaining time as MM:SS (minutes 0-180)
        time: String,
    },
    /// Print current timer state as JSON
    Status,
    /// Render a live countdown until the phase completes
    Watch,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let (mut engine, completed) = session::rehydrate(&db, &config)?;
    if let Some(event) = &completed {
        println!("{}", serde_json::to_string_pretty(event)?);
    }

    match action {
        TimerAction::Start | TimerAction::Resume => {
            let event = engine.start(now_ms())?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Pause => match engine.pause() {
            Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
            None => println!("{}", serde_json::to_string_pretty(&engine.snapshot())?),
        },
        TimerAction::Reset => {
            let event = engine.reset();
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Switch { phase } => {
            let target: Phase = phase.parse()?;
            let event = engine.switch_phase(target);
            db.kv_delete(keys::ACTIVE_SEQUENCE)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Edit { time } => {
            let (minutes, seconds) = parse_mmss(&time)?;
            let event = engine.edit_time(minutes, seconds)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        TimerAction::Watch => watch(&db, &config, &mut engine)?,
    }

    session::save_engine(&db, &engine)?;
    Ok(())
}

/// Tick once a second, redrawing the countdown in place, until the phase
/// completes. The engine in the kv store stays behind while the loop runs;
/// remaining time is wall-clock derived, so that staleness is harmless.
fn watch(
    db: &Database,
    config: &Config,
    engine: &mut TimerEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    if !engine.is_running() {
        println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        return Ok(());
    }
    loop {
        if let Some(event) = engine.tick(now_ms()) {
            println!();
            session::apply_completion(db, config, &event)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
            return Ok(());
        }
        let remaining = engine.time_remaining_secs();
        print!(
            "\r{} {:02}:{:02}  ",
            engine.phase().label(),
            remaining / 60,
            remaining % 60
        );
        std::io::stdout().flush()?;
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}

fn parse_mmss(s: &str) -> Result<(u64, u64), Box<dyn std::error::Error>> {
    let (m, sec) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{s}' (expected MM:SS)"))?;
    let minutes: u64 = m
        .trim()
        .parse()
        .map_err(|_| format!("invalid minutes in '{s}'"))?;
    let seconds: u64 = sec
        .trim()
        .parse()
        .map_err(|_| format!("invalid seconds in '{s}'"))?;
    Ok((minutes, seconds))
}

#[cfg(test)]
mod tests {
    use super::parse_mmss;

    #[test]
    fn parses_minutes_and_seconds() {
        assert_eq!(parse_mmss("25:00").unwrap(), (25, 0));
        assert_eq!(parse_mmss("0:45").unwrap(), (0, 45));
        assert_eq!(parse_mmss(" 5 : 30 ").unwrap(), (5, 30));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_mmss("25").is_err());
        assert!(parse_mmss("a:b").is_err());
        assert!(parse_mmss("").is_err());
    }
}
