use clap::Subcommand;
use tomata_core::storage::Database;
use tomata_core::Config;

use crate::session;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.focus_minutes")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            if key.starts_with("timer.") {
                propagate_durations(&config)?;
            }
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            propagate_durations(&config)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

/// Push changed timer durations into the stored engine. A paused,
/// untouched phase adopts its new duration immediately; a running
/// countdown keeps its baseline until the next phase.
fn propagate_durations(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let (mut engine, _) = session::rehydrate(&db, config)?;
    engine.apply_settings(config.durations());
    session::save_engine(&db, &engine)
}
