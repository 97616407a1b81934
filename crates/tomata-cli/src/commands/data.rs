//! Backup, restore, and reset of stored data.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use tomata_core::stats::SessionRecord;
use tomata_core::storage::database::keys;
use tomata_core::storage::Database;
use tomata_core::{Config, StoredSequence, StreakRecord, Task};

use crate::session;

#[derive(Subcommand)]
pub enum DataAction {
    /// Write a JSON backup of config, tasks, sequences, sessions, and streak
    Export {
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Restore a backup, replacing all stored data
    Import {
        /// Backup file produced by `data export`
        input: PathBuf,
    },
    /// Delete all stored data and restore the default config
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize, Deserialize)]
struct ExportPayload {
    app: String,
    version: String,
    exported_at: DateTime<Utc>,
    config: Config,
    tasks: Vec<Task>,
    sequences: Vec<StoredSequence>,
    sessions: Vec<SessionRecord>,
    streak: StreakRecord,
}

pub fn run(action: DataAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        DataAction::Export { output } => {
            let payload = ExportPayload {
                app: "tomata".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                exported_at: Utc::now(),
                config: Config::load_or_default(),
                tasks: db.list_tasks(true)?,
                sequences: db.list_sequences()?,
                sessions: db.all_sessions()?,
                streak: session::load_streak(&db),
            };
            let json = serde_json::to_string_pretty(&payload)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        DataAction::Import { input } => {
            let json = std::fs::read_to_string(&input)?;
            let payload: ExportPayload = serde_json::from_str(&json)?;
            if payload.app != "tomata" {
                return Err(format!("not a tomata backup: app is '{}'", payload.app).into());
            }

            db.reset_all_data()?;
            for task in &payload.tasks {
                db.insert_task(task)?;
            }
            for seq in &payload.sequences {
                db.insert_sequence(seq)?;
            }
            for s in &payload.sessions {
                db.record_session(s.task_id.as_deref(), s.duration_min, s.completed_at)?;
            }
            db.kv_set(keys::STREAK, &serde_json::to_string(&payload.streak)?)?;
            payload.config.save()?;
            println!(
                "Imported {} task(s), {} sequence(s), {} session(s)",
                payload.tasks.len(),
                payload.sequences.len(),
                payload.sessions.len()
            );
        }
        DataAction::Reset { yes } => {
            if !yes {
                return Err("refusing to delete data without --yes".into());
            }
            db.reset_all_data()?;
            Config::default().save()?;
            println!("All data removed");
        }
    }
    Ok(())
}
