//! Saved sequence commands.

use clap::Subcommand;
use tomata_core::storage::database::keys;
use tomata_core::storage::Database;
use tomata_core::timer::{Phase, SequenceStep};
use tomata_core::{Config, StoredSequence};

use crate::session;

#[derive(Subcommand)]
pub enum SequenceAction {
    /// Create a named sequence
    Create {
        /// Sequence name
        name: String,
        /// Steps as phase:minutes pairs, e.g. "focus:10,short-break:5,focus:15"
        #[arg(long)]
        steps: String,
    },
    /// List saved sequences
    List,
    /// Show one sequence
    Show {
        /// Sequence ID
        id: String,
    },
    /// Follow a sequence, jumping to its first step
    Use {
        /// Sequence ID
        id: String,
    },
    /// Leave sequence mode and return to the standard cycle
    Clear,
    /// Delete a sequence
    Delete {
        /// Sequence ID
        id: String,
    },
}

pub fn run(action: SequenceAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SequenceAction::Create { name, steps } => {
            let steps = parse_steps(&steps)?;
            let seq = StoredSequence::new(&name, steps)?;
            db.insert_sequence(&seq)?;
            println!("Sequence created: {}", seq.id);
            println!("{}", serde_json::to_string_pretty(&seq)?);
        }
        SequenceAction::List => {
            let sequences = db.list_sequences()?;
            println!("{}", serde_json::to_string_pretty(&sequences)?);
        }
        SequenceAction::Show { id } => match db.get_sequence(&id)? {
            Some(seq) => println!("{}", serde_json::to_string_pretty(&seq)?),
            None => println!("Sequence not found: {id}"),
        },
        SequenceAction::Use { id } => {
            let seq = db
                .get_sequence(&id)?
                .ok_or(format!("Sequence not found: {id}"))?;
            let config = Config::load_or_default();
            let (mut engine, _) = session::rehydrate(&db, &config)?;
            let event = engine.use_sequence(seq.steps.clone())?;
            db.kv_set(keys::ACTIVE_SEQUENCE, &seq.id)?;
            session::save_engine(&db, &engine)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        SequenceAction::Clear => {
            let config = Config::load_or_default();
            let (mut engine, _) = session::rehydrate(&db, &config)?;
            db.kv_delete(keys::ACTIVE_SEQUENCE)?;
            match engine.clear_sequence() {
                Some(event) => {
                    session::save_engine(&db, &engine)?;
                    println!("{}", serde_json::to_string_pretty(&event)?);
                }
                None => println!("no sequence in use"),
            }
        }
        SequenceAction::Delete { id } => {
            if !db.delete_sequence(&id)? {
                return Err(format!("Sequence not found: {id}").into());
            }
            if db.kv_get(keys::ACTIVE_SEQUENCE)?.as_deref() == Some(id.as_str()) {
                // The sequence in use went away; rehydrate detaches it.
                db.kv_delete(keys::ACTIVE_SEQUENCE)?;
                let config = Config::load_or_default();
                let (engine, _) = session::rehydrate(&db, &config)?;
                session::save_engine(&db, &engine)?;
            }
            println!("Sequence deleted: {id}");
        }
    }
    Ok(())
}

/// Parse "focus:10,short-break:5" into sequence steps.
fn parse_steps(spec: &str) -> Result<Vec<SequenceStep>, Box<dyn std::error::Error>> {
    let mut steps = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (phase, minutes) = part
            .split_once(':')
            .ok_or_else(|| format!("invalid step '{part}' (expected phase:minutes)"))?;
        let phase: Phase = phase.parse()?;
        let minutes: u64 = minutes
            .trim()
            .parse()
            .map_err(|_| format!("invalid minutes in step '{part}'"))?;
        steps.push(SequenceStep::new(phase, minutes));
    }
    Ok(steps)
}
