//! Task management commands.

use clap::Subcommand;
use tomata_core::storage::database::keys;
use tomata_core::storage::Database;
use tomata_core::Task;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
    },
    /// List open tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Mark a task complete
    Done {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Remove {
        /// Task ID
        id: String,
    },
    /// Select the task credited by focus sessions
    Select {
        /// Task ID
        id: String,
    },
    /// Clear the task selection
    Unselect,
    /// Delete every completed task
    ClearDone,
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TaskAction::Add { title } => {
            let task = Task::new(&title)?;
            db.insert_task(&task)?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { all } => {
            let tasks = db.list_tasks(all)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Done { id } => {
            let mut task = db.get_task(&id)?.ok_or(format!("Task not found: {id}"))?;
            task.set_completed(true);
            db.update_task(&task)?;
            println!("Task completed: {id}");
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Remove { id } => {
            if !db.delete_task(&id)? {
                return Err(format!("Task not found: {id}").into());
            }
            clear_selection_if_missing(&db)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Select { id } => {
            let task = db.get_task(&id)?.ok_or(format!("Task not found: {id}"))?;
            db.kv_set(keys::ACTIVE_TASK, &task.id)?;
            println!("Task selected: {} ({})", task.title, task.id);
        }
        TaskAction::Unselect => {
            db.kv_delete(keys::ACTIVE_TASK)?;
            println!("Task selection cleared");
        }
        TaskAction::ClearDone => {
            let removed = db.delete_completed_tasks()?;
            clear_selection_if_missing(&db)?;
            println!("Removed {removed} completed task(s)");
        }
    }
    Ok(())
}

/// Drop the selection marker when it no longer points at a real row.
fn clear_selection_if_missing(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(id) = db.kv_get(keys::ACTIVE_TASK)? {
        if db.get_task(&id)?.is_none() {
            db.kv_delete(keys::ACTIVE_TASK)?;
        }
    }
    Ok(())
}
