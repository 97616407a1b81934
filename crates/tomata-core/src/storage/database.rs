//! SQLite-based persistent storage.
//!
//! Holds everything the app remembers between invocations:
//! - Completed focus sessions
//! - Tasks and their pomodoro counts
//! - Saved sequences (steps stored as a JSON column)
//! - Key-value store for engine state, streak, and active markers

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::{CoreError, DatabaseError};
use crate::sequence::StoredSequence;
use crate::stats::{AllTimeSummary, RecentSession, SessionRecord};
use crate::task::Task;
use crate::timer::SequenceStep;

/// Keys used in the kv table.
pub mod keys {
    /// Serialized `TimerEngine`.
    pub const TIMER_ENGINE: &str = "timer_engine";
    /// Serialized `StreakRecord`.
    pub const STREAK: &str = "streak";
    /// Id of the sequence currently in use.
    pub const ACTIVE_SEQUENCE: &str = "active_sequence";
    /// Id of the task selected for the session.
    pub const ACTIVE_TASK: &str = "active_task";
}

/// SQLite database at `~/.config/tomata/tomata.db`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database, creating the file and schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = super::data_dir()?.join("tomata.db");
        tracing::debug!("opening database at {}", path.display());
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id      TEXT,
                duration_min INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id           TEXT PRIMARY KEY,
                title        TEXT NOT NULL,
                completed    INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                completed_at TEXT,
                pomodoros    INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS sequences (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                steps      TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks(completed);",
        )?;
        Ok(())
    }

    // --- sessions ---

    /// Record a completed focus session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        task_id: Option<&str>,
        duration_min: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sessions (task_id, duration_min, completed_at)
             VALUES (?1, ?2, ?3)",
            params![task_id, duration_min, completed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Sessions completed in `[start, end)`, oldest first.
    pub fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, duration_min, completed_at
             FROM sessions
             WHERE completed_at >= ?1 AND completed_at < ?2
             ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map(
            params![start.to_rfc3339(), end.to_rfc3339()],
            Self::session_from_row,
        )?;
        rows.collect()
    }

    /// Every recorded session, oldest first.
    pub fn all_sessions(&self) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, duration_min, completed_at
             FROM sessions
             ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map([], Self::session_from_row)?;
        rows.collect()
    }

    /// The `limit` most recent sessions, newest first, joined with the
    /// title of the task each one credited.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<RecentSession>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT s.completed_at, s.duration_min, t.title
             FROM sessions s
             LEFT JOIN tasks t ON s.task_id = t.id
             ORDER BY s.completed_at DESC, s.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(RecentSession {
                completed_at: parse_timestamp(0, row.get(0)?)?,
                duration_min: row.get(1)?,
                task_title: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    pub fn all_time_summary(&self) -> Result<AllTimeSummary, rusqlite::Error> {
        self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_min), 0) FROM sessions",
            [],
            |row| {
                Ok(AllTimeSummary {
                    focus_sessions: row.get(0)?,
                    focus_minutes: row.get(1)?,
                })
            },
        )
    }

    fn session_from_row(row: &rusqlite::Row<'_>) -> Result<SessionRecord, rusqlite::Error> {
        Ok(SessionRecord {
            id: row.get(0)?,
            task_id: row.get(1)?,
            duration_min: row.get(2)?,
            completed_at: parse_timestamp(3, row.get(3)?)?,
        })
    }

    // --- tasks ---

    pub fn insert_task(&self, task: &Task) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO tasks (id, title, completed, created_at, completed_at, pomodoros)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.title,
                task.completed,
                task.created_at.to_rfc3339(),
                task.completed_at.map(|t| t.to_rfc3339()),
                task.pomodoros,
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, completed, created_at, completed_at, pomodoros
             FROM tasks WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], Self::task_from_row) {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Tasks in creation order. With `include_completed` false, only the
    /// ones still open.
    pub fn list_tasks(&self, include_completed: bool) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, completed, created_at, completed_at, pomodoros
             FROM tasks
             WHERE completed = 0 OR ?1
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![include_completed], Self::task_from_row)?;
        rows.collect()
    }

    /// Overwrite a task row. Returns false if no such task exists.
    pub fn update_task(&self, task: &Task) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2, completed = ?3, completed_at = ?4, pomodoros = ?5
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.completed,
                task.completed_at.map(|t| t.to_rfc3339()),
                task.pomodoros,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Credit one pomodoro to a task. Returns false if no such task exists.
    pub fn increment_task_pomodoros(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE tasks SET pomodoros = pomodoros + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Delete every completed task, returning how many went away.
    pub fn delete_completed_tasks(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM tasks WHERE completed = 1", [])
    }

    fn task_from_row(row: &rusqlite::Row<'_>) -> Result<Task, rusqlite::Error> {
        let completed_at: Option<String> = row.get(4)?;
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            completed: row.get(2)?,
            created_at: parse_timestamp(3, row.get(3)?)?,
            completed_at: completed_at.map(|s| parse_timestamp(4, s)).transpose()?,
            pomodoros: row.get(5)?,
        })
    }

    // --- sequences ---

    pub fn insert_sequence(&self, seq: &StoredSequence) -> Result<(), rusqlite::Error> {
        let steps = serde_json::to_string(&seq.steps)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            "INSERT INTO sequences (id, name, steps, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seq.id,
                seq.name,
                steps,
                seq.created_at.to_rfc3339(),
                seq.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_sequence(&self, id: &str) -> Result<Option<StoredSequence>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, steps, created_at, updated_at
             FROM sequences WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], Self::sequence_from_row) {
            Ok(seq) => Ok(Some(seq)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_sequences(&self) -> Result<Vec<StoredSequence>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, steps, created_at, updated_at
             FROM sequences
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], Self::sequence_from_row)?;
        rows.collect()
    }

    pub fn delete_sequence(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let changed = self
            .conn
            .execute("DELETE FROM sequences WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn sequence_from_row(row: &rusqlite::Row<'_>) -> Result<StoredSequence, rusqlite::Error> {
        let steps_json: String = row.get(2)?;
        let steps: Vec<SequenceStep> = serde_json::from_str(&steps_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(StoredSequence {
            id: row.get(0)?,
            name: row.get(1)?,
            steps,
            created_at: parse_timestamp(3, row.get(3)?)?,
            updated_at: parse_timestamp(4, row.get(4)?)?,
        })
    }

    // --- key-value ---

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // --- maintenance ---

    /// Delete every row in every table. The schema stays in place.
    pub fn reset_all_data(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "DELETE FROM sessions;
             DELETE FROM tasks;
             DELETE FROM sequences;
             DELETE FROM kv;",
        )
    }
}

fn parse_timestamp(idx: usize, value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Phase;
    use chrono::Duration;

    #[test]
    fn record_and_query_sessions() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_session(None, 25, now - Duration::hours(2)).unwrap();
        db.record_session(None, 15, now).unwrap();

        let all = db.all_sessions().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].duration_min, 25);

        let recent = db
            .sessions_between(now - Duration::hours(1), now + Duration::hours(1))
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].duration_min, 15);

        let summary = db.all_time_summary().unwrap();
        assert_eq!(summary.focus_sessions, 2);
        assert_eq!(summary.focus_minutes, 40);
    }

    #[test]
    fn recent_sessions_join_task_titles() {
        let db = Database::open_memory().unwrap();
        let task = Task::new("write tests").unwrap();
        db.insert_task(&task).unwrap();
        let now = Utc::now();
        db.record_session(Some(&task.id), 25, now - Duration::minutes(30))
            .unwrap();
        db.record_session(None, 25, now).unwrap();

        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first; the untracked one has no title.
        assert!(recent[0].task_title.is_none());
        assert_eq!(recent[1].task_title.as_deref(), Some("write tests"));
    }

    #[test]
    fn task_crud_round_trip() {
        let db = Database::open_memory().unwrap();
        let mut task = Task::new("refactor parser").unwrap();
        db.insert_task(&task).unwrap();

        let fetched = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(fetched, task);

        task.set_completed(true);
        assert!(db.update_task(&task).unwrap());
        assert!(db.get_task(&task.id).unwrap().unwrap().completed);

        assert_eq!(db.list_tasks(false).unwrap().len(), 0);
        assert_eq!(db.list_tasks(true).unwrap().len(), 1);

        assert!(db.delete_task(&task.id).unwrap());
        assert!(db.get_task(&task.id).unwrap().is_none());
        assert!(!db.delete_task(&task.id).unwrap());
    }

    #[test]
    fn pomodoro_increment_is_atomic() {
        let db = Database::open_memory().unwrap();
        let task = Task::new("t").unwrap();
        db.insert_task(&task).unwrap();
        assert!(db.increment_task_pomodoros(&task.id).unwrap());
        assert!(db.increment_task_pomodoros(&task.id).unwrap());
        assert_eq!(db.get_task(&task.id).unwrap().unwrap().pomodoros, 2);
        assert!(!db.increment_task_pomodoros("missing").unwrap());
    }

    #[test]
    fn clear_done_removes_only_completed() {
        let db = Database::open_memory().unwrap();
        let mut done = Task::new("done").unwrap();
        done.set_completed(true);
        let open = Task::new("open").unwrap();
        db.insert_task(&done).unwrap();
        db.insert_task(&open).unwrap();

        assert_eq!(db.delete_completed_tasks().unwrap(), 1);
        let left = db.list_tasks(true).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].title, "open");
    }

    #[test]
    fn sequence_round_trip() {
        let db = Database::open_memory().unwrap();
        let seq = StoredSequence::new(
            "sprint",
            vec![
                SequenceStep::new(Phase::Focus, 10),
                SequenceStep::new(Phase::ShortBreak, 5),
            ],
        )
        .unwrap();
        db.insert_sequence(&seq).unwrap();

        let fetched = db.get_sequence(&seq.id).unwrap().unwrap();
        assert_eq!(fetched, seq);
        assert_eq!(db.list_sequences().unwrap().len(), 1);

        assert!(db.delete_sequence(&seq.id).unwrap());
        assert!(db.get_sequence(&seq.id).unwrap().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "goodbye").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "goodbye");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn reset_wipes_every_table() {
        let db = Database::open_memory().unwrap();
        db.record_session(None, 25, Utc::now()).unwrap();
        db.insert_task(&Task::new("t").unwrap()).unwrap();
        db.kv_set(keys::STREAK, "{}").unwrap();

        db.reset_all_data().unwrap();
        assert!(db.all_sessions().unwrap().is_empty());
        assert!(db.list_tasks(true).unwrap().is_empty());
        assert!(db.kv_get(keys::STREAK).unwrap().is_none());
    }
}
