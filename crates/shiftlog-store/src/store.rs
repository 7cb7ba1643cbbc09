use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{types::Value, Connection, OptionalExtension};
use shiftlog_core::types::{
    format_timestamp, LogId, NewTask, NewWorkLog, Task, UserId, UserSettings, WorkLog,
};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::rows::{
    decode_all, read_task, read_work_log, RawTask, RawWorkLog, TASK_COLUMNS, WORK_LOG_COLUMNS,
};

/// Ordering applied to work-log listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOrder {
    /// Newest first by `start_time` (history views).
    #[default]
    StartTimeDesc,
    /// Insertion order (day adjustments pick the last row).
    IdAsc,
}

/// Filter for `WorkStore::logs`. Both bounds are inclusive on `start_time`.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub order: LogOrder,
}

/// Column patch for `WorkStore::update_log`. `None` leaves a column untouched;
/// `pause_time: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogUpdate {
    pub start_time: Option<DateTime<Utc>>,
    pub pause_time: Option<Option<DateTime<Utc>>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_seconds: Option<i64>,
}

impl LogUpdate {
    fn is_empty(&self) -> bool {
        self.start_time.is_none()
            && self.pause_time.is_none()
            && self.end_time.is_none()
            && self.total_seconds.is_none()
    }
}

/// Thread-safe row store over a single SQLite connection.
///
/// Each method holds the lock only for its own statements, so callers must
/// not assume two calls observe the same snapshot.
pub struct WorkStore {
    db: Mutex<Connection>,
}

impl WorkStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Open (or create) the database file and run schema setup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        crate::db::init_db(&conn)?;
        Ok(Self::new(conn))
    }

    /// Fresh in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        crate::db::init_db(&conn)?;
        Ok(Self::new(conn))
    }

    // ── Settings ─────────────────────────────────────────────────────────────

    /// The caller's saved settings, or `None` when they never saved any.
    #[instrument(skip(self), fields(user = %user))]
    pub fn settings(&self, user: &UserId) -> Result<Option<UserSettings>> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                "SELECT currency, hourly_rate FROM user_settings WHERE user_id = ?1",
                rusqlite::params![user.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .optional()?;

        match row {
            Some((currency, hourly_rate)) => {
                if !hourly_rate.is_finite() || hourly_rate < 0.0 {
                    return Err(StoreError::InvalidRow {
                        table: "user_settings",
                        column: "hourly_rate",
                        reason: format!("not a non-negative number: {hourly_rate}"),
                    });
                }
                Ok(Some(UserSettings {
                    currency,
                    hourly_rate,
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, settings), fields(user = %user))]
    pub fn upsert_settings(
        &self,
        user: &UserId,
        settings: &UserSettings,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let now = format_timestamp(now);
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO user_settings (user_id, currency, hourly_rate, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                currency    = excluded.currency,
                hourly_rate = excluded.hourly_rate,
                updated_at  = excluded.updated_at",
            rusqlite::params![user.as_str(), settings.currency, settings.hourly_rate, now],
        )?;
        Ok(())
    }

    // ── Work logs ────────────────────────────────────────────────────────────

    /// The caller's open log (no `end_time`), newest id first.
    #[instrument(skip(self), fields(user = %user))]
    pub fn active_log(&self, user: &UserId) -> Result<Option<WorkLog>> {
        let db = self.db.lock().unwrap();
        let raw = db
            .query_row(
                &format!(
                    "SELECT {WORK_LOG_COLUMNS} FROM work_logs
                     WHERE user_id = ?1 AND end_time IS NULL
                     ORDER BY id DESC LIMIT 1"
                ),
                rusqlite::params![user.as_str()],
                read_work_log,
            )
            .optional()?;
        raw.map(|r| r.decode()).transpose()
    }

    /// Fetch one of the caller's logs by id.
    #[instrument(skip(self), fields(user = %user))]
    pub fn get_log(&self, user: &UserId, id: LogId) -> Result<Option<WorkLog>> {
        let db = self.db.lock().unwrap();
        let raw = db
            .query_row(
                &format!("SELECT {WORK_LOG_COLUMNS} FROM work_logs WHERE id = ?1 AND user_id = ?2"),
                rusqlite::params![id, user.as_str()],
                read_work_log,
            )
            .optional()?;
        raw.map(|r| r.decode()).transpose()
    }

    /// Insert a log and return it as stored.
    ///
    /// An open log (`end_time` unset) conflicts with any other open log of the
    /// same user and fails with `StoreError::ActiveLogExists`.
    #[instrument(skip(self, log), fields(user = %log.user_id))]
    pub fn insert_log(&self, log: &NewWorkLog) -> Result<WorkLog> {
        let db = self.db.lock().unwrap();
        let inserted = db.execute(
            "INSERT INTO work_logs
             (user_id, start_time, end_time, total_seconds, hourly_rate_at_time,
              description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                log.user_id.as_str(),
                format_timestamp(log.start_time),
                log.end_time.map(format_timestamp),
                log.total_seconds,
                log.hourly_rate_at_time,
                log.description,
                format_timestamp(log.created_at),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(StoreError::ActiveLogExists {
                    user_id: log.user_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let id = db.last_insert_rowid();
        debug!(id, "work log inserted");
        let raw = db.query_row(
            &format!("SELECT {WORK_LOG_COLUMNS} FROM work_logs WHERE id = ?1"),
            rusqlite::params![id],
            read_work_log,
        )?;
        raw.decode()
    }

    /// Apply a column patch to one of the caller's logs and return the updated row.
    #[instrument(skip(self, patch), fields(user = %user))]
    pub fn update_log(&self, user: &UserId, id: LogId, patch: &LogUpdate) -> Result<WorkLog> {
        let db = self.db.lock().unwrap();

        if !patch.is_empty() {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(start) = patch.start_time {
                sets.push("start_time = ?");
                values.push(Value::Text(format_timestamp(start)));
            }
            if let Some(pause) = patch.pause_time {
                sets.push("pause_time = ?");
                values.push(match pause {
                    Some(p) => Value::Text(format_timestamp(p)),
                    None => Value::Null,
                });
            }
            if let Some(end) = patch.end_time {
                sets.push("end_time = ?");
                values.push(Value::Text(format_timestamp(end)));
            }
            if let Some(total) = patch.total_seconds {
                sets.push("total_seconds = ?");
                values.push(Value::Integer(total));
            }
            values.push(Value::Integer(id));
            values.push(Value::Text(user.to_string()));

            let sql = format!(
                "UPDATE work_logs SET {} WHERE id = ? AND user_id = ?",
                sets.join(", ")
            );
            let changed = db.execute(&sql, rusqlite::params_from_iter(values))?;
            if changed == 0 {
                return Err(StoreError::NotFound {
                    table: "work_logs",
                    id,
                });
            }
        }

        let raw = db
            .query_row(
                &format!("SELECT {WORK_LOG_COLUMNS} FROM work_logs WHERE id = ?1 AND user_id = ?2"),
                rusqlite::params![id, user.as_str()],
                read_work_log,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                table: "work_logs",
                id,
            })?;
        raw.decode()
    }

    /// List the caller's logs whose `start_time` falls within the query bounds.
    #[instrument(skip(self), fields(user = %user))]
    pub fn logs(&self, user: &UserId, query: &LogQuery) -> Result<Vec<WorkLog>> {
        let mut sql = format!("SELECT {WORK_LOG_COLUMNS} FROM work_logs WHERE user_id = ?");
        let mut values = vec![Value::Text(user.to_string())];
        if let Some(start) = query.start {
            sql.push_str(" AND start_time >= ?");
            values.push(Value::Text(format_timestamp(start)));
        }
        if let Some(end) = query.end {
            sql.push_str(" AND start_time <= ?");
            values.push(Value::Text(format_timestamp(end)));
        }
        sql.push_str(match query.order {
            LogOrder::StartTimeDesc => " ORDER BY start_time DESC, id DESC",
            LogOrder::IdAsc => " ORDER BY id ASC",
        });

        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), read_work_log)?;
        decode_all(rows, RawWorkLog::decode)
    }

    /// Delete one of the caller's logs together with its tasks.
    ///
    /// Returns the number of logs removed (0 when the id is not the caller's).
    #[instrument(skip(self), fields(user = %user))]
    pub fn delete_log(&self, user: &UserId, id: LogId) -> Result<usize> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM tasks WHERE work_log_id = ?1 AND user_id = ?2",
            rusqlite::params![id, user.as_str()],
        )?;
        let removed = tx.execute(
            "DELETE FROM work_logs WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user.as_str()],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Delete every log of the caller starting within `[start, end]`, with their tasks.
    #[instrument(skip(self), fields(user = %user))]
    pub fn delete_logs_between(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize> {
        let (start, end) = (format_timestamp(start), format_timestamp(end));
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM tasks WHERE user_id = ?1 AND work_log_id IN (
                SELECT id FROM work_logs
                WHERE user_id = ?1 AND start_time >= ?2 AND start_time <= ?3
             )",
            rusqlite::params![user.as_str(), start, end],
        )?;
        let removed = tx.execute(
            "DELETE FROM work_logs WHERE user_id = ?1 AND start_time >= ?2 AND start_time <= ?3",
            rusqlite::params![user.as_str(), start, end],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    // ── Tasks ────────────────────────────────────────────────────────────────

    /// Tasks of one of the caller's logs, oldest first.
    #[instrument(skip(self), fields(user = %user))]
    pub fn tasks_for_log(&self, user: &UserId, log_id: LogId) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE work_log_id = ?1 AND user_id = ?2
             ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(rusqlite::params![log_id, user.as_str()], read_task)?;
        decode_all(rows, RawTask::decode)
    }

    /// Most recently created task of a log, if any.
    #[instrument(skip(self), fields(user = %user))]
    pub fn latest_task(&self, user: &UserId, log_id: LogId) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        let raw = db
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE work_log_id = ?1 AND user_id = ?2
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                rusqlite::params![log_id, user.as_str()],
                read_task,
            )
            .optional()?;
        raw.map(|r| r.decode()).transpose()
    }

    #[instrument(skip(self, task), fields(user = %task.user_id, log = task.work_log_id))]
    pub fn insert_task(&self, task: &NewTask) -> Result<Task> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks (work_log_id, user_id, description, duration, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                task.work_log_id,
                task.user_id.as_str(),
                task.description,
                task.duration,
                format_timestamp(task.created_at),
            ],
        )?;
        let id = db.last_insert_rowid();
        let raw = db.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            rusqlite::params![id],
            read_task,
        )?;
        raw.decode()
    }
}
