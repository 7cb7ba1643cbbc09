use rusqlite::Connection;

use crate::error::Result;

/// Create the three tables and their indexes.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_work_logs_table(conn)?;
    create_tasks_table(conn)?;
    create_settings_table(conn)?;
    Ok(())
}

fn create_work_logs_table(conn: &Connection) -> Result<()> {
    // idx_work_logs_one_active: at most one open log per user.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS work_logs (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id             TEXT NOT NULL,
            start_time          TEXT NOT NULL,
            pause_time          TEXT,
            end_time            TEXT,
            total_seconds       INTEGER NOT NULL DEFAULT 0 CHECK (total_seconds >= 0),
            description         TEXT,
            created_at          TEXT NOT NULL,
            hourly_rate_at_time REAL
        );
        CREATE INDEX IF NOT EXISTS idx_work_logs_user_start
            ON work_logs(user_id, start_time);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_work_logs_one_active
            ON work_logs(user_id) WHERE end_time IS NULL;",
    )?;
    Ok(())
}

fn create_tasks_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            work_log_id INTEGER NOT NULL REFERENCES work_logs(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            description TEXT NOT NULL,
            duration    INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0),
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_log
            ON tasks(work_log_id, created_at);",
    )?;
    Ok(())
}

fn create_settings_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_settings (
            user_id     TEXT PRIMARY KEY NOT NULL,
            currency    TEXT NOT NULL DEFAULT 'GBP',
            hourly_rate REAL NOT NULL DEFAULT 10 CHECK (hourly_rate >= 0),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );",
    )?;
    Ok(())
}
