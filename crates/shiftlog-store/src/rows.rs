//! Raw row shapes and their validated conversions.
//!
//! `query_map` closures may only fail with `rusqlite::Error`, so rows are read
//! as plain columns first and decoded afterwards, where a bad value can be
//! reported as `StoreError::InvalidRow`.

use chrono::{DateTime, Utc};
use shiftlog_core::types::{parse_timestamp, Task, UserId, WorkLog};

use crate::error::{Result, StoreError};

pub(crate) const WORK_LOG_COLUMNS: &str = "id, user_id, start_time, pause_time, end_time,
     total_seconds, hourly_rate_at_time, description, created_at";

pub(crate) const TASK_COLUMNS: &str = "id, work_log_id, user_id, description, duration, created_at";

pub(crate) struct RawWorkLog {
    id: i64,
    user_id: String,
    start_time: String,
    pause_time: Option<String>,
    end_time: Option<String>,
    total_seconds: i64,
    hourly_rate_at_time: Option<f64>,
    description: Option<String>,
    created_at: String,
}

/// Column order must match `WORK_LOG_COLUMNS`.
pub(crate) fn read_work_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawWorkLog> {
    Ok(RawWorkLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        start_time: row.get(2)?,
        pause_time: row.get(3)?,
        end_time: row.get(4)?,
        total_seconds: row.get(5)?,
        hourly_rate_at_time: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl RawWorkLog {
    pub(crate) fn decode(self) -> Result<WorkLog> {
        const T: &str = "work_logs";
        if self.total_seconds < 0 {
            return Err(StoreError::InvalidRow {
                table: T,
                column: "total_seconds",
                reason: format!("negative value {}", self.total_seconds),
            });
        }
        if let Some(rate) = self.hourly_rate_at_time {
            if !rate.is_finite() || rate < 0.0 {
                return Err(StoreError::InvalidRow {
                    table: T,
                    column: "hourly_rate_at_time",
                    reason: format!("not a non-negative number: {rate}"),
                });
            }
        }
        Ok(WorkLog {
            id: self.id,
            user_id: UserId(self.user_id),
            start_time: ts(T, "start_time", &self.start_time)?,
            pause_time: opt_ts(T, "pause_time", self.pause_time.as_deref())?,
            end_time: opt_ts(T, "end_time", self.end_time.as_deref())?,
            total_seconds: self.total_seconds,
            hourly_rate_at_time: self.hourly_rate_at_time,
            description: self.description,
            created_at: ts(T, "created_at", &self.created_at)?,
        })
    }
}

pub(crate) struct RawTask {
    id: i64,
    work_log_id: i64,
    user_id: String,
    description: String,
    duration: i64,
    created_at: String,
}

/// Column order must match `TASK_COLUMNS`.
pub(crate) fn read_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask {
        id: row.get(0)?,
        work_log_id: row.get(1)?,
        user_id: row.get(2)?,
        description: row.get(3)?,
        duration: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl RawTask {
    pub(crate) fn decode(self) -> Result<Task> {
        const T: &str = "tasks";
        if self.duration < 0 {
            return Err(StoreError::InvalidRow {
                table: T,
                column: "duration",
                reason: format!("negative value {}", self.duration),
            });
        }
        Ok(Task {
            id: self.id,
            work_log_id: self.work_log_id,
            user_id: UserId(self.user_id),
            description: self.description,
            duration: self.duration,
            created_at: ts(T, "created_at", &self.created_at)?,
        })
    }
}

fn ts(table: &'static str, column: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw).map_err(|e| StoreError::InvalidRow {
        table,
        column,
        reason: format!("{raw:?}: {e}"),
    })
}

fn opt_ts(
    table: &'static str,
    column: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>> {
    raw.map(|r| ts(table, column, r)).transpose()
}

/// Decode every raw row, failing on the first invalid one.
pub(crate) fn decode_all<R, T>(
    rows: impl Iterator<Item = rusqlite::Result<R>>,
    decode: impl Fn(R) -> Result<T>,
) -> Result<Vec<T>> {
    rows.map(|r| decode(r?)).collect()
}
