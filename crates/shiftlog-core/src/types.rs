use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency applied when a user has never saved settings.
pub const DEFAULT_CURRENCY: &str = "GBP";
/// Hourly rate applied when a user has never saved settings.
pub const DEFAULT_HOURLY_RATE: f64 = 10.0;

/// Store-assigned primary key of a work log or task.
pub type LogId = i64;

/// Opaque identifier of an authenticated caller, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One work session.
///
/// `total_seconds` excludes the interval that is currently running: a running
/// log's live duration is `total_seconds + (now - start_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: LogId,
    pub user_id: UserId,
    /// Start of the current running interval; reset on every resume.
    pub start_time: DateTime<Utc>,
    /// Set iff the log is paused.
    pub pause_time: Option<DateTime<Utc>>,
    /// Set iff the log is closed.
    pub end_time: Option<DateTime<Utc>>,
    pub total_seconds: i64,
    /// Hourly rate in effect when the log was started.
    pub hourly_rate_at_time: Option<f64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkLog {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_paused(&self) -> bool {
        self.end_time.is_none() && self.pause_time.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.end_time.is_none() && self.pause_time.is_none()
    }
}

/// Insert payload for `work_logs`. The store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkLog {
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_seconds: i64,
    pub hourly_rate_at_time: Option<f64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The subset of a work log returned by the timer endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub id: LogId,
    pub start_time: DateTime<Utc>,
    pub pause_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_seconds: i64,
    pub hourly_rate_at_time: Option<f64>,
}

impl From<&WorkLog> for LogSnapshot {
    fn from(log: &WorkLog) -> Self {
        Self {
            id: log.id,
            start_time: log.start_time,
            pause_time: log.pause_time,
            end_time: log.end_time,
            total_seconds: log.total_seconds,
            hourly_rate_at_time: log.hourly_rate_at_time,
        }
    }
}

/// A unit of work recorded against a work log. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: LogId,
    pub work_log_id: LogId,
    pub user_id: UserId,
    pub description: String,
    /// Seconds since the previous task, or since the log's start for the first one.
    pub duration: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub work_log_id: LogId,
    pub user_id: UserId,
    pub description: String,
    pub duration: i64,
    pub created_at: DateTime<Utc>,
}

/// Per-user preferences. Missing rows read as the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub currency: String,
    pub hourly_rate: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            hourly_rate: DEFAULT_HOURLY_RATE,
        }
    }
}

// ── Timestamps ───────────────────────────────────────────────────────────────

/// Canonical stored form: RFC 3339, UTC, millisecond precision, `Z` suffix.
///
/// Fixed width, so string comparison in SQL orders chronologically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Whole seconds between two instants, floored. Negative when `to` precedes `from`.
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds().div_euclid(1000)
}
