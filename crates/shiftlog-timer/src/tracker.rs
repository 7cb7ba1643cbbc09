use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shiftlog_core::types::{LogId, LogSnapshot, NewTask, NewWorkLog, Task, UserId, UserSettings, WorkLog};
use shiftlog_core::Clock;
use shiftlog_store::{LogOrder, LogQuery, LogUpdate, WorkStore};
use tracing::{info, instrument};

use crate::cache::{CacheKey, RequestCache};
use crate::day::DayRange;
use crate::error::{
    Result, TrackerError, ALREADY_ACTIVE, DESCRIPTION_REQUIRED, INVALID_DATE, INVALID_INPUT,
    INVALID_SETTINGS, MISSING_DATE, NO_ACTIVE_WORK_LOG,
};
use crate::summary::{summarize, EarningsSummary};
use crate::transition;

/// Description given to logs created by a manual day adjustment.
pub const ADJUSTED_DESCRIPTION: &str = "Adjusted (manual)";
/// Hour of day (UTC) at which a synthetic adjustment log is placed.
const ADJUSTED_START_HOUR: u32 = 9;
/// Largest day total an adjustment may set, in seconds.
pub const MAX_ADJUSTED_SECONDS: i64 = i32::MAX as i64;

/// Payload of the `state` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub log: Option<LogSnapshot>,
    pub tasks: Vec<Task>,
}

/// One caller's view of the timer for the duration of one request.
///
/// Owns the request's [`RequestCache`]; dropping the tracker drops the cache.
/// Transitions read the open log straight from the store so a state change
/// is always decided on the latest row.
pub struct Tracker<'a> {
    store: &'a WorkStore,
    clock: Arc<dyn Clock>,
    user: UserId,
    cache: RequestCache,
}

impl<'a> Tracker<'a> {
    pub fn new(store: &'a WorkStore, clock: Arc<dyn Clock>, user: UserId) -> Self {
        let cache = RequestCache::new(clock.clone());
        Self::with_cache(store, clock, user, cache)
    }

    pub fn with_cache(
        store: &'a WorkStore,
        clock: Arc<dyn Clock>,
        user: UserId,
        cache: RequestCache,
    ) -> Self {
        Self {
            store,
            clock,
            user,
            cache,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    // ── Cached reads ─────────────────────────────────────────────────────────

    /// Saved settings, or the defaults when the user never saved any.
    pub fn settings(&mut self) -> Result<UserSettings> {
        let store = self.store;
        let user = &self.user;
        self.cache
            .get_or_load(&CacheKey::Settings(user.clone()), || {
                Ok(store.settings(user)?.unwrap_or_default())
            })
    }

    pub fn current_log(&mut self) -> Result<Option<WorkLog>> {
        let store = self.store;
        let user = &self.user;
        self.cache
            .get_or_load(&CacheKey::CurrentLog(user.clone()), || {
                Ok(store.active_log(user)?)
            })
    }

    pub fn tasks_for(&mut self, log_id: LogId) -> Result<Vec<Task>> {
        let store = self.store;
        let user = &self.user;
        self.cache
            .get_or_load(&CacheKey::Tasks(log_id), || Ok(store.tasks_for_log(user, log_id)?))
    }

    /// Logs starting within the inclusive bounds, newest first.
    pub fn logs(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<WorkLog>> {
        let store = self.store;
        let user = &self.user;
        let key = CacheKey::Logs {
            user: user.clone(),
            start,
            end,
        };
        self.cache.get_or_load(&key, || {
            let query = LogQuery {
                start,
                end,
                order: LogOrder::StartTimeDesc,
            };
            Ok(store.logs(user, &query)?)
        })
    }

    // ── Timer transitions ────────────────────────────────────────────────────

    /// Idle → Running. The new log snapshots the current hourly rate.
    #[instrument(skip(self), fields(user = %self.user))]
    pub fn start(&mut self) -> Result<WorkLog> {
        if self.store.active_log(&self.user)?.is_some() {
            return Err(TrackerError::conflict(ALREADY_ACTIVE));
        }
        let rate = self.settings()?.hourly_rate;
        let now = self.clock.now();
        let log = self.store.insert_log(&NewWorkLog {
            user_id: self.user.clone(),
            start_time: now,
            end_time: None,
            total_seconds: 0,
            hourly_rate_at_time: Some(rate),
            description: None,
            created_at: now,
        })?;
        info!(log_id = log.id, rate, "work log started");
        Ok(log)
    }

    #[instrument(skip(self), fields(user = %self.user))]
    pub fn pause(&mut self) -> Result<WorkLog> {
        let active = self.store.active_log(&self.user)?;
        let (id, patch) = transition::pause(active.as_ref(), self.clock.now())?;
        let log = self.store.update_log(&self.user, id, &patch)?;
        info!(log_id = id, total_seconds = log.total_seconds, "work log paused");
        Ok(log)
    }

    #[instrument(skip(self), fields(user = %self.user))]
    pub fn resume(&mut self) -> Result<WorkLog> {
        let active = self.store.active_log(&self.user)?;
        let (id, patch) = transition::resume(active.as_ref(), self.clock.now())?;
        let log = self.store.update_log(&self.user, id, &patch)?;
        info!(log_id = id, total_seconds = log.total_seconds, "work log resumed");
        Ok(log)
    }

    /// Close the open log. `Ok(None)` when there was nothing to end.
    #[instrument(skip(self), fields(user = %self.user))]
    pub fn end(&mut self) -> Result<Option<WorkLog>> {
        let active = self.store.active_log(&self.user)?;
        let Some((id, patch)) = transition::end(active.as_ref(), self.clock.now()) else {
            info!("end requested with no open log");
            return Ok(None);
        };
        let log = self.store.update_log(&self.user, id, &patch)?;
        info!(log_id = id, total_seconds = log.total_seconds, "work log ended");
        Ok(Some(log))
    }

    /// Record a task against the open log, timed from the previous task or the log start.
    #[instrument(skip(self, description), fields(user = %self.user))]
    pub fn complete_task(&mut self, description: &str) -> Result<Task> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TrackerError::validation(DESCRIPTION_REQUIRED));
        }
        let log = self
            .store
            .active_log(&self.user)?
            .ok_or_else(|| TrackerError::conflict(NO_ACTIVE_WORK_LOG))?;

        let base = match self.store.latest_task(&self.user, log.id)? {
            Some(last) => last.created_at,
            None => log.start_time,
        };
        let now = self.clock.now();
        let task = self.store.insert_task(&NewTask {
            work_log_id: log.id,
            user_id: self.user.clone(),
            description: description.to_string(),
            duration: transition::task_duration(base, now),
            created_at: now,
        })?;
        info!(log_id = log.id, task_id = task.id, duration = task.duration, "task completed");
        Ok(task)
    }

    // ── Manual adjustments ───────────────────────────────────────────────────

    /// Delete one of the caller's logs and its tasks. Returns rows removed.
    #[instrument(skip(self), fields(user = %self.user))]
    pub fn delete_log(&mut self, id: LogId) -> Result<usize> {
        let removed = self.store.delete_log(&self.user, id)?;
        info!(log_id = id, removed, "work log deleted");
        Ok(removed)
    }

    /// Delete every log starting on `date` (`yyyy-MM-dd`, UTC).
    #[instrument(skip(self), fields(user = %self.user))]
    pub fn delete_day(&mut self, date: &str) -> Result<usize> {
        if date.trim().is_empty() {
            return Err(TrackerError::validation(MISSING_DATE));
        }
        let day = DayRange::parse(date).ok_or_else(|| TrackerError::validation(INVALID_DATE))?;
        let removed = self.store.delete_logs_between(&self.user, day.start, day.end)?;
        info!(date = %day.date, removed, "day deleted");
        Ok(removed)
    }

    /// Force the day's total to `hours`.
    ///
    /// With no logs that day a single ended log is created; otherwise only the
    /// last log (by id) is rewritten so the day sums to the target, never
    /// below zero.
    #[instrument(skip(self), fields(user = %self.user))]
    pub fn edit_day(&mut self, date: &str, hours: f64) -> Result<WorkLog> {
        let day = DayRange::parse(date).ok_or_else(|| TrackerError::validation(INVALID_INPUT))?;
        let seconds = (hours * 3600.0).round();
        if !hours.is_finite() || hours < 0.0 || seconds > MAX_ADJUSTED_SECONDS as f64 {
            return Err(TrackerError::validation(INVALID_INPUT));
        }
        let target = seconds as i64;

        let logs = self.store.logs(
            &self.user,
            &LogQuery {
                start: Some(day.start),
                end: Some(day.end),
                order: LogOrder::IdAsc,
            },
        )?;

        let Some((last, others)) = logs.split_last() else {
            let rate = self.settings()?.hourly_rate;
            let at = day.at_hour(ADJUSTED_START_HOUR);
            let log = self.store.insert_log(&NewWorkLog {
                user_id: self.user.clone(),
                start_time: at,
                end_time: Some(at),
                total_seconds: target,
                hourly_rate_at_time: Some(rate),
                description: Some(ADJUSTED_DESCRIPTION.to_string()),
                created_at: self.clock.now(),
            })?;
            info!(date = %day.date, target, log_id = log.id, "day adjusted with synthetic log");
            return Ok(log);
        };

        let others_seconds = others
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.total_seconds));
        let new_last = target.saturating_sub(others_seconds).max(0);
        let log = self.store.update_log(
            &self.user,
            last.id,
            &LogUpdate {
                total_seconds: Some(new_last),
                ..Default::default()
            },
        )?;
        info!(date = %day.date, target, log_id = last.id, new_last, "day adjusted");
        Ok(log)
    }

    // ── Views ────────────────────────────────────────────────────────────────

    /// The open log (if any) and its tasks, oldest first.
    pub fn state(&mut self) -> Result<TimerSnapshot> {
        let log = self.current_log()?;
        let tasks = match &log {
            Some(l) => self.tasks_for(l.id)?,
            None => Vec::new(),
        };
        Ok(TimerSnapshot {
            log: log.as_ref().map(LogSnapshot::from),
            tasks,
        })
    }

    pub fn summary(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<EarningsSummary> {
        let logs = self.logs(start, end)?;
        let settings = self.settings()?;
        Ok(summarize(&logs, &settings, self.clock.now()))
    }

    /// Validate and save settings. Currency must be three ASCII letters.
    #[instrument(skip(self), fields(user = %self.user))]
    pub fn update_settings(&mut self, currency: &str, hourly_rate: f64) -> Result<UserSettings> {
        let currency = currency.trim().to_ascii_uppercase();
        let valid_currency = currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic());
        if !valid_currency || !hourly_rate.is_finite() || hourly_rate < 0.0 {
            return Err(TrackerError::validation(INVALID_SETTINGS));
        }
        let settings = UserSettings {
            currency,
            hourly_rate,
        };
        self.store
            .upsert_settings(&self.user, &settings, self.clock.now())?;
        info!(currency = %settings.currency, hourly_rate, "settings updated");
        Ok(settings)
    }
}
