//! Pure timer state machine. Nothing here touches the store or the clock;
//! callers pass the open log and `now` and persist the returned patch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shiftlog_core::types::{elapsed_seconds, LogId, WorkLog};
use shiftlog_store::LogUpdate;

use crate::error::{Result, TrackerError, ALREADY_PAUSED, NOT_PAUSED, NO_ACTIVE_LOG};

/// Timer state derived from a user's open log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

impl TimerState {
    pub fn of(active: Option<&WorkLog>) -> Self {
        match active {
            Some(log) if log.is_paused() => TimerState::Paused,
            Some(log) if log.is_running() => TimerState::Running,
            _ => TimerState::Idle,
        }
    }
}

/// Whole seconds of a running interval. Clock skew never makes it negative.
pub fn running_interval(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    elapsed_seconds(start, now).max(0)
}

/// Duration including the interval currently running, if any.
pub fn live_seconds(log: &WorkLog, now: DateTime<Utc>) -> i64 {
    if log.is_running() {
        log.total_seconds
            .saturating_add(running_interval(log.start_time, now))
    } else {
        log.total_seconds
    }
}

/// Running → Paused: bank the running interval and stamp `pause_time`.
pub fn pause(active: Option<&WorkLog>, now: DateTime<Utc>) -> Result<(LogId, LogUpdate)> {
    let log = active.ok_or_else(|| TrackerError::conflict(NO_ACTIVE_LOG))?;
    match TimerState::of(Some(log)) {
        TimerState::Paused => Err(TrackerError::conflict(ALREADY_PAUSED)),
        TimerState::Idle => Err(TrackerError::conflict(NO_ACTIVE_LOG)),
        TimerState::Running => Ok((
            log.id,
            LogUpdate {
                pause_time: Some(Some(now)),
                total_seconds: Some(
                    log.total_seconds
                        .saturating_add(running_interval(log.start_time, now)),
                ),
                ..Default::default()
            },
        )),
    }
}

/// Paused → Running: open a new interval at `now`; the banked total is untouched.
pub fn resume(active: Option<&WorkLog>, now: DateTime<Utc>) -> Result<(LogId, LogUpdate)> {
    let log = active.ok_or_else(|| TrackerError::conflict(NO_ACTIVE_LOG))?;
    match TimerState::of(Some(log)) {
        TimerState::Running => Err(TrackerError::conflict(NOT_PAUSED)),
        TimerState::Idle => Err(TrackerError::conflict(NO_ACTIVE_LOG)),
        TimerState::Paused => Ok((
            log.id,
            LogUpdate {
                start_time: Some(now),
                pause_time: Some(None),
                ..Default::default()
            },
        )),
    }
}

/// Running | Paused → Ended. Idle yields `None`: ending nothing is not an error.
///
/// `pause_time` is cleared so an ended log is never also paused.
pub fn end(active: Option<&WorkLog>, now: DateTime<Utc>) -> Option<(LogId, LogUpdate)> {
    let log = active.filter(|l| l.is_active())?;
    Some((
        log.id,
        LogUpdate {
            end_time: Some(now),
            pause_time: log.pause_time.map(|_| None),
            total_seconds: Some(live_seconds(log, now)),
            ..Default::default()
        },
    ))
}

/// Seconds a new task covers: since `base` (previous task, or log start), floored at 0.
pub fn task_duration(base: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    running_interval(base, now)
}
