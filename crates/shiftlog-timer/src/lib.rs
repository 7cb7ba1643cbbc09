//! `shiftlog-timer` — work-session bookkeeping on top of `shiftlog-store`.
//!
//! # Overview
//!
//! A user's timer is derived from their open work log:
//!
//! | State     | Open log? | `pause_time` |
//! |-----------|-----------|--------------|
//! | `Idle`    | no        | —            |
//! | `Running` | yes       | unset        |
//! | `Paused`  | yes       | set          |
//!
//! [`transition`] holds the pure state machine; [`Tracker`] runs one
//! request's worth of operations against the store through a
//! [`RequestCache`] that lives exactly as long as the tracker.

pub mod cache;
pub mod day;
pub mod error;
pub mod summary;
pub mod tracker;
pub mod transition;

pub use cache::{CacheKey, RequestCache};
pub use error::{Result, TrackerError};
pub use summary::{DaySummary, EarningsSummary};
pub use tracker::{TimerSnapshot, Tracker};
pub use transition::TimerState;
