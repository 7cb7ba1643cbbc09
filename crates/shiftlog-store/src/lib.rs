//! `shiftlog-store` — SQLite-backed row store for work logs, tasks and user settings.
//!
//! Every read and write is scoped by the caller's `UserId`. Rows are decoded
//! into the value objects from `shiftlog-core` and rejected with
//! [`StoreError::InvalidRow`] when a column does not hold what it should.

pub mod db;
pub mod error;
mod rows;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{LogOrder, LogQuery, LogUpdate, WorkStore};
