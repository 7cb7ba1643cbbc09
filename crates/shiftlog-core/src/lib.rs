pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, ShiftlogError};
pub use types::{LogId, LogSnapshot, NewTask, NewWorkLog, Task, UserId, UserSettings, WorkLog};
