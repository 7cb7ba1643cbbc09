use thiserror::Error;

/// Errors raised by the row store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row does not decode into its value object.
    #[error("invalid {table}.{column}: {reason}")]
    InvalidRow {
        table: &'static str,
        column: &'static str,
        reason: String,
    },

    /// The user already has a work log without an end time.
    #[error("work log already active for user {user_id}")]
    ActiveLogExists { user_id: String },

    /// No row with this id is owned by the caller.
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: i64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
