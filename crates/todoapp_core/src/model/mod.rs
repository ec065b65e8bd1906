//! Domain model for users and todo items.
//!
//! # Responsibility
//! - Define canonical records used by core business logic.
//! - Own field-level validation rules shared by every storage backend.
//!
//! # Invariants
//! - Users are identified by a stable `UserId`, todos by a sequential `TodoId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//! - Timestamps are Unix epoch milliseconds.

pub mod todo;
pub mod user;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in Unix epoch milliseconds.
///
/// Falls back to `0` if the system clock reports a pre-epoch time.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
