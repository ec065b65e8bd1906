//! Post-migration schema checks, run on every open.
//!
//! Username registration is atomic only while `idx_users_username_active`
//! is unique and partial; paged listing expects the two todo indexes.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension};

const USERNAME_INDEX: &str = "idx_users_username_active";
const REQUIRED_TABLES: &[&str] = &["users", "todos"];
const REQUIRED_INDEXES: &[&str] = &[USERNAME_INDEX, "idx_todos_created", "idx_todos_owner"];

/// Fails with [`DbError::SchemaMismatch`] on the first missing or altered object.
pub fn verify_schema(conn: &Connection) -> DbResult<()> {
    for &table in REQUIRED_TABLES {
        if !object_exists(conn, "table", table)? {
            return Err(mismatch(table, "is missing"));
        }
    }
    for &index in REQUIRED_INDEXES {
        if !object_exists(conn, "index", index)? {
            return Err(mismatch(index, "is missing"));
        }
    }

    let flags: Option<(bool, bool)> = conn
        .query_row(
            "SELECT \"unique\", partial FROM pragma_index_list('users') WHERE name = ?1;",
            [USERNAME_INDEX],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    match flags {
        Some((true, true)) => Ok(()),
        Some((false, _)) => Err(mismatch(USERNAME_INDEX, "is not unique")),
        Some((true, false)) => Err(mismatch(USERNAME_INDEX, "is not limited to active users")),
        None => Err(mismatch(USERNAME_INDEX, "is not an index on users")),
    }
}

fn object_exists(conn: &Connection, kind: &str, name: &str) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
        [kind, name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn mismatch(object: &'static str, problem: &'static str) -> DbError {
    DbError::SchemaMismatch { object, problem }
}
