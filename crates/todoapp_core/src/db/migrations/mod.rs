//! Ordered schema steps for the todo store.
//!
//! Step `n` in [`STEPS`] moves the database to version `n + 1`. Steps are
//! append-only: a released step is never edited or reordered.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

struct Step {
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        name: "users_and_todos",
        sql: include_str!("0001_init.sql"),
    },
    Step {
        name: "todo_list_indexes",
        sql: include_str!("0002_todo_indexes.sql"),
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Brings `conn` up to [`latest_version`] inside one transaction.
///
/// # Errors
/// - [`DbError::SchemaTooNew`] when the file is ahead of this build.
/// - [`DbError::Migration`] naming the first step that failed; earlier steps
///   of the same run are rolled back with it.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }
    if found == supported {
        return Ok(());
    }

    info!("event=db_migrate module=db status=start from_version={found} to_version={supported}");
    let tx = conn.transaction()?;
    for (version, step) in (1..).zip(STEPS).skip(found as usize) {
        let applied = tx
            .execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version));
        if let Err(source) = applied {
            error!(
                "event=db_migrate module=db status=error version={version} step={} error={source}",
                step.name
            );
            return Err(DbError::Migration {
                version,
                name: step.name,
                source,
            });
        }
        info!("event=db_migrate module=db status=step version={version} step={}", step.name);
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok version={supported}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_step_has_a_distinct_name() {
        let mut names: Vec<_> = STEPS.iter().map(|step| step.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), STEPS.len());
    }

    #[test]
    fn partially_migrated_database_only_runs_remaining_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(STEPS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        apply_migrations(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn failing_step_is_reported_by_name_and_rolled_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE todos (id INTEGER PRIMARY KEY);")
            .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();

        assert!(matches!(
            err,
            DbError::Migration { version: 1, name: "users_and_todos", .. }
        ));
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
        let users_created: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'users');",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!users_created);
    }
}
