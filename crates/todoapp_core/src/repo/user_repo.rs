//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `users` table.
//! - Translate the partial unique index on `username` into
//!   `RepoError::DuplicateUsername`.
//!
//! # Invariants
//! - Username uniqueness is enforced by the store, not by a prior read.
//! - Partial updates are applied with one `UPDATE ... RETURNING` statement.

use crate::model::now_epoch_ms;
use crate::model::user::{User, UserChanges, UserId};
use crate::repo::{bool_to_int, int_to_bool, parse_user_id, RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, name, username, password_hash, created_at, updated_at, is_deleted";

/// Repository interface for user account persistence.
pub trait UserRepository {
    /// Inserts a new active user.
    fn insert_user(&self, user: &User) -> RepoResult<()>;
    /// Gets one user by id with optional deleted-row visibility.
    fn get_user(&self, id: UserId, include_deleted: bool) -> RepoResult<Option<User>>;
    /// Finds the active user holding `username`.
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Applies non-empty fields of `changes` to an active user.
    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<User>;
    /// Marks an active user as deleted. Owned todos are left untouched.
    fn soft_delete_user(&self, id: UserId) -> RepoResult<()>;
}

impl<R: UserRepository + ?Sized> UserRepository for &R {
    fn insert_user(&self, user: &User) -> RepoResult<()> {
        (**self).insert_user(user)
    }

    fn get_user(&self, id: UserId, include_deleted: bool) -> RepoResult<Option<User>> {
        (**self).get_user(id, include_deleted)
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        (**self).find_user_by_username(username)
    }

    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<User> {
        (**self).update_user(id, changes)
    }

    fn soft_delete_user(&self, id: UserId) -> RepoResult<()> {
        (**self).soft_delete_user(id)
    }
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Wraps a migrated connection (see `crate::db::open_db`).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &User) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO users (
                    id,
                    name,
                    username,
                    password_hash,
                    created_at,
                    updated_at,
                    is_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    user.id.to_string(),
                    user.name.as_str(),
                    user.username.as_str(),
                    user.password_hash.as_str(),
                    user.created_at,
                    user.updated_at,
                    bool_to_int(user.is_deleted),
                ],
            )
            .map_err(|err| map_unique_violation(err, &user.username))?;

        Ok(())
    }

    fn get_user(&self, id: UserId, include_deleted: bool) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS}
             FROM users
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS}
             FROM users
             WHERE username = ?1
               AND is_deleted = 0;"
        ))?;

        let mut rows = stmt.query([username])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<User> {
        let updated = self
            .conn
            .query_row(
                &format!(
                    "UPDATE users
                     SET
                        name = COALESCE(?2, name),
                        username = COALESCE(?3, username),
                        password_hash = COALESCE(?4, password_hash),
                        updated_at = ?5
                     WHERE id = ?1
                       AND is_deleted = 0
                     RETURNING {USER_COLUMNS};"
                ),
                params![
                    id.to_string(),
                    changes.name.as_deref(),
                    changes.username.as_deref(),
                    changes.password_hash.as_deref(),
                    now_epoch_ms(),
                ],
                |row| Ok(parse_user_row(row)),
            )
            .optional()
            .map_err(|err| map_unique_violation(err, changes.username.as_deref().unwrap_or("")))?;

        match updated {
            Some(user) => user,
            None => Err(RepoError::UserNotFound(id)),
        }
    }

    fn soft_delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                is_deleted = 1,
                updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id.to_string(), now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::UserNotFound(id));
        }

        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_user_id(&id_text, "users.id")?,
        name: row.get("name")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_deleted: int_to_bool(row.get("is_deleted")?, "users.is_deleted")?,
    })
}

fn map_unique_violation(err: rusqlite::Error, username: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::DuplicateUsername(username.to_string())
        }
        _ => err.into(),
    }
}
