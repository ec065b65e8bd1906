//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `todos` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate drafts before SQL mutations.
//! - Owner existence is checked inside the `INSERT` statement itself.
//! - Toggle/set/update/delete are single `UPDATE` statements scoped to one
//!   row, so concurrent requests on the same id never lose an update.
//! - Lists are ordered by `created_at DESC, id DESC`.

use crate::model::now_epoch_ms;
use crate::model::todo::{NewTodo, Todo, TodoId, TodoUpdate};
use crate::model::user::UserId;
use crate::repo::{bool_to_int, int_to_bool, parse_user_id, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TODO_COLUMNS: &str =
    "id, title, description, completed, owner_id, created_at, updated_at, is_deleted";

/// Page size used when a caller asks for a limit of `0`.
pub const TODO_LIST_DEFAULT_LIMIT: u32 = 50;
/// Hard upper bound for a single list page.
pub const TODO_LIST_LIMIT_MAX: u32 = 200;

/// Query options for listing todos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoListQuery {
    pub owner_id: Option<UserId>,
    pub completed: Option<bool>,
    /// Case-insensitive substring match on `title`.
    pub title_contains: Option<String>,
    pub include_deleted: bool,
    /// `None` returns every matching row.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl TodoListQuery {
    /// All visible todos owned by `owner_id`.
    pub fn for_owner(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }
}

/// Clamps a requested page size: `0` means default, values above max clamp.
pub fn normalize_todo_limit(limit: Option<u32>) -> Option<u32> {
    limit.map(|value| match value {
        0 => TODO_LIST_DEFAULT_LIMIT,
        value if value > TODO_LIST_LIMIT_MAX => TODO_LIST_LIMIT_MAX,
        value => value,
    })
}

/// Repository interface for todo persistence.
pub trait TodoRepository {
    /// Inserts a todo and returns the stored row with its assigned id.
    fn insert_todo(&self, draft: &NewTodo) -> RepoResult<Todo>;
    /// Gets one todo by id with optional deleted-row visibility.
    fn get_todo(&self, id: TodoId, include_deleted: bool) -> RepoResult<Option<Todo>>;
    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>>;
    /// Replaces title/description/completed of an active todo.
    fn replace_todo(&self, id: TodoId, update: &TodoUpdate) -> RepoResult<Todo>;
    /// Flips `completed` of an active todo.
    fn toggle_todo(&self, id: TodoId) -> RepoResult<Todo>;
    /// Sets `completed` of an active todo to an explicit value.
    fn set_todo_completed(&self, id: TodoId, completed: bool) -> RepoResult<Todo>;
    fn soft_delete_todo(&self, id: TodoId) -> RepoResult<()>;
}

impl<R: TodoRepository + ?Sized> TodoRepository for &R {
    fn insert_todo(&self, draft: &NewTodo) -> RepoResult<Todo> {
        (**self).insert_todo(draft)
    }

    fn get_todo(&self, id: TodoId, include_deleted: bool) -> RepoResult<Option<Todo>> {
        (**self).get_todo(id, include_deleted)
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        (**self).list_todos(query)
    }

    fn replace_todo(&self, id: TodoId, update: &TodoUpdate) -> RepoResult<Todo> {
        (**self).replace_todo(id, update)
    }

    fn toggle_todo(&self, id: TodoId) -> RepoResult<Todo> {
        (**self).toggle_todo(id)
    }

    fn set_todo_completed(&self, id: TodoId, completed: bool) -> RepoResult<Todo> {
        (**self).set_todo_completed(id, completed)
    }

    fn soft_delete_todo(&self, id: TodoId) -> RepoResult<()> {
        (**self).soft_delete_todo(id)
    }
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Wraps a migrated connection (see `crate::db::open_db`).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn update_returning(
        &self,
        id: TodoId,
        set_clause: &str,
        extra: &[Value],
    ) -> RepoResult<Todo> {
        let sql = format!(
            "UPDATE todos
             SET {set_clause}, updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0
             RETURNING {TODO_COLUMNS};"
        );

        let mut bind_values = vec![Value::Integer(id), Value::Integer(now_epoch_ms())];
        bind_values.extend_from_slice(extra);

        let updated = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| {
                Ok(parse_todo_row(row))
            })
            .optional()?;

        match updated {
            Some(todo) => todo,
            None => Err(RepoError::TodoNotFound(id)),
        }
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn insert_todo(&self, draft: &NewTodo) -> RepoResult<Todo> {
        draft.validate()?;

        let now = now_epoch_ms();
        let inserted = self
            .conn
            .query_row(
                &format!(
                    "INSERT INTO todos (
                        title,
                        description,
                        completed,
                        owner_id,
                        created_at,
                        updated_at,
                        is_deleted
                    )
                    SELECT ?1, ?2, ?3, ?4, ?5, ?5, 0
                    WHERE ?4 IS NULL
                       OR EXISTS (SELECT 1 FROM users WHERE id = ?4 AND is_deleted = 0)
                    RETURNING {TODO_COLUMNS};"
                ),
                params![
                    draft.title.as_str(),
                    draft.description.as_deref(),
                    bool_to_int(draft.completed),
                    draft.owner_id.map(|id| id.to_string()),
                    now,
                ],
                |row| Ok(parse_todo_row(row)),
            )
            .optional()?;

        match (inserted, draft.owner_id) {
            (Some(todo), _) => todo,
            (None, Some(owner_id)) => Err(RepoError::OwnerNotFound(owner_id)),
            (None, None) => Err(RepoError::InvalidData(
                "unowned todo insert returned no row".to_string(),
            )),
        }
    }

    fn get_todo(&self, id: TodoId, include_deleted: bool) -> RepoResult<Option<Todo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TODO_COLUMNS}
             FROM todos
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }

        Ok(None)
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let mut sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(owner_id) = query.owner_id {
            sql.push_str(" AND owner_id = ?");
            bind_values.push(Value::Text(owner_id.to_string()));
        }

        if let Some(completed) = query.completed {
            sql.push_str(" AND completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        if let Some(needle) = query.title_contains.as_deref() {
            sql.push_str(" AND instr(lower(title), lower(?)) > 0");
            bind_values.push(Value::Text(needle.to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = normalize_todo_limit(query.limit) {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut todos = Vec::new();

        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }

        Ok(todos)
    }

    fn replace_todo(&self, id: TodoId, update: &TodoUpdate) -> RepoResult<Todo> {
        update.validate()?;

        self.update_returning(
            id,
            "title = ?3, description = ?4, completed = ?5",
            &[
                Value::Text(update.title.clone()),
                update
                    .description
                    .clone()
                    .map_or(Value::Null, Value::Text),
                Value::Integer(bool_to_int(update.completed)),
            ],
        )
    }

    fn toggle_todo(&self, id: TodoId) -> RepoResult<Todo> {
        self.update_returning(id, "completed = 1 - completed", &[])
    }

    fn set_todo_completed(&self, id: TodoId, completed: bool) -> RepoResult<Todo> {
        self.update_returning(
            id,
            "completed = ?3",
            &[Value::Integer(bool_to_int(completed))],
        )
    }

    fn soft_delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET
                is_deleted = 1,
                updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id, now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::TodoNotFound(id));
        }

        Ok(())
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let owner_id = match row.get::<_, Option<String>>("owner_id")? {
        Some(value) => Some(parse_user_id(&value, "todos.owner_id")?),
        None => None,
    };

    Ok(Todo {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        completed: int_to_bool(row.get("completed")?, "todos.completed")?,
        owner_id,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_deleted: int_to_bool(row.get("is_deleted")?, "todos.is_deleted")?,
    })
}
