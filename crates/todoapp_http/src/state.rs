//! Shared application state and the bridge from async handlers to the
//! blocking core services.
//!
//! # Invariants
//! - Core calls run inside `spawn_blocking`, never on async workers.
//! - Storage locks are taken per repository call, so a password hash in one
//!   request never holds the store while other requests wait.

use std::sync::Arc;

use rusqlite::Connection;
use todoapp_core::{
    CredentialService, MemoryStore, ServiceResult, SharedSqlite, TodoRepository, TodoService,
    UserRepository, UserService,
};

use crate::error::ApiError;

/// Storage backend shared by all requests.
#[derive(Clone)]
pub enum Storage {
    Sqlite(SharedSqlite),
    Memory(Arc<MemoryStore>),
}

impl Storage {
    pub fn sqlite(conn: Connection) -> Self {
        Self::Sqlite(SharedSqlite::new(conn))
    }

    pub fn memory() -> Self {
        Self::Memory(Arc::new(MemoryStore::new()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }

    fn users(&self) -> &dyn UserRepository {
        match self {
            Self::Sqlite(shared) => shared,
            Self::Memory(store) => store.as_ref(),
        }
    }

    fn todos(&self) -> &dyn TodoRepository {
        match self {
            Self::Sqlite(shared) => shared,
            Self::Memory(store) => store.as_ref(),
        }
    }
}

/// Axum router state.
#[derive(Clone)]
pub struct AppState {
    storage: Storage,
    credentials: Arc<CredentialService>,
}

impl AppState {
    pub fn new(storage: Storage, credentials: CredentialService) -> Self {
        Self {
            storage,
            credentials: Arc::new(credentials),
        }
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Runs `f` against the user directory on the blocking pool.
    pub async fn users<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&UserService<'_, &dyn UserRepository>) -> ServiceResult<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        let credentials = Arc::clone(&self.credentials);
        run_blocking(move || f(&UserService::new(storage.users(), &credentials))).await
    }

    /// Runs `f` against the todo ledger on the blocking pool.
    pub async fn todos<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&TodoService<&dyn TodoRepository>) -> ServiceResult<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        run_blocking(move || f(&TodoService::new(storage.todos()))).await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(join_error) => Err(ApiError::Internal(format!(
            "blocking task failed: {join_error}"
        ))),
    }
}
