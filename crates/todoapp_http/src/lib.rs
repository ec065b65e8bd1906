//! HTTP boundary for the todo service.
//!
//! # Responsibility
//! - Decode JSON requests into core commands and encode domain results.
//! - Map every core failure kind onto one HTTP status with a uniform
//!   `{"error": message}` body.
//! - Own process-level configuration and server lifecycle.
//!
//! # Invariants
//! - Core calls never run on async worker threads; they go through
//!   `spawn_blocking`.
//! - Internal failure details are logged, never returned to clients.

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ConfigError, ServerConfig, StorageMode};
pub use error::ApiError;
pub use router::build_router;
pub use server::{build_state, serve, ServerError};
pub use state::{AppState, Storage};
