//! Server bootstrap and lifecycle.

use log::{info, warn};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use todoapp_core::{open_db, CredentialError, CredentialService, DbError};

use crate::config::{ServerConfig, StorageMode};
use crate::router::build_router;
use crate::state::{AppState, Storage};

/// Startup and serve failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to open database: {0}")]
    Storage(#[from] DbError),

    #[error("failed to initialize credentials: {0}")]
    Credentials(#[from] CredentialError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds application state for the configured backend.
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let storage = match config.storage {
        StorageMode::Sqlite => Storage::sqlite(open_db(&config.db_path)?),
        StorageMode::Memory => Storage::memory(),
    };
    let credentials = CredentialService::new(&config.credentials)?;
    Ok(AppState::new(storage, credentials))
}

/// Binds, serves until Ctrl-C/SIGTERM, then drains in-flight requests.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let state = build_state(&config)?;
    let storage = state.storage().kind();

    let listener = TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;
    info!("event=server_start module=http status=ok addr={addr} storage={storage}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("event=signal_install module=http status=error signal=ctrl_c error={err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("event=signal_install module=http status=error signal=sigterm error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("event=server_shutdown module=http status=start signal=ctrl_c"),
        () = terminate => info!("event=server_shutdown module=http status=start signal=sigterm"),
    }
}
