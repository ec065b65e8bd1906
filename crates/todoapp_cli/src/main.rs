//! Server entry point.
//!
//! # Responsibility
//! - Load configuration from the environment (and `.env`).
//! - Initialize logging, then hand off to the HTTP server until shutdown.

use std::process::ExitCode;

use log::error;
use todoapp_core::{core_version, init_logging};
use todoapp_http::{serve, ServerConfig};

fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            // Logging is not up yet; this is the only place stderr is used directly.
            eprintln!("todoapp: invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("todoapp: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }
    log::info!(
        "event=app_start module=cli status=ok version={}",
        core_version()
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("event=runtime_init module=cli status=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=app_exit module=cli status=error error={err}");
            ExitCode::FAILURE
        }
    }
}
