//! Process-wide logging for the todo service.
//!
//! # Responsibility
//! - Start one `flexi_logger` backend per process: size-rotated files when a
//!   directory is configured, stderr otherwise.
//! - Route panics through the logger with credentials masked.
//!
//! # Invariants
//! - A second `init_logging` with the same level and destination is a no-op.
//! - A second `init_logging` with a different level or destination fails and
//!   leaves the active logger untouched.
//! - Bearer tokens and password hashes never reach a log line from the panic
//!   hook.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Once;

const LOG_FILE_BASENAME: &str = "todoapp";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_MESSAGE_LIMIT: usize = 200;
const REDACTED: &str = "[redacted]";

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Rotating files under this absolute directory.
    Directory(PathBuf),
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    InvalidDirectory { dir: String, reason: String },
    /// Logging is already running with another level or target.
    Conflict { active: String, requested: String },
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`; expected trace, debug, info, warn, error or off"
            ),
            Self::InvalidDirectory { dir, reason } => {
                write!(f, "log directory `{dir}` is unusable: {reason}")
            }
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs as {active}; cannot switch to {requested}"
            ),
            Self::Backend(message) => write!(f, "logger backend failed to start: {message}"),
        }
    }
}

impl Error for LoggingError {}

struct ActiveLogger {
    level: LevelFilter,
    target: LogTarget,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn ensure_matches(&self, level: LevelFilter, target: &LogTarget) -> Result<(), LoggingError> {
        if self.level == level && &self.target == target {
            return Ok(());
        }
        Err(LoggingError::Conflict {
            active: describe(self.level, &self.target),
            requested: describe(level, target),
        })
    }
}

fn describe(level: LevelFilter, target: &LogTarget) -> String {
    format!("level={} target={target}", level_name(level))
}

/// Starts logging at `level`, to rotating files under `log_dir` or to stderr.
///
/// # Errors
/// - [`LoggingError::UnknownLevel`] for a level name `log` does not know.
/// - [`LoggingError::InvalidDirectory`] when `log_dir` is blank, relative or
///   cannot be created.
/// - [`LoggingError::Conflict`] when logging already runs with another setup.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let target = match log_dir {
        Some(dir) => LogTarget::Directory(parse_log_dir(dir)?),
        None => LogTarget::Stderr,
    };

    if let Some(active) = ACTIVE.get() {
        return active.ensure_matches(level, &target);
    }

    let active = ACTIVE.get_or_try_init(|| start_backend(level, target.clone()))?;
    active.ensure_matches(level, &target)
}

fn start_backend(level: LevelFilter, target: LogTarget) -> Result<ActiveLogger, LoggingError> {
    let logger = Logger::try_with_str(level_name(level))
        .map_err(|err| LoggingError::Backend(err.to_string()))?;
    let logger = match &target {
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| LoggingError::InvalidDirectory {
                dir: dir.display().to_string(),
                reason: err.to_string(),
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
    };
    let handle = logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    PANIC_HOOK.call_once(install_panic_hook);
    info!(
        "event=logging_init module=core status=ok level={} target={target} os={} profile={}",
        level_name(level),
        std::env::consts::OS,
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );

    Ok(ActiveLogger {
        level,
        target,
        _handle: handle,
    })
}

/// Active level and target, or `None` before [`init_logging`] succeeds.
pub fn logging_status() -> Option<(LevelFilter, LogTarget)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.target.clone()))
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = level.trim();
    if trimmed.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::Warn);
    }
    trimmed
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::UnknownLevel(trimmed.to_string()))
}

fn level_name(level: LevelFilter) -> String {
    level.as_str().to_ascii_lowercase()
}

fn parse_log_dir(dir: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = dir.trim();
    let invalid = |reason: &str| LoggingError::InvalidDirectory {
        dir: trimmed.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("path is empty"));
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(invalid("path must be absolute"));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string payload>".to_string());
        error!(
            "event=panic module=core status=error thread={} location={location} message={}",
            thread.name().unwrap_or("unnamed"),
            scrub_panic_message(&message)
        );
        previous(info);
    }));
}

/// Flattens `message` onto one line, masks bearer tokens and Argon2 PHC
/// strings, then caps the result at [`PANIC_MESSAGE_LIMIT`] characters.
fn scrub_panic_message(message: &str) -> String {
    let mut words = Vec::new();
    let mut mask_next = false;
    for word in message.split(|c: char| c.is_whitespace() || c.is_control()) {
        if word.is_empty() {
            continue;
        }
        if mask_next {
            words.push(REDACTED);
            mask_next = false;
        } else if word.starts_with("$argon2") {
            words.push(REDACTED);
        } else {
            mask_next = word.eq_ignore_ascii_case("bearer");
            words.push(word);
        }
    }

    let line = words.join(" ");
    if line.chars().count() <= PANIC_MESSAGE_LIMIT {
        return line;
    }
    let mut capped: String = line.chars().take(PANIC_MESSAGE_LIMIT).collect();
    capped.push_str("...");
    capped
}
