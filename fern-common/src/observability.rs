//! Centralised `tracing` setup for binaries and integration tests.
//!
//! [`init_logging`] installs a global subscriber writing to a daily-rolled
//! file sink, optionally mirrored to `stderr`. It is idempotent: the first
//! caller wins and later calls just get back the resolved log file path.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Text,
    Json,
}

/// Options for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical component name; becomes the log file stem.
    pub app_name: &'static str,
    /// Explicit log directory. When `None`, `FERN_LOG_DIR` is consulted,
    /// then `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Mirror events to `stderr` in addition to the file sink.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "fern",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::layer::Layered<EnvFilter, Registry>> + Send + Sync>;

/// Install the global subscriber and return the current day's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let file_stem = format!("{}.log", config.app_name);
    // tracing-appender names rolled files "<stem>.<YYYY-MM-DD>".
    let today_path = dir.join(format!("{}.{}", file_stem, Local::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_stem));
    let _ = LOG_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    match config.format {
        LogFormat::Text => {
            layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
            if config.emit_stderr {
                layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
            }
        }
        LogFormat::Json => {
            layers.push(fmt::layer().json().with_writer(writer).boxed());
            if config.emit_stderr {
                layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
            }
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(today_path.clone());
    Ok(today_path)
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    let chosen = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("FERN_LOG_DIR").ok().map(PathBuf::from));

    match chosen {
        Some(dir) => expand_home(&dir),
        None => match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home)
                .join(".local")
                .join("share")
                .join(app_name),
            Err(_) => PathBuf::from(".").join(app_name),
        },
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
