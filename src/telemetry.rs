//! Logging setup: console output filtered by `RUST_LOG`, plus an optional side file
//! that records warnings and errors with timestamp and level.
//!
//! Call [`Telemetry::init`] once at process start and keep the returned guard alive
//! until shutdown; dropping it flushes the side file to disk.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("error log {path}: {source}")]
    ErrorLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

pub struct Telemetry;

impl Telemetry {
    /// Install the global subscriber. `error_log` of `None` keeps logging on the console only.
    pub fn init(filter: &str, error_log: Option<&Path>) -> Result<TelemetryGuard, TelemetryError> {
        let env_filter = EnvFilter::try_new(filter)?;
        let file = error_log.map(open_error_log).transpose()?.map(Arc::new);
        tracing_subscriber::registry()
            .with(fmt::layer().with_filter(env_filter))
            .with(file.as_ref().map(|f| error_log_layer(Arc::clone(f))))
            .try_init()?;
        if let Some(path) = error_log {
            tracing::info!(path = %path.display(), "error log opened");
        }
        Ok(TelemetryGuard { error_log: file })
    }
}

/// Keeps the side log open; flushes and syncs it on drop.
#[must_use = "dropping the guard closes the error log"]
pub struct TelemetryGuard {
    error_log: Option<Arc<File>>,
}

impl TelemetryGuard {
    pub fn flush(&self) -> io::Result<()> {
        if let Some(file) = &self.error_log {
            (&**file).flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            eprintln!("failed to flush error log: {}", e);
        }
    }
}

/// Open (append, create) the side log, creating parent directories.
pub fn open_error_log(path: &Path) -> Result<File, TelemetryError> {
    let wrap = |source| TelemetryError::ErrorLog {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    OpenOptions::new().create(true).append(true).open(path).map_err(wrap)
}

/// Plain-text WARN+ lines: `<timestamp> <LEVEL> <message> <fields>`.
fn error_log_layer<S>(file: Arc<File>) -> impl Layer<S> + Send + Sync + 'static
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::WARN)
}
