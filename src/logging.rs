use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{Level, Log, Metadata, Record};

/// Logger handle handed to the parsing and linking components.
///
/// Components never reach for the global logger themselves; the binary passes
/// [`log::logger()`] in and tests pass a capturing logger.
#[derive(Clone, Copy)]
pub struct Diagnostics<'a> {
    logger: &'a dyn Log,
    target: &'static str,
}

impl<'a> Diagnostics<'a> {
    pub fn new(logger: &'a dyn Log, target: &'static str) -> Self {
        Self { logger, target }
    }

    /// Same sink, different target.
    pub fn with_target(self, target: &'static str) -> Self {
        Self { target, ..self }
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if self.logger.enabled(&metadata) {
            self.logger
                .log(&Record::builder().metadata(metadata).args(args).build());
        }
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }
}

impl Diagnostics<'static> {
    /// Diagnostics routed to whatever logger the binary installed.
    pub fn global(target: &'static str) -> Self {
        Self::new(log::logger(), target)
    }
}

impl fmt::Debug for Diagnostics<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Default log file name for a run started at `started_at`, e.g.
/// `flake-tracker-Oct-19-2026.log`.
pub fn default_log_file(started_at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!(
        "flake-tracker-{}.log",
        started_at.format("%b-%d-%Y")
    ))
}

/// Installs `env_logger` as the global logger.
///
/// Filtering follows `RUST_LOG` and defaults to `warn`. With a log file the
/// output is appended to it instead of stderr.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .context("Failed to install logger")?;

    Ok(())
}
