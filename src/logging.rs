//! Process-wide logging configuration.
//!
//! Built once in `main` and installed before any snapshot is computed or
//! request served, instead of modules configuring logging ambiently.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

/// Fixed destination for `--debug` diagnostics.
const DEBUG_LOG_PATH: &str = "/tmp/xe-probe.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Standard logging to stderr, or verbose diagnostics appended to the
    /// fixed debug log file.
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            Self {
                level: Level::DEBUG,
                file: Some(PathBuf::from(DEBUG_LOG_PATH)),
            }
        } else {
            Self {
                level: Level::INFO,
                file: None,
            }
        }
    }

    /// Installs the global subscriber. Call exactly once.
    pub fn init(&self) -> Result<()> {
        let builder = tracing_subscriber::fmt().with_max_level(self.level);
        match &self.file {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open log file {}", path.display()))?;
                builder.with_writer(Arc::new(file)).with_ansi(false).init();
            }
            None => builder.with_writer(std::io::stderr).init(),
        }
        Ok(())
    }
}
