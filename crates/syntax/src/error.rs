// Chunk: docs/chunks/highlight_worker - Error types for config loading and the worker

//! Error types for the fallible surfaces of the highlighter: configuration
//! and the background worker.
//!
//! Highlighting itself never fails; it degrades to stale formats.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Config read error ({}): {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to spawn highlight worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Highlight worker disconnected")]
    Disconnected,
}

impl<T> From<crossbeam_channel::SendError<T>> for HighlightError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        Self::Disconnected
    }
}

pub type Result<T, E = HighlightError> = std::result::Result<T, E>;
