//! Error types shared by the download core

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input detected before any process is launched
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("external tool failed: {tool} (code={code:?})")]
    ToolFailed { tool: PathBuf, code: Option<i32> },

    #[error("path not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
