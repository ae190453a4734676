//! yt-mini - download core for a yt-dlp/ffmpeg front-end
//!
//! Builds yt-dlp command lines from UI choices, runs one download at a time
//! while streaming progress and results back to the caller, and keeps a
//! small config file and download history.

pub mod config;
pub mod download;
pub mod error;
pub mod history;
pub mod tools;

pub use error::{Error, Result};
