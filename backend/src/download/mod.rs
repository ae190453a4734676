//! Download core: command construction, output parsing and the batch runner

pub mod command;
mod manager;
pub mod parse;
pub(crate) mod process;
mod request;
mod task;

pub use manager::*;
pub use parse::{format_size, LineKind, ProgressEvent, ResultRecord};
pub use request::*;
pub use task::ItemResult;

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Prefix `https://` when the user typed a bare host/path.
///
/// Anything that does not parse as an http(s) URL gets the prefix; the
/// downloader decides later whether the result is usable.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => raw.to_string(),
        _ => format!("https://{}", raw),
    }
}

/// Read one URL per line from a batch file, skipping blank lines.
/// Lines go through [`normalize_url`] like URLs typed by hand.
pub fn read_batch_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(normalize_url)
        .collect())
}

/// Checks done before a batch is allowed to start.
///
/// Individual URLs are not judged here: a URL the downloader rejects fails
/// its own item and the rest of the batch still runs.
pub fn validate(urls: &[String], options: &DownloadOptions) -> Result<()> {
    if urls.is_empty() {
        return Err(Error::Config("No URL provided.".into()));
    }

    let ytdlp = &options.ytdlp_path;
    if ytdlp.as_os_str().is_empty() || !ytdlp.exists() {
        return Err(Error::Config(
            "yt-dlp path invalid (Check Settings)".into(),
        ));
    }

    if !options.output_dir.is_dir() {
        return Err(Error::Config(format!(
            "output folder not found: {}",
            options.output_dir.display()
        )));
    }

    Ok(())
}
