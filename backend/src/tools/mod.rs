//! Locating, updating and opening things with external tools

use crate::download::process;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use which::which;

#[cfg(windows)]
const YTDLP_BINARY: &str = "yt-dlp.exe";
#[cfg(not(windows))]
const YTDLP_BINARY: &str = "yt-dlp";

/// Install locations checked in addition to PATH
#[cfg(windows)]
const COMMON_FFMPEG_PATHS: &[&str] = &[
    r"C:\ffmpeg\bin\ffmpeg.exe",
    r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
];
#[cfg(not(windows))]
const COMMON_FFMPEG_PATHS: &[&str] = &[
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
];

/// Find yt-dlp on PATH, falling back to the WinGet package folder
pub fn detect_ytdlp() -> Option<PathBuf> {
    which("yt-dlp").ok().or_else(|| {
        let packages = dirs::data_local_dir()?
            .join("Microsoft")
            .join("WinGet")
            .join("Packages");
        find_file(&packages, YTDLP_BINARY)
    })
}

/// Every ffmpeg found on PATH plus well-known locations, first hit first
pub fn detect_ffmpeg() -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = which::which_all("ffmpeg")
        .map(|paths| paths.collect())
        .unwrap_or_default();

    for candidate in COMMON_FFMPEG_PATHS.iter().map(PathBuf::from) {
        if candidate.exists() && !found.contains(&candidate) {
            found.push(candidate);
        }
    }

    found
}

/// Pick the most complete ffmpeg build among `candidates`: a shared Gyan
/// build, then any Gyan or "full" build, then anything that is not bundled
/// with SolidWorks, then whatever came first.
pub fn preferred_ffmpeg(candidates: &[PathBuf]) -> Option<&PathBuf> {
    fn text(p: &Path) -> String {
        p.to_string_lossy().to_lowercase()
    }
    fn usable(p: &&PathBuf) -> bool {
        !text(p).contains("solidworks")
    }

    candidates
        .iter()
        .filter(usable)
        .find(|p| {
            let t = text(p);
            t.contains("gyan") && t.contains("shared")
        })
        .or_else(|| {
            candidates.iter().filter(usable).find(|p| {
                let t = text(p);
                t.contains("gyan") || t.contains("full")
            })
        })
        .or_else(|| candidates.iter().find(usable))
        .or_else(|| candidates.first())
}

/// Run `yt-dlp -U`
pub async fn update_ytdlp(ytdlp: &Path) -> Result<()> {
    if !ytdlp.exists() {
        return Err(Error::NotFound(ytdlp.to_path_buf()));
    }

    let status = process::command(ytdlp)
        .arg("-U")
        .status()
        .await
        .map_err(|source| Error::Launch {
            tool: ytdlp.to_path_buf(),
            source,
        })?;

    if status.success() {
        info!("yt-dlp update triggered");
        Ok(())
    } else {
        warn!("yt-dlp update failed with {:?}", status.code());
        Err(Error::ToolFailed {
            tool: ytdlp.to_path_buf(),
            code: status.code(),
        })
    }
}

/// Open a downloaded file with the system default application
pub fn open_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    open::that(path)?;
    Ok(())
}

/// Open the folder containing `path`; works even if the file was removed
/// as long as its folder is still there.
pub fn reveal(path: &Path) -> Result<()> {
    let folder = path
        .parent()
        .filter(|p| p.is_dir())
        .ok_or_else(|| Error::NotFound(path.to_path_buf()))?;

    if !path.exists() {
        warn!("File is gone, opening its folder instead: {:?}", path);
    }
    open::that(folder)?;
    Ok(())
}

/// Depth-first search for a file called `name` below `root`
fn find_file(root: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut dirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else if entry.file_name() == name {
            return Some(path);
        }
    }

    dirs.iter().find_map(|dir| find_file(dir, name))
}
