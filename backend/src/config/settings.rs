//! Settings data structures and the `key=value` file format

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Keys understood by the config file, in the order they are written
pub const KEYS: [&str; 4] = ["ytdlp_path", "ffmpeg_path", "download_path", "theme"];

/// Main application settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Path to the yt-dlp executable (empty when not configured)
    pub ytdlp_path: String,

    /// Path to the ffmpeg executable (empty when not configured)
    pub ffmpeg_path: String,

    /// Default output directory for downloads
    pub download_path: PathBuf,

    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        let download_path = dirs::home_dir()
            .map(|home| home.join("Desktop"))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            ytdlp_path: String::new(),
            ffmpeg_path: String::new(),
            download_path,
            theme: Theme::Dark,
        }
    }
}

impl Settings {
    /// Parse the line-oriented `key=value` format.
    ///
    /// Starts from the defaults; lines without `=` and unknown keys are
    /// skipped. Only the first `=` separates key from value.
    pub fn parse(content: &str) -> Self {
        let mut settings = Self::default();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            if settings.set(key, value).is_err() {
                tracing::debug!("Ignoring unknown config key: {}", key);
            }
        }

        settings
    }

    /// Render all known keys in a fixed order, one per line
    pub fn render(&self) -> String {
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| format!("{}={}\n", key, value)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "ytdlp_path" => Some(self.ytdlp_path.clone()),
            "ffmpeg_path" => Some(self.ffmpeg_path.clone()),
            "download_path" => Some(self.download_path.to_string_lossy().into_owned()),
            "theme" => Some(self.theme.to_string()),
            _ => None,
        }
    }

    /// Update a single key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "ytdlp_path" => self.ytdlp_path = value.to_string(),
            "ffmpeg_path" => self.ffmpeg_path = value.to_string(),
            "download_path" => self.download_path = PathBuf::from(value),
            "theme" => self.theme = Theme::from_name(value),
            _ => return Err(Error::UnknownConfigKey(key.to_string())),
        }
        Ok(())
    }

    /// True when both external tools have a path set that exists on disk
    pub fn tools_configured(&self) -> bool {
        let exists = |p: &str| !p.is_empty() && Path::new(p).exists();
        exists(&self.ytdlp_path) && exists(&self.ffmpeg_path)
    }
}

/// UI colour scheme name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// Unrecognised names fall back to dark
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
