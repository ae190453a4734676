//! Configuration management for yt-mini

mod settings;

pub use settings::*;

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the default application data directory
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yt-mini")
}

/// Locations of every file the application owns
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new(config_dir())
    }
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.txt")
    }

    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("debug.log")
    }

    /// Where the last rendered command line is dumped in debug mode
    pub fn last_command_file(&self) -> PathBuf {
        self.root.join("last_command.txt")
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Load configuration, falling back to defaults when the file is missing
pub fn load(paths: &AppPaths) -> Result<Settings> {
    let path = paths.config_file();

    if path.exists() {
        let content = fs::read_to_string(&path)?;
        Ok(Settings::parse(&content))
    } else {
        Ok(Settings::default())
    }
}

/// Load configuration, logging and swallowing read errors
pub fn load_or_default(paths: &AppPaths) -> Settings {
    load(paths).unwrap_or_else(|e| {
        tracing::error!("Config load error: {}", e);
        Settings::default()
    })
}

/// Save configuration to file
pub fn save(paths: &AppPaths, settings: &Settings) -> Result<()> {
    paths.ensure_root()?;
    fs::write(paths.config_file(), settings.render())?;
    Ok(())
}

/// Delete config, history and log files. Missing files are not an error.
pub fn factory_reset(paths: &AppPaths) -> Result<()> {
    for file in [paths.config_file(), paths.history_file(), paths.log_file()] {
        match fs::remove_file(&file) {
            Ok(()) => tracing::info!("Removed {:?}", file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        assert_eq!(load(&paths).unwrap(), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path().join("nested"));

        let mut settings = Settings::default();
        settings.ytdlp_path = "/usr/local/bin/yt-dlp".into();
        save(&paths, &settings).unwrap();

        assert_eq!(load(&paths).unwrap(), settings);
    }

    #[test]
    fn factory_reset_removes_owned_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        fs::write(paths.config_file(), "theme=light\n").unwrap();
        fs::write(paths.history_file(), "[]").unwrap();

        factory_reset(&paths).unwrap();

        assert!(!paths.config_file().exists());
        assert!(!paths.history_file().exists());
        // second reset on an empty dir is fine
        factory_reset(&paths).unwrap();
    }
}
