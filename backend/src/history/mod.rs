//! Download history persisted as a JSON array, newest first

mod schema;

pub use schema::*;

use crate::error::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File-backed history store
#[derive(Clone)]
pub struct HistoryStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles within this process
    lock: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. A missing file is an empty history; an unreadable
    /// or corrupt one is logged and treated as empty.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let _guard = self.lock.lock();
        self.read()
    }

    /// Replace the stored list
    pub fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let _guard = self.lock.lock();
        self.write(entries)
    }

    /// Record a finished download at the head of the list
    pub fn add(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read();
        push_front(&mut entries, entry);
        self.write(&entries)
    }

    /// Remove the entry for `path`. Returns whether anything was removed.
    pub fn remove(&self, path: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        let mut entries = self.read();
        let before = entries.len();
        entries.retain(|e| e.path != path);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    /// Forget every entry. Files on disk are left alone.
    pub fn clear(&self) -> Result<()> {
        self.save(&[])
    }

    fn read(&self) -> Vec<HistoryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!("History load error: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::error!("History load error: {}", e);
            Vec::new()
        })
    }

    /// Write to a sibling temp file, then rename over the target
    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}
