//! History entry types

use serde::{Deserialize, Serialize};

/// Maximum number of entries kept in the history file
pub const MAX_ENTRIES: usize = 50;

/// A completed download as stored in `history.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Absolute path of the downloaded file; unique within the list
    pub path: String,
    pub title: String,
    pub duration: String,
    /// Human readable size, e.g. "10.0 MB"
    pub size: String,
}

/// Insert `entry` at the head, dropping any entry with the same path and
/// trimming the list to [`MAX_ENTRIES`].
pub fn push_front(entries: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    entries.retain(|e| e.path != entry.path);
    entries.insert(0, entry);
    entries.truncate(MAX_ENTRIES);
}
