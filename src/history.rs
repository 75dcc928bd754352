// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename journal for undo support
//!
//! One JSON object per line. Entries are only ever appended, except when
//! marking an entry undone, which rewrites the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::metadata::MetadataRecord;
use crate::Result;

/// A single rename in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Metadata the new name was built from, absent for manual names
    #[serde(default)]
    pub metadata: Option<MetadataRecord>,
    #[serde(default)]
    pub undone: bool,
}

impl HistoryEntry {
    pub fn new(original_path: PathBuf, new_path: PathBuf, metadata: Option<MetadataRecord>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_path,
            new_path,
            metadata,
            undone: false,
        }
    }
}

/// What happened to one entry during undo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum UndoStatus {
    Undone,
    WouldUndo,
    Skipped(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoOutcome {
    pub from: PathBuf,
    pub to: PathBuf,
    pub status: UndoStatus,
}

/// History manager for tracking file renames
pub struct History {
    path: PathBuf,
}

impl History {
    /// Create a new history manager
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries, oldest first
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark entries as undone
    pub fn mark_undone(&self, ids: &[&str]) -> Result<()> {
        let entries = self.read_all()?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);

        for mut entry in entries {
            if ids.contains(&entry.id.as_str()) {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Entries that haven't been undone, oldest first
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    /// Reverse the `count` most recent renames (0 = all).
    /// Entries whose file has moved, or whose original name is taken again,
    /// are skipped.
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<Vec<UndoOutcome>> {
        let mut entries = self.get_undoable()?;
        entries.reverse();
        if count > 0 {
            entries.truncate(count);
        }

        let mut outcomes = Vec::new();
        let mut undone_ids = Vec::new();

        for entry in &entries {
            let status = if !entry.new_path.exists() {
                UndoStatus::Skipped("file not found, may have been moved or deleted".to_string())
            } else if entry.original_path.exists() {
                UndoStatus::Skipped("original path already exists".to_string())
            } else if dry_run {
                UndoStatus::WouldUndo
            } else {
                match fs::rename(&entry.new_path, &entry.original_path) {
                    Ok(()) => {
                        info!("Undone: {:?} -> {:?}", entry.new_path, entry.original_path);
                        undone_ids.push(entry.id.as_str());
                        UndoStatus::Undone
                    }
                    Err(e) => UndoStatus::Skipped(e.to_string()),
                }
            };

            if let UndoStatus::Skipped(reason) = &status {
                warn!("Skipping undo of {:?}: {}", entry.new_path, reason);
            }

            outcomes.push(UndoOutcome {
                from: entry.new_path.clone(),
                to: entry.original_path.clone(),
                status,
            });
        }

        if !undone_ids.is_empty() {
            self.mark_undone(&undone_ids)?;
        }

        Ok(outcomes)
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get history file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn renamed(dir: &TempDir, from: &str, to: &str) -> HistoryEntry {
        let original = dir.path().join(from);
        let new = dir.path().join(to);
        fs::write(&new, b"%PDF").unwrap();
        HistoryEntry::new(original, new, None)
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        assert!(history.read_all().unwrap().is_empty());

        history.append(&renamed(&dir, "a.pdf", "2024-Zhang-X.pdf")).unwrap();
        history.append(&renamed(&dir, "b.pdf", "2023-Li-Y.pdf")).unwrap();

        let recent = history.get_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].new_path, dir.path().join("2023-Li-Y.pdf"));
        assert_eq!(history.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&renamed(&dir, "a.pdf", "b.pdf")).unwrap();
        let mut file = OpenOptions::new().append(true).open(history.path()).unwrap();
        writeln!(file, "{{ truncated").unwrap();

        assert_eq!(history.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_undo_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&renamed(&dir, "a.pdf", "one.pdf")).unwrap();
        history.append(&renamed(&dir, "b.pdf", "two.pdf")).unwrap();

        let outcomes = history.undo(1, false).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, UndoStatus::Undone);
        assert!(dir.path().join("b.pdf").exists());
        assert!(!dir.path().join("two.pdf").exists());
        assert!(dir.path().join("one.pdf").exists());

        let undoable = history.get_undoable().unwrap();
        assert_eq!(undoable.len(), 1);
        assert_eq!(undoable[0].new_path, dir.path().join("one.pdf"));
    }

    #[test]
    fn test_undo_dry_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&renamed(&dir, "a.pdf", "one.pdf")).unwrap();

        let outcomes = history.undo(0, true).unwrap();
        assert_eq!(outcomes[0].status, UndoStatus::WouldUndo);
        assert!(dir.path().join("one.pdf").exists());
        assert_eq!(history.get_undoable().unwrap().len(), 1);
    }

    #[test]
    fn test_undo_skips_missing_and_occupied() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));

        let gone = renamed(&dir, "a.pdf", "gone.pdf");
        fs::remove_file(&gone.new_path).unwrap();
        history.append(&gone).unwrap();

        let occupied = renamed(&dir, "b.pdf", "kept.pdf");
        fs::write(&occupied.original_path, b"new file").unwrap();
        history.append(&occupied).unwrap();

        let outcomes = history.undo(0, false).unwrap();
        assert!(outcomes.iter().all(|o| matches!(o.status, UndoStatus::Skipped(_))));
        assert!(dir.path().join("kept.pdf").exists());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&renamed(&dir, "a.pdf", "b.pdf")).unwrap();
        history.clear().unwrap();
        assert!(!history.path().exists());
        history.clear().unwrap();
    }
}
