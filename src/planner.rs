// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename planning and execution
//!
//! A [`RenamePlan`] is built at preview time from the proposed stems,
//! made collision-free within the batch, and applied once the user
//! confirms. Each rename is independent: a failure is recorded on its
//! entry and the remaining files are still processed.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::history::{History, HistoryEntry};
use crate::metadata::MetadataRecord;
use crate::pattern::clean_stem;
use crate::{RenamerError, Result};

/// Lifecycle of one planned rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RenameStatus {
    Pending,
    Applied,
    Failed(String),
}

/// A proposed new stem for one file, before disambiguation
#[derive(Debug, Clone)]
pub struct ProposedRename {
    pub source: PathBuf,
    pub stem: String,
    /// The pattern produced nothing and the original name was kept
    pub fallback: bool,
    pub needs_manual_input: bool,
    pub record: Option<MetadataRecord>,
}

impl ProposedRename {
    pub fn new(source: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stem: stem.into(),
            fallback: false,
            needs_manual_input: false,
            record: None,
        }
    }
}

/// One row of the plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub source: PathBuf,
    /// Stem before any disambiguating suffix
    pub stem: String,
    /// Final file name, extension included
    pub proposed_filename: String,
    pub status: RenameStatus,
    pub fallback: bool,
    pub needs_manual_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<MetadataRecord>,
}

impl PlanEntry {
    pub fn directory(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn target(&self) -> PathBuf {
        self.directory().join(&self.proposed_filename)
    }

    pub fn original_filename(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The proposal is the file's current name
    pub fn is_unchanged(&self) -> bool {
        self.original_filename() == self.proposed_filename
    }

    fn extension(&self) -> Option<String> {
        self.source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }

    fn filename_for(&self, stem: &str) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.to_string(),
        }
    }
}

/// Result of applying one entry
#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: RenameStatus,
}

/// Per-file results of [`RenamePlan::apply`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<RenameOutcome>,
}

impl ApplyReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == RenameStatus::Applied).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RenameStatus::Failed(_)))
            .count()
    }
}

/// Planned renames for a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenamePlan {
    entries: Vec<PlanEntry>,
}

impl RenamePlan {
    /// Build a plan, suffixing `-2`, `-3`, ... onto names that collide
    /// within the same directory
    pub fn new(proposals: Vec<ProposedRename>) -> Self {
        let entries = proposals
            .into_iter()
            .map(|p| PlanEntry {
                proposed_filename: String::new(),
                source: p.source,
                stem: p.stem,
                status: RenameStatus::Pending,
                fallback: p.fallback,
                needs_manual_input: p.needs_manual_input,
                record: p.record,
            })
            .collect();

        let mut plan = Self { entries };
        plan.disambiguate();
        plan
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that would actually touch the filesystem
    pub fn pending_changes(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == RenameStatus::Pending && !e.is_unchanged())
            .count()
    }

    /// Replace one proposal with a user-typed name
    pub fn set_manual_name(&mut self, index: usize, name: &str) -> Result<()> {
        let stem = clean_stem(name);
        if stem.is_empty() {
            return Err(RenamerError::Pattern(format!("{:?} is not a usable file name", name)));
        }
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(RenamerError::NoSuchEntry { position: index + 1, len })?;

        entry.stem = stem;
        entry.fallback = false;
        entry.needs_manual_input = false;
        entry.record = None;
        self.disambiguate();
        Ok(())
    }

    fn disambiguate(&mut self) {
        let mut taken: HashSet<(PathBuf, String)> = HashSet::new();

        // Files that already carry their proposed name keep it
        let keeps: Vec<bool> = self
            .entries
            .iter()
            .map(|entry| entry.filename_for(&entry.stem) == entry.original_filename())
            .collect();
        for (entry, _) in self.entries.iter().zip(&keeps).filter(|(_, keep)| **keep) {
            taken.insert((entry.directory().to_path_buf(), entry.original_filename().to_lowercase()));
        }

        for (entry, keep) in self.entries.iter_mut().zip(keeps) {
            if keep {
                entry.proposed_filename = entry.original_filename();
                continue;
            }

            let directory = entry.directory().to_path_buf();
            let mut filename = entry.filename_for(&entry.stem);
            let mut n = 1;

            while !taken.insert((directory.clone(), filename.to_lowercase())) {
                n += 1;
                filename = entry.filename_for(&format!("{}-{}", entry.stem, n));
            }

            if n > 1 {
                debug!("Name collision for {:?}, using {}", entry.source, filename);
            }
            entry.proposed_filename = filename;
        }
    }

    /// Perform the renames in order. Successful renames are journaled
    /// when `history` is given.
    pub fn apply(&mut self, history: Option<&History>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for entry in &mut self.entries {
            if entry.status != RenameStatus::Pending {
                continue;
            }

            let target = entry.target();
            let result = if entry.is_unchanged() {
                debug!("Keeping {:?}", entry.source);
                Ok(false)
            } else {
                rename_in_place(&entry.source, &target, &entry.proposed_filename).map(|()| true)
            };

            entry.status = match result {
                Ok(renamed) => {
                    if renamed {
                        info!("Renamed {:?} -> {:?}", entry.source, target);
                        if let Some(history) = history {
                            let record = HistoryEntry::new(entry.source.clone(), target.clone(), entry.record.clone());
                            if let Err(e) = history.append(&record) {
                                warn!("Failed to record rename in history: {}", e);
                            }
                        }
                    }
                    RenameStatus::Applied
                }
                Err(reason) => {
                    warn!("Failed to rename {:?}: {}", entry.source, reason);
                    RenameStatus::Failed(reason)
                }
            };

            report.outcomes.push(RenameOutcome {
                source: entry.source.clone(),
                target,
                status: entry.status.clone(),
            });
        }

        report
    }
}

fn rename_in_place(source: &Path, target: &Path, new_name: &str) -> std::result::Result<(), String> {
    if !source.exists() {
        return Err("source file no longer exists".to_string());
    }

    // A case-only change reports the target as existing on
    // case-insensitive filesystems
    let case_change = source
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase() == new_name.to_lowercase())
        .unwrap_or(false);

    if target.exists() && !case_change {
        return Err("target exists".to_string());
    }

    std::fs::rename(source, target).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    fn names(plan: &RenamePlan) -> Vec<&str> {
        plan.entries().iter().map(|e| e.proposed_filename.as_str()).collect()
    }

    #[test]
    fn test_duplicates_get_suffixes() {
        let plan = RenamePlan::new(vec![
            ProposedRename::new("/papers/a.pdf", "2024-Zhang-X"),
            ProposedRename::new("/papers/b.pdf", "2024-Zhang-X"),
            ProposedRename::new("/papers/c.pdf", "2024-zhang-x"),
            ProposedRename::new("/other/d.pdf", "2024-Zhang-X"),
        ]);
        assert_eq!(
            names(&plan),
            vec!["2024-Zhang-X.pdf", "2024-Zhang-X-2.pdf", "2024-zhang-x-3.pdf", "2024-Zhang-X.pdf"]
        );
    }

    #[test]
    fn test_extension_is_preserved() {
        let plan = RenamePlan::new(vec![
            ProposedRename::new("/p/a.PDF", "New"),
            ProposedRename::new("/p/noext", "Bare"),
        ]);
        assert_eq!(names(&plan), vec!["New.PDF", "Bare"]);
    }

    #[test]
    fn test_apply_renames_and_journals() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir, "a.pdf");
        let b = touch(&dir, "b.pdf");
        let history = History::new(dir.path().join("history.jsonl"));

        let mut plan = RenamePlan::new(vec![ProposedRename::new(&a, "2024-Zhang-X"), ProposedRename::new(&b, "2024-Zhang-X")]);
        assert_eq!(plan.pending_changes(), 2);

        let report = plan.apply(Some(&history));
        assert_eq!((report.succeeded(), report.failed()), (2, 0));
        assert!(dir.path().join("2024-Zhang-X.pdf").exists());
        assert!(dir.path().join("2024-Zhang-X-2.pdf").exists());
        assert!(!a.exists());
        assert_eq!(history.read_all().unwrap().len(), 2);
        assert_eq!(plan.pending_changes(), 0);
    }

    #[test]
    fn test_apply_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir, "a.pdf");
        let b = touch(&dir, "b.pdf");
        let c = touch(&dir, "c.pdf");
        touch(&dir, "Taken.pdf");
        std::fs::remove_file(&b).unwrap();

        let mut plan = RenamePlan::new(vec![
            ProposedRename::new(&a, "Taken"),
            ProposedRename::new(&b, "Gone"),
            ProposedRename::new(&c, "Fresh"),
        ]);
        let report = plan.apply(None);

        assert_eq!(report.outcomes[0].status, RenameStatus::Failed("target exists".to_string()));
        assert!(matches!(report.outcomes[1].status, RenameStatus::Failed(_)));
        assert_eq!(report.outcomes[2].status, RenameStatus::Applied);
        assert_eq!((report.succeeded(), report.failed()), (1, 2));
        assert!(a.exists());
        assert!(dir.path().join("Fresh.pdf").exists());
    }

    #[test]
    fn test_unchanged_name_is_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir, "2024-Zhang-X.pdf");
        let history = History::new(dir.path().join("history.jsonl"));

        let mut plan = RenamePlan::new(vec![ProposedRename::new(&a, "2024-Zhang-X")]);
        assert_eq!(plan.pending_changes(), 0);
        let report = plan.apply(Some(&history));
        assert_eq!(report.succeeded(), 1);
        assert!(a.exists());
        assert!(history.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_correctly_named_file_keeps_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir, "a.pdf");
        let named = touch(&dir, "2024-Zhang-X.pdf");

        let mut plan = RenamePlan::new(vec![ProposedRename::new(&a, "2024-Zhang-X"), ProposedRename::new(&named, "2024-Zhang-X")]);
        assert_eq!(names(&plan), vec!["2024-Zhang-X-2.pdf", "2024-Zhang-X.pdf"]);
        assert_eq!(plan.pending_changes(), 1);

        let report = plan.apply(None);
        assert_eq!((report.succeeded(), report.failed()), (2, 0));
        assert!(named.exists());
        assert!(dir.path().join("2024-Zhang-X-2.pdf").exists());
        assert!(!a.exists());
    }

    #[test]
    fn test_apply_is_not_repeated() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir, "a.pdf");

        let mut plan = RenamePlan::new(vec![ProposedRename::new(&a, "b")]);
        assert_eq!(plan.apply(None).succeeded(), 1);
        assert!(plan.apply(None).outcomes.is_empty());
    }

    #[test]
    fn test_manual_name_replaces_proposal() {
        let mut plan = RenamePlan::new(vec![
            ProposedRename {
                needs_manual_input: true,
                fallback: true,
                ..ProposedRename::new("/p/scan.pdf", "scan")
            },
            ProposedRename::new("/p/b.pdf", "Review"),
        ]);

        plan.set_manual_name(0, "Review.pdf").unwrap();
        let entry = &plan.entries()[0];
        assert!(!entry.needs_manual_input && !entry.fallback);
        assert_eq!(names(&plan), vec!["Review.pdf", "Review-2.pdf"]);

        assert!(plan.set_manual_name(0, "///").is_err());
        assert!(matches!(
            plan.set_manual_name(5, "x"),
            Err(RenamerError::NoSuchEntry { position: 6, len: 2 })
        ));
    }
}
