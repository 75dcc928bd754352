// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The current batch of selected files
//!
//! Owned by the caller's task. Worker events and manual entries are folded
//! in here, and a [`RenamePlan`] is built from the result.

use std::path::PathBuf;
use tracing::debug;

use crate::journal::JournalAbbreviator;
use crate::metadata::{LookupOutcome, MetadataRecord};
use crate::pattern::{Resolution, Resolver, LAST_RESORT_STEM};
use crate::planner::{ProposedRename, RenamePlan};
use crate::worker::LookupEvent;
use crate::{RenamerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    Pending,
    Done(LookupOutcome),
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub lookup: LookupState,
    /// Metadata typed in by the user, preferred over the lookup result
    pub manual: Option<MetadataRecord>,
}

impl BatchEntry {
    /// The record names are built from, if any
    pub fn record(&self) -> Option<&MetadataRecord> {
        if let Some(manual) = &self.manual {
            return Some(manual);
        }
        match &self.lookup {
            LookupState::Done(outcome) => outcome.record(),
            LookupState::Pending => None,
        }
    }

    pub fn needs_manual_input(&self) -> bool {
        self.record().map_or(true, MetadataRecord::is_empty)
    }

    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pattern and journal rules applied when planning
pub struct NamingContext {
    pub resolver: Resolver,
    /// `None` leaves journal names as CrossRef returns them
    pub abbreviator: Option<JournalAbbreviator>,
}

impl NamingContext {
    pub fn new(resolver: Resolver, abbreviator: Option<JournalAbbreviator>) -> Self {
        Self { resolver, abbreviator }
    }

    /// The record as it will be rendered, journal abbreviated
    pub fn prepare(&self, record: &MetadataRecord) -> MetadataRecord {
        match (&self.abbreviator, &record.journal) {
            (Some(abbreviator), Some(journal)) => {
                record.with_journal(Some(abbreviator.abbreviate(journal).to_string()))
            }
            _ => record.clone(),
        }
    }

    pub fn resolve(&self, record: &MetadataRecord, original_stem: &str) -> Resolution {
        self.resolver.resolve(&self.prepare(record), original_stem)
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    generation: u64,
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn new(generation: u64, paths: Vec<PathBuf>) -> Self {
        let entries = paths
            .into_iter()
            .map(|path| BatchEntry {
                path,
                lookup: LookupState::Pending,
                manual: None,
            })
            .collect();
        Self { generation, entries }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a worker result. Returns false when the event belongs to
    /// another batch or does not match an entry.
    pub fn apply_event(&mut self, event: LookupEvent) -> bool {
        if event.generation != self.generation {
            debug!("Ignoring stale lookup result for {:?}", event.path);
            return false;
        }
        match self.entries.get_mut(event.index) {
            Some(entry) if entry.path == event.path => {
                entry.lookup = LookupState::Done(event.outcome);
                true
            }
            _ => {
                debug!("Lookup result for {:?} matches no entry", event.path);
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.lookup == LookupState::Pending)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    pub fn needing_manual_input(&self) -> Vec<usize> {
        (0..self.entries.len())
            .filter(|&i| self.entries[i].needs_manual_input())
            .collect()
    }

    /// Store manually entered metadata for one file
    pub fn set_manual(&mut self, index: usize, record: MetadataRecord) -> Result<()> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(RenamerError::NoSuchEntry { position: index + 1, len })?;
        entry.manual = Some(record);
        Ok(())
    }

    /// Propose a name for every file. Files without metadata keep their
    /// current name and are flagged for manual input.
    pub fn plan(&self, naming: &NamingContext) -> RenamePlan {
        let proposals = self
            .entries
            .iter()
            .map(|entry| {
                let original = entry.file_stem();
                match entry.record().filter(|r| !r.is_empty()) {
                    Some(record) => {
                        let resolution = naming.resolve(record, &original);
                        ProposedRename {
                            fallback: resolution.fallback,
                            needs_manual_input: false,
                            record: Some(naming.prepare(record)),
                            ..ProposedRename::new(entry.path.clone(), resolution.stem)
                        }
                    }
                    // Unresolved files are proposed under their exact current name
                    None => ProposedRename {
                        fallback: true,
                        needs_manual_input: true,
                        ..ProposedRename::new(entry.path.clone(), non_empty_stem(original))
                    },
                }
            })
            .collect();

        RenamePlan::new(proposals)
    }
}

fn non_empty_stem(stem: String) -> String {
    if stem.is_empty() {
        LAST_RESORT_STEM.to_string()
    } else {
        stem
    }
}
