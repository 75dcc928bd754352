// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Journal name abbreviation
//!
//! Tables are plain text, one `Full Name;Abbreviation` pair per line.
//! Lines starting with `#` are comments.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{RenamerError, Result};

/// Table compiled into the binary
const BUNDLED_TABLE: &str = include_str!("../data/journal_abbreviations.csv");

/// Full journal name to abbreviation lookup
#[derive(Debug, Clone, Default)]
pub struct JournalAbbreviator {
    exact: HashMap<String, String>,
    normalized: HashMap<String, String>,
}

impl JournalAbbreviator {
    /// Abbreviator backed by the bundled table
    pub fn bundled() -> Self {
        Self::parse(BUNDLED_TABLE)
    }

    /// Abbreviator that never changes a name
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a table, skipping malformed lines
    pub fn parse(table: &str) -> Self {
        let mut abbreviator = Self::default();

        for (number, line) in table.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.rsplit_once(';') {
                Some((full, abbrev)) if !full.trim().is_empty() && !abbrev.trim().is_empty() => {
                    abbreviator.insert(full.trim(), abbrev.trim());
                }
                _ => debug!("Skipping malformed journal table line {}: {:?}", number + 1, line),
            }
        }

        abbreviator
    }

    /// Load a table from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RenamerError::JournalTable(format!("Cannot read {:?}: {}", path, e)))?;
        let abbreviator = Self::parse(&content);
        info!("Loaded {} journal abbreviations from {:?}", abbreviator.len(), path);
        Ok(abbreviator)
    }

    /// Load the configured table, or the bundled one when none is set.
    /// An unreadable table disables abbreviation instead of failing.
    pub fn from_config(table_path: Option<&Path>) -> Self {
        match table_path {
            None => Self::bundled(),
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                warn!("{}; journal names will not be abbreviated", e);
                Self::empty()
            }),
        }
    }

    pub fn insert(&mut self, full: &str, abbreviation: &str) {
        self.exact.insert(full.to_string(), abbreviation.to_string());
        self.normalized.insert(normalize(full), abbreviation.to_string());
    }

    /// Abbreviation for `name`, or `name` itself when the table has none
    pub fn abbreviate<'a>(&'a self, name: &'a str) -> &'a str {
        self.lookup(name).unwrap_or(name)
    }

    /// Abbreviation for `name` if the table has one
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.exact
            .get(name)
            .or_else(|| self.normalized.get(&normalize(name)))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_lowercase()
}
