// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Bibliographic metadata records and lookup outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized bibliographic metadata for one paper.
///
/// Any field may be absent. Blank strings are treated as absent so that
/// downstream code only has to check for `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
}

impl MetadataRecord {
    pub fn new(
        year: Option<i32>,
        author: Option<String>,
        title: Option<String>,
        journal: Option<String>,
    ) -> Self {
        Self {
            year,
            author: non_blank(author),
            title: non_blank(title),
            journal: non_blank(journal),
        }
    }

    /// True when no field carries data
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.author.is_none() && self.title.is_none() && self.journal.is_none()
    }

    /// Copy of this record with the journal replaced
    pub fn with_journal(&self, journal: Option<String>) -> Self {
        Self {
            journal: non_blank(journal),
            ..self.clone()
        }
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.year.map(|y| y.to_string()).as_deref().unwrap_or("-"),
            self.author.as_deref().unwrap_or("-"),
            self.title.as_deref().unwrap_or("-"),
            self.journal.as_deref().unwrap_or("-"),
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

/// Result of looking up one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The remote API returned a matching record
    Found { record: MetadataRecord },
    /// No identifier could be extracted, or the API had no match
    NotFound,
    /// The lookup could not be completed (I/O, network, rate limit)
    Failed { reason: String },
}

impl LookupOutcome {
    pub fn found(record: MetadataRecord) -> Self {
        LookupOutcome::Found { record }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        LookupOutcome::Failed { reason: reason.into() }
    }

    /// Files without a match are handed back to the user for manual entry
    pub fn needs_manual_input(&self) -> bool {
        !matches!(self, LookupOutcome::Found { .. })
    }

    pub fn record(&self) -> Option<&MetadataRecord> {
        match self {
            LookupOutcome::Found { record } => Some(record),
            _ => None,
        }
    }

    /// Short label for preview tables
    pub fn label(&self) -> &'static str {
        match self {
            LookupOutcome::Found { .. } => "found",
            LookupOutcome::NotFound => "not found",
            LookupOutcome::Failed { .. } => "lookup failed",
        }
    }
}
