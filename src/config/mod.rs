// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for paper-renamer
//!
//! The config file doubles as the persisted user settings: the chosen
//! pattern and the tag list are written back whenever they change.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pattern::{Pattern, Resolver, DEFAULT_MAX_LENGTH, DEFAULT_PATTERN};
use crate::{RenamerError, Result};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Metadata API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Filename pattern, tags and limits
    #[serde(default)]
    pub naming: NamingConfig,

    /// Journal abbreviation table
    #[serde(default)]
    pub journals: JournalConfig,

    /// Rename journal used for undo
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Contact address sent to CrossRef for the polite pool
    #[serde(default)]
    pub mailto: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// How much first-page text is sent as a bibliographic query
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NamingConfig {
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_true")]
    pub abbreviate_journals: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JournalConfig {
    /// External `Full Name;Abbreviation` table; the bundled one is used if unset
    #[serde(default)]
    pub table_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_base_url() -> String { "https://api.crossref.org".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_retries() -> u32 { 2 }
fn default_max_query_chars() -> usize { 500 }
fn default_pattern() -> String { DEFAULT_PATTERN.to_string() }
fn default_max_length() -> usize { DEFAULT_MAX_LENGTH }
fn default_true() -> bool { true }
fn default_history_path() -> PathBuf { PathBuf::from("paper_renamer_history.jsonl") }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mailto: None,
            timeout_secs: default_timeout(),
            retries: default_retries(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            tags: Vec::new(),
            max_length: default_max_length(),
            abbreviate_journals: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

impl NamingConfig {
    /// Resolver for the persisted pattern and tags
    pub fn resolver(&self) -> Resolver {
        Resolver::new(Pattern::parse(&self.pattern), self.tags.clone()).with_max_length(self.max_length)
    }

    /// Append a tag unless it is blank or already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag. Returns whether it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag.trim());
        self.tags.len() != before
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| RenamerError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if Pattern::parse(&self.naming.pattern).is_blank() {
            return Err(RenamerError::Pattern("naming.pattern is empty".to_string()));
        }
        if self.naming.max_length == 0 {
            return Err(RenamerError::Config("naming.max_length must be greater than 0".to_string()));
        }
        if self.api.max_query_chars == 0 {
            return Err(RenamerError::Config("api.max_query_chars must be greater than 0".to_string()));
        }
        Url::parse(&self.api.base_url)
            .map_err(|e| RenamerError::Config(format!("api.base_url is invalid: {}", e)))?;
        Ok(())
    }
}
