// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Metadata lookup for PDF files
//!
//! [`MetadataFetcher`] turns a file into candidate identifiers (a DOI or a
//! bibliographic query) and asks a [`MetadataSource`] to resolve them.
//! Every failure ends up in the returned [`LookupOutcome`]; nothing here
//! aborts a batch.

pub mod crossref;
pub mod pdf;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::metadata::{LookupOutcome, MetadataRecord};
use crate::{RenamerError, Result};

/// What we know about a paper before asking the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Doi(String),
    /// Free-text bibliographic query (a title or first-page snippet)
    Query(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Doi(doi) => write!(f, "doi:{}", doi),
            Identifier::Query(q) if q.chars().count() > 60 => {
                write!(f, "query:\"{}...\"", q.chars().take(60).collect::<String>())
            }
            Identifier::Query(q) => write!(f, "query:\"{}\"", q),
        }
    }
}

/// A remote bibliographic service
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Name of this source
    fn name(&self) -> &'static str;

    /// Resolve an identifier. `Ok(None)` means the service has no match.
    async fn lookup(&self, identifier: &Identifier) -> Result<Option<MetadataRecord>>;
}

/// Extracts identifiers from PDFs and resolves them through a source
#[derive(Clone)]
pub struct MetadataFetcher {
    source: Arc<dyn MetadataSource>,
    max_query_chars: usize,
}

impl MetadataFetcher {
    pub fn new(source: Arc<dyn MetadataSource>, max_query_chars: usize) -> Self {
        Self {
            source,
            max_query_chars,
        }
    }

    /// Fetcher backed by CrossRef as configured
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = crossref::CrossRefClient::new(&config.api)?;
        Ok(Self::new(Arc::new(client), config.api.max_query_chars))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Candidate identifiers for a file, most specific first.
    /// PDF parsing runs on the blocking pool.
    pub async fn identify(&self, path: &Path) -> Result<Vec<Identifier>> {
        let path = path.to_path_buf();
        let max_query_chars = self.max_query_chars;

        tokio::task::spawn_blocking(move || {
            pdf::read_pdf(&path).map(|contents| pdf::candidates(&contents, max_query_chars))
        })
        .await
        .map_err(|e| RenamerError::Pdf(format!("PDF reader stopped unexpectedly: {}", e)))?
    }

    /// Look up one file. Identifiers are tried in order until one matches.
    pub async fn fetch(&self, path: &Path) -> LookupOutcome {
        let identifiers = match self.identify(path).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Cannot read {:?}: {}", path, e);
                return LookupOutcome::failed(e.to_string());
            }
        };

        self.resolve(path, &identifiers).await
    }

    /// Resolve identifiers already extracted from `path`, in order
    pub async fn resolve(&self, path: &Path, identifiers: &[Identifier]) -> LookupOutcome {
        if identifiers.is_empty() {
            info!("No DOI or text found in {:?}", path);
            return LookupOutcome::NotFound;
        }

        let mut last_error = None;
        for identifier in identifiers {
            debug!("Looking up {:?} via {} using {}", path, self.source.name(), identifier);
            match self.source.lookup(identifier).await {
                Ok(Some(record)) if !record.is_empty() => {
                    info!("Found metadata for {:?}: {}", path, record);
                    return LookupOutcome::found(record);
                }
                Ok(_) => debug!("No match for {}", identifier),
                Err(e) => {
                    warn!("Lookup failed for {:?} ({}): {}", path, identifier, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => LookupOutcome::failed(e.to_string()),
            None => LookupOutcome::NotFound,
        }
    }
}
