// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Background lookup worker
//!
//! Lookups run on a single background task so the caller's loop stays
//! responsive. Each submitted batch gets a generation number; submitting a
//! new batch or calling [`LookupWorker::cancel`] makes every older request
//! stale, and stale work is skipped or its result dropped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::fetcher::MetadataFetcher;
use crate::metadata::LookupOutcome;
use crate::{RenamerError, Result};

#[derive(Debug)]
struct LookupRequest {
    generation: u64,
    index: usize,
    path: PathBuf,
}

/// Completion report for one file
#[derive(Debug, Clone)]
pub struct LookupEvent {
    pub generation: u64,
    /// Position of the file in its batch
    pub index: usize,
    pub path: PathBuf,
    pub outcome: LookupOutcome,
}

/// Handle to the background lookup task
pub struct LookupWorker {
    requests: mpsc::UnboundedSender<LookupRequest>,
    generation: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl LookupWorker {
    /// Start the worker. Completed lookups arrive on the returned receiver.
    pub fn spawn(fetcher: MetadataFetcher) -> (Self, mpsc::UnboundedReceiver<LookupEvent>) {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LookupRequest>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        let current = Arc::clone(&generation);

        let task = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                if request.generation != current.load(Ordering::Acquire) {
                    debug!("Skipping cancelled lookup for {:?}", request.path);
                    continue;
                }

                let outcome = fetcher.fetch(&request.path).await;

                if request.generation != current.load(Ordering::Acquire) {
                    debug!("Dropping result for {:?}, batch was cancelled", request.path);
                    continue;
                }

                let event = LookupEvent {
                    generation: request.generation,
                    index: request.index,
                    path: request.path,
                    outcome,
                };
                if event_tx.send(event).is_err() {
                    debug!("Lookup receiver closed, stopping worker");
                    break;
                }
            }
        });

        let worker = Self {
            requests: request_tx,
            generation,
            task,
        };
        (worker, event_rx)
    }

    /// Queue lookups for a new batch, cancelling any earlier batch.
    /// Returns the new batch generation.
    pub fn submit_batch(&self, paths: &[PathBuf]) -> Result<u64> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!("Queued {} lookups (batch {})", paths.len(), generation);

        for (index, path) in paths.iter().enumerate() {
            self.requests
                .send(LookupRequest {
                    generation,
                    index,
                    path: path.clone(),
                })
                .map_err(|_| RenamerError::Worker("lookup worker has stopped".to_string()))?;
        }

        Ok(generation)
    }

    /// Discard all queued and in-flight lookups
    pub fn cancel(&self) {
        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Cancelled lookup batch {}", previous);
    }

    /// Generation of the batch whose results are still wanted
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stop accepting work and wait for the task to finish its queue
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.task.await {
            debug!("Lookup worker ended abnormally: {}", e);
        }
    }
}
