// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! paper-renamer: rename scientific paper PDFs from bibliographic metadata
//!
//! Each selected PDF is identified by a DOI or a text query, looked up on
//! CrossRef, and renamed according to a pattern such as
//! `{Year}-{Author}-{Title}`. Renames are journaled so they can be undone.

pub mod batch;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod journal;
pub mod metadata;
pub mod pattern;
pub mod planner;
pub mod worker;

pub use config::AppConfig;
pub use error::{RenamerError, Result};
