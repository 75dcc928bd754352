// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! paper-renamer Undo Utility
//!
//! Reverses file renames recorded in the history log.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use paper_renamer::history::{History, UndoStatus};

#[derive(Parser, Debug)]
#[command(name = "paper-renamer-undo")]
#[command(version)]
#[command(about = "Undo paper-renamer file renames")]
struct Args {
    /// Path to history file
    #[arg(short = 'f', long, default_value = "paper_renamer_history.jsonl")]
    history_file: PathBuf,

    /// Number of renames to undo (default: 1, use 0 for all)
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Dry run - show what would be undone without doing it
    #[arg(long)]
    dry_run: bool,

    /// List all entries in history
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !args.history_file.exists() {
        eprintln!("History file not found: {:?}", args.history_file);
        eprintln!("No renames to undo.");
        return Ok(());
    }

    let history = History::new(args.history_file.clone());

    if args.list {
        let entries = history
            .get_recent(usize::MAX)
            .with_context(|| format!("Failed to read {:?}", args.history_file))?;
        if entries.is_empty() {
            println!("No history entries found.");
            return Ok(());
        }

        println!("Rename History ({} entries):", entries.len());
        println!("{:-<80}", "");
        for (i, entry) in entries.iter().enumerate() {
            println!(
                "{:3}. [{}] {} -> {}{}",
                i + 1,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.original_path.display(),
                entry.new_path.display(),
                if entry.undone { " (undone)" } else { "" }
            );
            if let Some(metadata) = &entry.metadata {
                println!("     Metadata: {}", metadata);
            }
        }
        return Ok(());
    }

    let outcomes = history
        .undo(args.count, args.dry_run)
        .with_context(|| format!("Failed to undo renames from {:?}", args.history_file))?;

    if outcomes.is_empty() {
        println!("No renames to undo.");
        return Ok(());
    }

    println!(
        "{}Undoing {} rename(s)...",
        if args.dry_run { "[DRY RUN] " } else { "" },
        outcomes.len()
    );

    let mut done = 0;
    let mut skipped = 0;

    for outcome in &outcomes {
        match &outcome.status {
            UndoStatus::Undone => {
                println!("  Undone: {} -> {}", outcome.from.display(), outcome.to.display());
                done += 1;
            }
            UndoStatus::WouldUndo => {
                println!("  Would rename: {} -> {}", outcome.from.display(), outcome.to.display());
                done += 1;
            }
            UndoStatus::Skipped(reason) => {
                eprintln!("  Skip: {} ({})", outcome.from.display(), reason);
                skipped += 1;
            }
        }
    }

    println!();
    if args.dry_run {
        println!("Dry run complete. {} rename(s) would be undone.", done);
    } else {
        println!("Done. {} undone, {} skipped.", done, skipped);
    }

    Ok(())
}
