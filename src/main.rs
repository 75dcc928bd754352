// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! paper-renamer: rename scientific paper PDFs from CrossRef metadata
//!
//! Select PDFs, look their metadata up in the background, preview the
//! names a pattern produces, then confirm and rename in place.

use clap::{CommandFactory, Parser, Subcommand};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use paper_renamer::batch::{Batch, NamingContext};
use paper_renamer::config::{AppConfig, NamingConfig};
use paper_renamer::fetcher::crossref::CrossRefClient;
use paper_renamer::fetcher::MetadataFetcher;
use paper_renamer::history::{History, UndoStatus};
use paper_renamer::journal::JournalAbbreviator;
use paper_renamer::metadata::{LookupOutcome, MetadataRecord};
use paper_renamer::pattern::{preset, Pattern, LAST_RESORT_STEM, PRESET_PATTERNS};
use paper_renamer::planner::{PlanEntry, RenamePlan, RenameStatus};
use paper_renamer::worker::LookupWorker;
use paper_renamer::{RenamerError, Result};

/// paper-renamer CLI - rename paper PDFs from bibliographic metadata
#[derive(Parser, Debug)]
#[command(name = "paper-renamer")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Rename scientific paper PDFs using CrossRef metadata", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up and rename PDF files
    Rename {
        /// Files, directories or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,

        /// Filename pattern for this run (overrides config)
        #[arg(short, long, conflicts_with = "preset")]
        pattern: Option<String>,

        /// Use a preset pattern by number (see `config presets`)
        #[arg(long)]
        preset: Option<usize>,

        /// Extra tag for {Tags}; may be repeated
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,

        /// Scan directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Show the proposed names without renaming
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Prompt for a file name or metadata when a lookup finds nothing
        #[arg(short, long)]
        interactive: bool,

        /// Keep full journal names
        #[arg(long)]
        no_abbrev: bool,
    },

    /// Show what the lookup finds for one PDF
    Lookup {
        /// PDF file to look up
        file: PathBuf,
    },

    /// Render a pattern against hand-written metadata
    Preview {
        /// Pattern to render (defaults to the configured one)
        #[arg(short, long)]
        pattern: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        journal: Option<String>,

        /// Extra tag for {Tags}; may be repeated
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
    },

    /// Abbreviate a journal name
    Abbrev {
        /// Full journal name
        name: String,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Check CrossRef availability and show the active settings
    Status,

    /// Write a default configuration file
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Undo recent renames
    Undo {
        /// Number of renames to undo (0 = all)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,

    /// Edit configuration in $EDITOR
    Edit,

    /// List the preset patterns
    Presets,

    /// Save a new default pattern
    SetPattern {
        /// Pattern text, e.g. "{Author}-{Year}-{Title}"
        #[arg(required_unless_present = "preset", conflicts_with = "preset")]
        pattern: Option<String>,

        /// Use a preset pattern by number
        #[arg(long)]
        preset: Option<usize>,
    },

    /// Manage the saved tags
    Tags {
        #[command(subcommand)]
        action: TagCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TagCommands {
    /// List saved tags
    List,

    /// Add tags
    Add {
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove tags
    Remove {
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove all tags
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for results
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("paper-renamer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Rename {
            paths,
            pattern,
            preset,
            tags,
            recursive,
            dry_run,
            yes,
            interactive,
            no_abbrev,
        }) => {
            let naming = naming_for_run(&config.naming, pattern, preset, &tags)?;
            let options = RenameOptions {
                recursive,
                dry_run,
                yes,
                interactive,
                abbreviate: config.naming.abbreviate_journals && !no_abbrev,
            };
            run_rename(config, naming, paths, options, &cli.format).await
        }
        Some(Commands::Lookup { file }) => run_lookup(config, file, &cli.format).await,
        Some(Commands::Preview {
            pattern,
            year,
            author,
            title,
            journal,
            tags,
        }) => {
            let naming = naming_for_run(&config.naming, pattern, None, &tags)?;
            let record = MetadataRecord::new(year, author, title, journal);
            run_preview(&config, naming, record, &cli.format)
        }
        Some(Commands::Abbrev { name }) => run_abbrev(&config, &name, &cli.format),
        Some(Commands::History { action }) => run_history_command(config, action, &cli.format),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Status) => run_status(config).await,
        Some(Commands::Init { dir, force }) => run_init(dir, force),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

struct RenameOptions {
    recursive: bool,
    dry_run: bool,
    yes: bool,
    interactive: bool,
    abbreviate: bool,
}

/// Naming settings with this run's pattern and tag overrides applied
fn naming_for_run(
    base: &NamingConfig,
    pattern: Option<String>,
    preset_number: Option<usize>,
    tags: &[String],
) -> Result<NamingConfig> {
    let mut naming = base.clone();

    if let Some(number) = preset_number {
        naming.pattern = preset(number)
            .ok_or_else(|| {
                RenamerError::Pattern(format!("No preset {}; choose 1-{}", number, PRESET_PATTERNS.len()))
            })?
            .to_string();
    } else if let Some(pattern) = pattern {
        naming.pattern = pattern;
    }

    for tag in tags {
        naming.add_tag(tag);
    }

    check_pattern(&naming.pattern)?;
    Ok(naming)
}

/// Reject blank patterns and warn about placeholders that will stay literal
fn check_pattern(source: &str) -> Result<Pattern> {
    let pattern = Pattern::parse(source);
    if pattern.is_blank() {
        return Err(RenamerError::Pattern("pattern is empty".to_string()));
    }
    for unknown in pattern.unknown_placeholders() {
        warn!("Unknown placeholder {} will be kept as written", unknown);
    }
    if pattern.placeholders().is_empty() {
        warn!("Pattern {:?} has no placeholders; every file gets the same name", source);
    }
    Ok(pattern)
}

fn naming_context(naming: &NamingConfig, config: &AppConfig, abbreviate: bool) -> NamingContext {
    let abbreviator = abbreviate.then(|| JournalAbbreviator::from_config(config.journals.table_path.as_deref()));
    NamingContext::new(naming.resolver(), abbreviator)
}

/// Resolves once Ctrl+C or SIGTERM arrives
fn shutdown_signal() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, cancelling..."),
            _ = terminate => info!("Received SIGTERM, cancelling..."),
        }

        let _ = shutdown_tx.send(true);
    });

    shutdown_rx
}

/// Look up, preview, confirm and rename a set of PDFs
async fn run_rename(
    config: AppConfig,
    naming: NamingConfig,
    inputs: Vec<String>,
    options: RenameOptions,
    format: &str,
) -> Result<()> {
    config.validate()?;

    let files = collect_pdfs(&inputs, options.recursive)?;
    if files.is_empty() {
        return Err(RenamerError::Config("No PDF files found".to_string()));
    }
    info!("Looking up {} files with pattern {}", files.len(), naming.pattern);

    if options.dry_run {
        warn!("DRY RUN MODE - files will not be renamed");
    }

    let fetcher = MetadataFetcher::from_config(&config)?;
    let (worker, mut events) = LookupWorker::spawn(fetcher);
    let generation = worker.submit_batch(&files)?;
    let mut batch = Batch::new(generation, files);
    let mut shutdown = shutdown_signal();

    while !batch.is_complete() {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let path = event.path.clone();
                    let label = event.outcome.label();
                    if batch.apply_event(event) {
                        let done = batch.len() - batch.pending();
                        eprintln!("[{}/{}] {}: {}", done, batch.len(), display_name(&path), label);
                    }
                }
                None => return Err(RenamerError::Worker("lookup worker stopped unexpectedly".to_string())),
            },
            Ok(()) = shutdown.changed() => {
                worker.cancel();
                eprintln!("Cancelled; no files were renamed");
                return Ok(());
            }
        }
    }
    worker.shutdown().await;

    let manual_names = if options.interactive {
        prompt_for_manual_input(&mut batch, &mut std::io::stdin().lock())?
    } else {
        Vec::new()
    };

    let context = naming_context(&naming, &config, options.abbreviate);
    let mut plan = batch.plan(&context);
    apply_manual_names(&mut plan, manual_names);

    let unresolved = plan.entries().iter().filter(|e| e.needs_manual_input).count();
    if unresolved > 0 {
        warn!("{} files have no metadata and keep their current name", unresolved);
    }

    if format == "text" || options.dry_run {
        print_plan(&plan, format)?;
    }

    if options.dry_run {
        return Ok(());
    }

    let changes = plan.pending_changes();
    if changes == 0 {
        if format == "text" {
            println!("Nothing to rename");
        }
        return Ok(());
    }

    if !options.yes && !confirm(&format!("Rename {} files?", changes))? {
        eprintln!("Aborted; no files were renamed");
        return Ok(());
    }

    let history = History::new(config.history.path.clone());
    let report = plan.apply(Some(&history));

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "jsonl" => {
            for outcome in &report.outcomes {
                println!("{}", serde_json::to_string(outcome)?);
            }
        }
        _ => {
            for outcome in &report.outcomes {
                if let RenameStatus::Failed(reason) = &outcome.status {
                    println!("  FAILED {}: {}", outcome.source.display(), reason);
                }
            }
            println!("\nRenamed {} files, {} failed", report.succeeded(), report.failed());
        }
    }

    Ok(())
}

/// A file name typed by the user for one batch entry
struct ManualName {
    index: usize,
    name: String,
}

/// Ask about every file the lookup could not resolve: either a new file
/// name, or metadata to build one from the pattern
fn prompt_for_manual_input<R: BufRead>(batch: &mut Batch, input: &mut R) -> Result<Vec<ManualName>> {
    let missing = batch.needing_manual_input();
    let mut names = Vec::new();
    if missing.is_empty() {
        return Ok(names);
    }

    eprintln!("\n{} files need manual input (leave blank to skip a field)", missing.len());
    for index in missing {
        let path = batch.entries()[index].path.clone();
        eprintln!("\n{}", path.display());

        let name = read_line(input, "  New file name (blank to enter metadata): ")?;
        if !name.is_empty() {
            names.push(ManualName { index, name });
            continue;
        }

        let year = read_line(input, "  Year: ")?;
        let year = match year.parse::<i32>() {
            Ok(y) => Some(y),
            Err(_) if year.is_empty() => None,
            Err(_) => {
                warn!("Ignoring year {:?}", year);
                None
            }
        };
        let record = MetadataRecord::new(
            year,
            Some(read_line(input, "  Author: ")?),
            Some(read_line(input, "  Title: ")?),
            Some(read_line(input, "  Journal: ")?),
        );

        if record.is_empty() {
            eprintln!("  skipped");
            continue;
        }
        batch.set_manual(index, record)?;
    }

    Ok(names)
}

/// Put typed file names into the plan; unusable names leave the entry as it was
fn apply_manual_names(plan: &mut RenamePlan, names: Vec<ManualName>) {
    for ManualName { index, name } in names {
        if let Err(e) = plan.set_manual_name(index, &name) {
            warn!("{}; keeping the current name", e);
        }
    }
}

fn print_plan(plan: &RenamePlan, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(plan)?),
        "jsonl" => {
            for entry in plan.entries() {
                println!("{}", serde_json::to_string(entry)?);
            }
        }
        _ => {
            println!("\nProposed names:");
            for entry in plan.entries() {
                println!("  {} -> {}{}", entry.original_filename(), entry.proposed_filename, plan_note(entry));
            }
        }
    }
    Ok(())
}

fn plan_note(entry: &PlanEntry) -> &'static str {
    if entry.needs_manual_input {
        "  (no metadata)"
    } else if entry.is_unchanged() {
        "  (unchanged)"
    } else if entry.fallback {
        "  (pattern empty, name kept)"
    } else {
        ""
    }
}

/// Expand the command-line inputs into a de-duplicated list of PDFs
fn collect_pdfs(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            files.extend(scan_dir(path, recursive)?);
        } else if path.is_file() {
            if is_pdf(path) {
                files.push(path.to_path_buf());
            } else {
                warn!("Skipping non-PDF file {:?}", path);
            }
        } else {
            let matches = glob::glob(input)
                .map_err(|e| RenamerError::Config(format!("Invalid path pattern {:?}: {}", input, e)))?;
            let before = files.len();
            for entry in matches {
                match entry {
                    Ok(p) if p.is_file() && is_pdf(&p) => files.push(p),
                    Ok(_) => {}
                    Err(e) => warn!("Cannot read {:?}: {}", e.path(), e.error()),
                }
            }
            if files.len() == before {
                warn!("No PDF files match {:?}", input);
            }
        }
    }

    // `a.pdf` and `./a.pdf` are the same file
    let mut seen = HashSet::new();
    files.retain(|p| seen.insert(std::fs::canonicalize(p).unwrap_or_else(|_| p.clone())));
    Ok(files)
}

/// PDFs in a directory, sorted by path
fn scan_dir(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            if recursive {
                files.extend(scan_dir(&path, true)?);
            }
        } else if path.is_file() && is_pdf(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_line<R: BufRead>(input: &mut R, prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    std::io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = read_line(&mut std::io::stdin().lock(), &format!("{} [y/N] ", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

/// Run a lookup for one file and print what was found
async fn run_lookup(config: AppConfig, file: PathBuf, format: &str) -> Result<()> {
    let fetcher = MetadataFetcher::from_config(&config)?;

    let (identifiers, outcome) = match fetcher.identify(&file).await {
        Ok(ids) => {
            let outcome = fetcher.resolve(&file, &ids).await;
            (ids, outcome)
        }
        Err(e) => {
            warn!("Cannot read {:?}: {}", file, e);
            (Vec::new(), LookupOutcome::failed(e.to_string()))
        }
    };

    if format == "text" {
        println!("File: {}", file.display());
        println!("Source: {}", fetcher.source_name());
        if identifiers.is_empty() {
            println!("Identifiers: none");
        } else {
            println!("Identifiers:");
            for identifier in &identifiers {
                println!("  {}", identifier);
            }
        }
        println!("Result: {}", outcome.label());
        if let Some(record) = outcome.record() {
            println!("  Year:    {}", record.year.map(|y| y.to_string()).unwrap_or_default());
            println!("  Author:  {}", record.author.as_deref().unwrap_or(""));
            println!("  Title:   {}", record.title.as_deref().unwrap_or(""));
            println!("  Journal: {}", record.journal.as_deref().unwrap_or(""));
        }
    } else {
        let output = serde_json::json!({
            "path": file.to_string_lossy(),
            "identifiers": identifiers.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
            "outcome": outcome,
        });
        if format == "json" {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string(&output)?);
        }
    }

    Ok(())
}

/// Render a pattern offline
fn run_preview(config: &AppConfig, naming: NamingConfig, record: MetadataRecord, format: &str) -> Result<()> {
    let context = naming_context(&naming, config, naming.abbreviate_journals);
    let resolution = context.resolve(&record, LAST_RESORT_STEM);

    if format == "text" {
        println!("{}", resolution.stem);
        if resolution.fallback {
            eprintln!("(pattern produced an empty name)");
        }
    } else {
        let output = serde_json::json!({
            "pattern": naming.pattern,
            "metadata": context.prepare(&record),
            "stem": resolution.stem,
            "fallback": resolution.fallback,
        });
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}

fn run_abbrev(config: &AppConfig, name: &str, format: &str) -> Result<()> {
    let abbreviator = JournalAbbreviator::from_config(config.journals.table_path.as_deref());
    let known = abbreviator.lookup(name).is_some();
    let abbreviation = abbreviator.abbreviate(name);

    if format == "text" {
        println!("{}", abbreviation);
        if !known {
            eprintln!("(not in the abbreviation table)");
        }
    } else {
        let output = serde_json::json!({
            "name": name,
            "abbreviation": abbreviation,
            "known": known,
        });
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}

/// Run history commands
fn run_history_command(config: AppConfig, action: HistoryCommands, format: &str) -> Result<()> {
    let history = History::new(config.history.path.clone());

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            if format != "text" {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!(
                    "  {} {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.original_path.display(),
                    entry.new_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let outcomes = history.undo(count, dry_run)?;
            if outcomes.is_empty() {
                println!("No renames to undo");
                return Ok(());
            }
            if format != "text" {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
                return Ok(());
            }
            for outcome in outcomes {
                let verb = match &outcome.status {
                    UndoStatus::Undone => "Undone".to_string(),
                    UndoStatus::WouldUndo => "Would undo".to_string(),
                    UndoStatus::Skipped(reason) => format!("Skipped ({})", reason),
                };
                println!("{}: {} -> {}", verb, outcome.from.display(), outcome.to.display());
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(mut config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output, force } => {
            if output.exists() && !force {
                return Err(RenamerError::Config(format!(
                    "{:?} already exists. Use --force to overwrite",
                    output
                )));
            }
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            check_pattern(&config.naming.pattern)?;
            if let Some(table) = &config.journals.table_path {
                JournalAbbreviator::load(table)?;
            }
            println!("Configuration at {:?} is valid", config_path);
            println!("  Pattern: {}", config.naming.pattern);
            println!("  Tags: {:?}", config.naming.tags);
            println!("  API: {}", config.api.base_url);
        }
        ConfigCommands::Edit => {
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            std::process::Command::new(editor).arg(config_path).status()?;
        }
        ConfigCommands::Presets => {
            let sample = MetadataRecord::new(
                Some(2024),
                Some("Zhang".to_string()),
                Some("Room temperature plasticity".to_string()),
                Some("Nature Materials".to_string()),
            );
            for (i, source) in PRESET_PATTERNS.iter().enumerate() {
                let naming = NamingConfig {
                    pattern: source.to_string(),
                    ..config.naming.clone()
                };
                let marker = if config.naming.pattern == *source { "→" } else { " " };
                println!(
                    "{} {}. {:<36} {}",
                    marker,
                    i + 1,
                    source,
                    naming.resolver().resolve(&sample, LAST_RESORT_STEM).stem
                );
            }
        }
        ConfigCommands::SetPattern { pattern, preset: number } => {
            let naming = naming_for_run(&config.naming, pattern, number, &[])?;
            config.naming.pattern = naming.pattern;
            config.save(config_path)?;
            println!("Pattern set to {}", config.naming.pattern);
        }
        ConfigCommands::Tags { action } => run_tags_command(config, action, config_path)?,
    }

    Ok(())
}

fn run_tags_command(mut config: AppConfig, action: TagCommands, config_path: &Path) -> Result<()> {
    let changed = match action {
        TagCommands::List => {
            if config.naming.tags.is_empty() {
                println!("No tags");
            }
            for tag in &config.naming.tags {
                println!("{}", tag);
            }
            false
        }
        TagCommands::Add { tags } => {
            let mut changed = false;
            for tag in &tags {
                if config.naming.add_tag(tag) {
                    changed = true;
                } else {
                    eprintln!("Skipping {:?} (blank or already present)", tag);
                }
            }
            changed
        }
        TagCommands::Remove { tags } => {
            let mut changed = false;
            for tag in &tags {
                if config.naming.remove_tag(tag) {
                    changed = true;
                } else {
                    eprintln!("No tag {:?}", tag);
                }
            }
            changed
        }
        TagCommands::Clear => {
            let changed = !config.naming.tags.is_empty();
            config.naming.tags.clear();
            changed
        }
    };

    if changed {
        config.save(config_path)?;
        println!("Tags: {}", config.naming.tags.join(", "));
    }
    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("paper-renamer v{} Status", env!("CARGO_PKG_VERSION"));
    println!("==========================");

    let client = CrossRefClient::new(&config.api)?;
    match client.health_check().await {
        Ok(()) => println!("CrossRef: Reachable ({})", config.api.base_url),
        Err(e) => println!("CrossRef: Error - {}", e),
    }
    if config.api.mailto.is_none() {
        println!("  Tip: set api.mailto to use CrossRef's polite pool");
    }

    let abbreviator = JournalAbbreviator::from_config(config.journals.table_path.as_deref());
    println!("\nJournal table: {} entries", abbreviator.len());

    let history = History::new(config.history.path.clone());
    match history.get_undoable() {
        Ok(entries) => println!("History ({}): {} undoable renames", history.path().display(), entries.len()),
        Err(e) => println!("History: Error - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Pattern: {}", config.naming.pattern);
    println!("  Tags: {:?}", config.naming.tags);
    println!("  Abbreviate journals: {}", config.naming.abbreviate_journals);
    println!("  Max length: {}", config.naming.max_length);

    if let Err(e) = config.validate() {
        println!("\nConfiguration problem: {}", e);
    }

    Ok(())
}

/// Write a default config into a directory
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(RenamerError::Config(
            "config.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    std::fs::create_dir_all(&target)?;
    AppConfig::default().save(&config_path)?;

    println!("paper-renamer initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("\nNext steps:");
    println!("  1. Set api.mailto in config.json");
    println!("  2. Preview: paper-renamer rename --dry-run papers/");

    Ok(())
}
