//! agevault - Move aged files into a mirrored archive tree.
//!
//! Usage:
//!   agevault SOURCE ARCHIVE_STORE AGE_DAYS                 Copy aged files (safe mode)
//!   agevault SOURCE ARCHIVE_STORE AGE_DAYS --no-safe-mode  Move them and prune empty dirs
//!   agevault --help                                        Show help

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, ensure};
use tracing_subscriber::EnvFilter;

use agevault_core::{ArchiveConfig, DEFAULT_PROBLEMS_FILE, ExclusionSet, absolute_root, printable};
use agevault_ops::{MigrationEngine, MigrationReport};

#[derive(Parser)]
#[command(
    name = "agevault",
    version,
    about = "Move files older than a threshold into a mirrored archive tree",
    long_about = "agevault walks SOURCE and copies every file last modified at least \
                  AGE_DAYS ago to the same relative location under \
                  ARCHIVE_STORE/<name of SOURCE>.\n\n\
                  Runs are non-destructive unless --no-safe-mode is given, in which case \
                  verified sources are deleted and emptied directories are pruned."
)]
struct Cli {
    /// Directory tree to archive
    source: PathBuf,

    /// Directory that receives the mirrored tree
    archive_store: PathBuf,

    /// Minimum age in days since last modification (fractions allowed)
    age_days: f64,

    /// Delete verified sources and prune empty directories
    #[arg(long)]
    no_safe_mode: bool,

    /// Where to write paths that could not be archived
    #[arg(long, default_value = DEFAULT_PROBLEMS_FILE)]
    problems: PathBuf,

    /// TOML file with `protected_markers` and `excluded_file_names`
    #[arg(long)]
    exclusions: Option<PathBuf>,

    /// Extra protected folder marker (repeatable)
    #[arg(long = "marker")]
    markers: Vec<String>,

    /// Extra file name never to archive (repeatable)
    #[arg(long = "exclude-file")]
    exclude_files: Vec<String>,

    /// Copy content and timestamps only, even where ACLs are available
    #[arg(long)]
    plain_copy: bool,

    /// Summary format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut exclusions = match &cli.exclusions {
        Some(path) => ExclusionSet::load(path).context("Invalid exclusions file")?,
        None => ExclusionSet::default(),
    };
    for marker in &cli.markers {
        exclusions = exclusions.with_marker(marker.as_str());
    }
    for name in &cli.exclude_files {
        exclusions = exclusions.with_file_name(name.as_str());
    }

    let source = absolute_root(&cli.source).context("Invalid source directory")?;
    ensure!(
        source.is_dir(),
        "Source is not a directory: {}",
        printable(&source)
    );

    let config = ArchiveConfig::builder()
        .source_root(source)
        .archive_store(cli.archive_store.clone())
        .age_days(cli.age_days)
        .safe_mode(!cli.no_safe_mode)
        .exclusions(exclusions)
        .problems_file(Some(cli.problems.clone()))
        .preserve_acl(!cli.plain_copy)
        .build()
        .context("Invalid arguments")?;

    eprintln!(
        "Archiving {} into {} (files older than {} days{})...",
        printable(&config.source_root),
        printable(&config.archive_store),
        config.age_days,
        if config.safe_mode { ", safe mode" } else { "" }
    );

    let report = MigrationEngine::new(config).run().context("Archive run failed")?;

    match cli.format {
        OutputFormat::Text => print_summary(&report, &cli.problems),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = ["agevault", "agevault_core", "agevault_scan", "agevault_analyze", "agevault_ops"]
            .map(|target| format!("{target}={level}"))
            .join(",");
        EnvFilter::new(directives)
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Print a human-readable summary of the run.
fn print_summary(report: &MigrationReport, problems_file: &Path) {
    let stats = &report.stats;

    println!();
    println!("{}", "─".repeat(60));
    println!(" {}", printable(&report.source_root));
    println!("   -> {}", printable(&report.archive_root));
    println!("{}", "─".repeat(60));
    println!(" {}", stats.summary());
    println!(
        " {} directories visited, {} mirrored",
        stats.dirs_visited, stats.dirs_created
    );
    println!(" {} copied", format_size(stats.bytes_copied));
    if stats.verification_failures > 0 {
        println!(
            " {} copies failed verification (sources kept)",
            stats.verification_failures
        );
    }
    if stats.permission_skips > 0 {
        println!(" {} entries skipped (permission denied)", stats.permission_skips);
    }

    for pruned in &report.pruned {
        println!(
            " Pruned {} empty directories under {}",
            pruned.removed.len(),
            printable(&pruned.root)
        );
    }

    if report.safe_mode {
        println!(" Safe mode: no sources deleted, nothing pruned");
    }

    if !report.problems.is_empty() {
        println!();
        println!(
            " {} problem(s) written to {}",
            report.problems.len(),
            printable(problems_file)
        );
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
