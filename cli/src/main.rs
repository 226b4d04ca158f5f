//! discfit - Command-line interface for the fit engine.
//!
//! Decides which backup files go onto which disc, writes per-disc checksum
//! manifests and verifies written discs against them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use discfit_engine::{
    config::CapacitySetting,
    create_job,
    fs_ops::collect_size_map,
    manifest::{generate_volume_manifest, verify_manifest},
    media::display_bytes,
    plan_job, run_job,
    span::minimum_volumes,
    ChecksumAlgorithm, Config, FitAlgorithm, FitGoal, ItemTable, JobMode, MediaType, SpanItem,
    SpanJob, SpanProgress, VerifyOutcome,
};

/// discfit - fit backup sets onto optical discs
#[derive(Parser, Debug)]
#[command(name = "discfit")]
#[command(version)]
#[command(about = "Choose which files go onto which disc")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit as many files as possible onto one disc
    Fit(SizingArgs),

    /// Spread every file across as many discs as needed
    Span(SpanArgs),

    /// Run all fit algorithms on the same files and compare them
    Compare(SizingArgs),

    /// Check files on a written disc against its manifest
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct SizingArgs {
    /// Directory holding the files to place
    #[arg(long, value_name = "PATH")]
    dir: PathBuf,

    /// Disc capacity, e.g. 734003200 or "700 MB"
    #[arg(long, value_name = "SIZE", conflicts_with = "media")]
    capacity: Option<String>,

    /// Media type: cdr-74, cdrw-74, cdr-80, cdrw-80, dvd+r, dvd+rw
    #[arg(long, value_name = "TYPE")]
    media: Option<String>,

    /// Percentage of capacity held back as a safety margin
    #[arg(long, value_name = "PERCENT")]
    cushion: Option<f64>,

    /// Fit algorithm: first, best, worst or alternate
    #[arg(long, value_name = "ALGORITHM", conflicts_with = "goal")]
    algorithm: Option<String>,

    /// Fit goal: item-count, utilization, balanced or speed
    #[arg(long, value_name = "GOAL")]
    goal: Option<String>,
}

#[derive(Args, Debug)]
struct SpanArgs {
    #[command(flatten)]
    sizing: SizingArgs,

    /// Write one checksum manifest per disc into this directory
    #[arg(long, value_name = "PATH")]
    manifest_dir: Option<PathBuf>,

    /// Checksum algorithm for manifests: sha256 or blake3
    #[arg(long, value_name = "ALGORITHM", default_value = "sha256")]
    hash: String,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Manifest written by `discfit span`
    #[arg(long, value_name = "FILE")]
    manifest: PathBuf,

    /// Directory the manifest paths are relative to (e.g. the mounted disc)
    #[arg(long, value_name = "PATH")]
    root: PathBuf,

    /// Checksum algorithm, if the manifest does not name one
    #[arg(long, value_name = "ALGORITHM")]
    hash: Option<String>,
}

/// Reports span planning on stderr
struct CliProgress {
    verbose: bool,
}

impl SpanProgress<PathBuf> for CliProgress {
    fn on_span_started(&self, items: &ItemTable<PathBuf>, capacity: u64) {
        eprintln!(
            "Placing {} files ({}) on discs of {}",
            items.len(),
            display_bytes(items.total_size(), 2),
            display_bytes(capacity, 2)
        );
        eprintln!("{}", span_outlook(items, capacity));
    }

    fn on_volume_planned(&self, volume_index: usize, volume: &SpanItem<PathBuf>) {
        if self.verbose {
            eprintln!(
                "[{:3}] planned: {} files, {}",
                volume_index + 1,
                volume.items.len(),
                display_bytes(volume.size, 2)
            );
        }
    }

    fn on_span_completed(&self, volumes: &[SpanItem<PathBuf>]) {
        eprintln!("Planning complete: {} disc(s)", volumes.len());
        eprintln!();
    }
}

/// Lower bound on the disc count, as shown before a span starts
fn span_outlook(items: &ItemTable<PathBuf>, capacity: u64) -> String {
    format!(
        "It will take at least {} disc(s)",
        minimum_volumes(items.total_size(), capacity)
    )
}

/// JSON output of `discfit span`
#[derive(Debug, Serialize)]
struct SpanReport<'a> {
    minimum_volumes: u64,
    #[serde(flatten)]
    job: &'a SpanJob,
}

impl<'a> SpanReport<'a> {
    fn new(job: &'a SpanJob) -> Self {
        SpanReport {
            minimum_volumes: minimum_volumes(job.items.total_size(), job.capacity),
            job,
        }
    }
}

/// One row of `discfit compare`
#[derive(Debug, Serialize)]
struct ComparisonRow {
    algorithm: FitAlgorithm,
    count: usize,
    count_percent: f64,
    used: u64,
    utilization: f64,
    elapsed_ms: f64,
}

/// Parse arguments, set up logging, then run the command
fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit_code = match run_cli(&cli) {
        Ok(()) => 0,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": true,
                    "message": format!("{:#}", e),
                });
                println!("{}", error_json);
            } else {
                eprintln!("Error: {:#}", e);
            }
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Main CLI logic - separated for testability
fn run_cli(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Fit(sizing) => run_fit(cli, sizing),
        Command::Span(args) => run_span(cli, args),
        Command::Compare(sizing) => run_compare(cli, sizing),
        Command::Verify(args) => run_verify(cli, args),
    }
}

/// Merge the config file and the command line into a capacity and algorithm.
///
/// Flags override the file. `--media` replaces any capacity from the file,
/// and `--goal` replaces any algorithm from the file.
fn resolve_settings(
    config_path: Option<&Path>,
    sizing: &SizingArgs,
) -> anyhow::Result<(u64, FitAlgorithm)> {
    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(capacity) = &sizing.capacity {
        config.media.capacity = Some(CapacitySetting::Text(capacity.clone()));
    }
    if let Some(media) = &sizing.media {
        config.media.media_type = Some(media.parse::<MediaType>()?);
        config.media.capacity = None;
    }
    if let Some(cushion) = sizing.cushion {
        config.media.cushion_percent = cushion;
    }
    if let Some(algorithm) = &sizing.algorithm {
        config.fit.algorithm = Some(algorithm.parse::<FitAlgorithm>()?);
    }
    if let Some(goal) = &sizing.goal {
        config.fit.goal = Some(goal.parse::<FitGoal>()?);
        config.fit.algorithm = None;
    }

    let capacity = config
        .resolve_capacity()
        .context("Cannot determine disc capacity")?;
    Ok((capacity, config.resolve_algorithm()))
}

fn planned_job(cli: &Cli, sizing: &SizingArgs, mode: JobMode) -> anyhow::Result<SpanJob> {
    let (capacity, algorithm) = resolve_settings(cli.config.as_deref(), sizing)?;
    let mut job =
        create_job(&sizing.dir, mode, capacity, algorithm).context("Job creation failed")?;
    plan_job(&mut job).context("Job planning failed")?;
    Ok(job)
}

fn relative<'a>(path: &'a Path, root: &Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

fn run_fit(cli: &Cli, sizing: &SizingArgs) -> anyhow::Result<()> {
    let mut job = planned_job(cli, sizing, JobMode::Fit)?;
    run_job(&mut job, None).context("Job execution failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    let Some(volume) = job.volumes.first() else {
        bail!("fit produced no volume");
    };

    println!(
        "Fitting {} files ({}) into {} using {}",
        job.items.len(),
        display_bytes(job.total_bytes(), 2),
        display_bytes(job.capacity, 2),
        job.algorithm
    );
    for path in &volume.items {
        println!("  {}", relative(path, &job.source_path));
    }
    println!(
        "Used: {} of {} ({:.2}% utilization)",
        display_bytes(volume.size, 2),
        display_bytes(volume.capacity, 2),
        volume.utilization
    );

    if !job.deferred.is_empty() {
        eprintln!();
        eprintln!("Warning: {} file(s) did not fit and were deferred:", job.deferred.len());
        for path in &job.deferred {
            eprintln!("  {}", relative(path, &job.source_path));
        }
    }
    Ok(())
}

fn run_span(cli: &Cli, args: &SpanArgs) -> anyhow::Result<()> {
    let hash: ChecksumAlgorithm = args.hash.parse()?;
    let mut job = planned_job(cli, &args.sizing, JobMode::Span)?;

    let reporter = CliProgress {
        verbose: cli.verbose > 0,
    };
    let progress: Option<&dyn SpanProgress<PathBuf>> = if cli.quiet || cli.json {
        None
    } else {
        Some(&reporter)
    };
    run_job(&mut job, progress).context("Job execution failed")?;

    if let Some(out_dir) = &args.manifest_dir {
        // every manifest is computed before any is written
        let manifests = job
            .volumes
            .iter()
            .enumerate()
            .map(|(index, volume)| {
                generate_volume_manifest(volume, index + 1, Some(&job.source_path), hash)
            })
            .collect::<Result<Vec<_>, _>>()
            .context("Cannot generate manifests")?;

        fs::create_dir_all(out_dir)
            .with_context(|| format!("Cannot create manifest directory {}", out_dir.display()))?;
        for (index, content) in manifests.into_iter().enumerate() {
            let path = out_dir.join(format!("volume-{:03}.manifest", index + 1));
            fs::write(&path, content)
                .with_context(|| format!("Cannot write manifest {}", path.display()))?;
            tracing::info!(manifest = %path.display(), "manifest written");
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&SpanReport::new(&job))?);
        return Ok(());
    }

    for (index, volume) in job.volumes.iter().enumerate() {
        println!(
            "Disc {}: {} files, {}, {:.2}% utilization",
            index + 1,
            volume.items.len(),
            display_bytes(volume.size, 2),
            volume.utilization
        );
        if cli.verbose > 0 {
            for path in &volume.items {
                println!("  {}", relative(path, &job.source_path));
            }
        }
    }
    Ok(())
}

fn run_compare(cli: &Cli, sizing: &SizingArgs) -> anyhow::Result<()> {
    let (capacity, _) = resolve_settings(cli.config.as_deref(), sizing)?;
    let items = collect_size_map(&sizing.dir)
        .with_context(|| format!("Cannot read {}", sizing.dir.display()))?;

    let rows: Vec<ComparisonRow> = FitAlgorithm::ALL
        .into_iter()
        .map(|algorithm| {
            let start = Instant::now();
            let result = algorithm.fit(&items, capacity);
            let elapsed = start.elapsed();
            ComparisonRow {
                algorithm,
                count: result.count(),
                count_percent: if items.is_empty() {
                    0.0
                } else {
                    result.count() as f64 / items.len() as f64 * 100.0
                },
                used: result.used,
                utilization: result.utilization(capacity),
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            }
        })
        .collect();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{} files ({}), capacity {}",
        items.len(),
        display_bytes(items.total_size(), 2),
        display_bytes(capacity, 2)
    );
    println!(
        "{:<14} {:>7} {:>8} {:>14} {:>8} {:>10}",
        "algorithm", "count", "count%", "used", "util%", "time"
    );
    for row in &rows {
        println!(
            "{:<14} {:>7} {:>7.2}% {:>14} {:>7.2}% {:>8.3}ms",
            row.algorithm.name(),
            row.count,
            row.count_percent,
            display_bytes(row.used, 2),
            row.utilization,
            row.elapsed_ms
        );
    }
    Ok(())
}

fn run_verify(cli: &Cli, args: &VerifyArgs) -> anyhow::Result<()> {
    let default_algorithm = match &args.hash {
        Some(name) => name.parse::<ChecksumAlgorithm>()?,
        None => ChecksumAlgorithm::default(),
    };
    let content = fs::read_to_string(&args.manifest)
        .with_context(|| format!("Cannot read manifest {}", args.manifest.display()))?;
    let entries = verify_manifest(&content, &args.root, default_algorithm)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            let status = match entry.outcome {
                VerifyOutcome::Match => "OK",
                VerifyOutcome::Mismatch => "MISMATCH",
                VerifyOutcome::Missing => "MISSING",
            };
            println!("{:<8} {}", status, entry.path);
        }
    }

    let failed = entries
        .iter()
        .filter(|entry| entry.outcome != VerifyOutcome::Match)
        .count();
    if failed > 0 {
        bail!("{} of {} files failed verification", failed, entries.len());
    }
    if !cli.json {
        println!("Verification: {} OK", entries.len());
    }
    Ok(())
}
