//! arena: command-line front end for projection-arena scanning.
//!
//! Reconstructs a flat-shaded OBJ mesh of an arena from a tracked point
//! cloud, optionally centering it and moving a rigid body's pivot to the
//! mesh origin.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=arena_scan=info` - Basic operation logging
//! - `RUST_LOG=arena_scan=debug` - Per-surface and per-face detail
//! - `RUST_LOG=arena_scan::timing=info` - Stage timing
//! - `RUST_LOG=arena_scan::align=debug` - Every pivot attempt
//!
//! # Example
//!
//! ```bash
//! # Four walls, centered, written to arena.obj
//! arena scan arena_points.xyz -o arena --n-surfaces 4
//!
//! # Estimate the surface count and report as JSON
//! arena --format json segment arena_points.ply
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{info, scan, segment};

/// arena - reconstruct projection arena meshes from tracked point clouds.
#[derive(Parser)]
#[command(name = "arena")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Options shared by commands that segment a point cloud.
#[derive(clap::Args)]
pub struct SegmentArgs {
    /// Scan configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Number of planar surfaces; 0 estimates the count
    #[arg(long, short = 'n', visible_alias = "nsides")]
    n_surfaces: Option<usize>,

    /// Inlier distance for plane fitting, in scan units
    #[arg(long)]
    threshold: Option<f64>,

    /// Random seed for plane sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Remove statistical outliers before segmenting
    #[arg(long)]
    remove_outliers: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct an arena mesh and export it as OBJ
    Scan {
        /// Input point cloud (.xyz, .txt, .asc, .pts or .ply)
        input: PathBuf,

        /// Output OBJ path; `.obj` is appended when there is no extension
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        segment: SegmentArgs,

        /// Keep tracker coordinates instead of centering on the mesh
        #[arg(long)]
        no_mean_center: bool,

        /// Marker positions of the arena rigid body (.xyz or .ply); enables
        /// pivot alignment against a simulated tracker
        #[arg(long)]
        markers: Option<PathBuf>,

        /// Rigid body name, also used as the OBJ object name
        #[arg(long)]
        body: Option<String>,

        /// Update cycles before a tracker command takes effect
        #[arg(long, default_value = "1")]
        latency: u32,

        /// Pivot move attempts before giving up
        #[arg(long)]
        max_attempts: Option<usize>,

        /// Also write the conditioned points in the mesh frame
        #[arg(long)]
        points_out: Option<PathBuf>,

        /// Tracker project to save beside as `<name>_scanned.<ext>` once the
        /// pivot is aligned; needs --markers
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Segment a point cloud into planar surfaces and report them
    Segment {
        /// Input point cloud
        input: PathBuf,

        #[command(flatten)]
        segment: SegmentArgs,
    },

    /// Display statistics of an exported arena mesh
    Info {
        /// Input OBJ file
        input: PathBuf,

        /// Show per-face normals
        #[arg(long)]
        detailed: bool,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "arena_scan=info",
            2 => "arena_scan=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

/// Dispatch the parsed subcommand.
fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Scan {
            input,
            output,
            segment,
            no_mean_center,
            markers,
            body,
            latency,
            max_attempts,
            points_out,
            project,
        } => scan::run(
            input,
            output,
            segment,
            &scan::AlignArgs {
                mean_center: !*no_mean_center,
                markers: markers.as_deref(),
                body: body.as_deref(),
                latency: *latency,
                max_attempts: *max_attempts,
                points_out: points_out.as_deref(),
                project: project.as_deref(),
            },
            cli,
        ),
        Commands::Segment { input, segment } => segment::run(input, segment, cli),
        Commands::Info { input, detailed } => info::run(input, *detailed, cli),
    }
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = run_command(&cli);

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(scan_err) = e.downcast_ref::<arena_scan::ScanError>() {
                eprintln!("{}: {}", "Error".red().bold(), scan_err);
                eprintln!("  {}: {}", "Code".cyan(), scan_err.code());
                eprintln!(
                    "  {}: {}",
                    "Suggestion".green(),
                    scan_err.recovery_suggestion()
                );
                if let Some(location) = scan_err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
