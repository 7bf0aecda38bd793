//! arena segment command - report the planar surfaces of a point cloud.

use std::path::Path;

use anyhow::Result;
use arena_scan::segment;
use colored::Colorize;
use serde::Serialize;

use super::{load_config, load_points};
use crate::{Cli, OutputFormat, SegmentArgs, output};

#[derive(Serialize)]
struct SurfaceInfo {
    points: usize,
    normal: [f64; 3],
    centroid: [f64; 3],
    rms_residual: f64,
}

#[derive(Serialize)]
struct SegmentReport {
    input: String,
    points: usize,
    conditioned_points: usize,
    requested: usize,
    surfaces: Vec<SurfaceInfo>,
}

pub fn run(input: &Path, args: &SegmentArgs, cli: &Cli) -> Result<()> {
    let config = load_config(args)?;
    let cloud = load_points(input)?;

    let conditioned = match &config.outliers {
        Some(params) => cloud.remove_outliers(params),
        None => cloud.clone(),
    };

    output::info(
        &format!("Segmenting {} points...", conditioned.len()),
        cli.format,
        cli.quiet,
    );
    let surfaces = segment(&conditioned, config.n_surfaces, &config.segment)?;

    let report = SegmentReport {
        input: input.display().to_string(),
        points: cloud.len(),
        conditioned_points: conditioned.len(),
        requested: config.n_surfaces,
        surfaces: surfaces
            .iter()
            .map(|s| SurfaceInfo {
                points: s.len(),
                normal: s.plane.normal.into(),
                centroid: s.plane.centroid.coords.into(),
                rms_residual: s.rms_residual,
            })
            .collect(),
    };

    match cli.format {
        OutputFormat::Json => output::print(&report, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!("Found {} planar surfaces", report.surfaces.len()),
                    cli.format,
                    cli.quiet,
                );
                for (i, s) in report.surfaces.iter().enumerate() {
                    println!(
                        "  {} {:>2}: {:>6} points  normal ({:+.3}, {:+.3}, {:+.3})  rms {:.4}",
                        "Surface".cyan(),
                        i,
                        s.points,
                        s.normal[0],
                        s.normal[1],
                        s.normal[2],
                        s.rms_residual
                    );
                }
                let dropped = report.points - report.conditioned_points;
                if dropped > 0 {
                    println!("  {}: {} outliers removed", "Cleanup".green(), dropped);
                }
            }
        }
    }

    Ok(())
}
