//! arena scan command - reconstruct, center, align and export.

use std::path::Path;

use anyhow::{Context, Result};
use arena_scan::{
    PointCloud, RigidBody, SimulatedRigidBody, Tracker, configure_for_scanning, reset_rigid_body,
    resolve_output_path, run_scan, scanned_project_path,
};
use colored::Colorize;
use serde::Serialize;

use super::{load_config, load_points};
use crate::{Cli, OutputFormat, SegmentArgs, output};

/// Mean-centering and rigid body options of `arena scan`.
pub struct AlignArgs<'a> {
    pub mean_center: bool,
    pub markers: Option<&'a Path>,
    pub body: Option<&'a str>,
    pub latency: u32,
    pub max_attempts: Option<usize>,
    pub points_out: Option<&'a Path>,
    pub project: Option<&'a Path>,
}

#[derive(Serialize)]
struct AlignmentInfo {
    body: String,
    attempts: usize,
    pivot: [f64; 3],
    previous_location: [f64; 3],
    final_location: [f64; 3],
}

#[derive(Serialize)]
struct ScanReport {
    input: String,
    output: String,
    success: bool,
    points: usize,
    surfaces: usize,
    faces: usize,
    vertices: usize,
    triangles: usize,
    centered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    alignment: Option<AlignmentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    points_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_output: Option<String>,
}

pub fn run(
    input: &Path,
    output_path: &Path,
    segment: &SegmentArgs,
    align: &AlignArgs<'_>,
    cli: &Cli,
) -> Result<()> {
    let mut config = load_config(segment)?;
    config.mean_center = align.mean_center;
    if let Some(name) = align.body {
        config.name = name.to_string();
    }
    if let Some(attempts) = align.max_attempts {
        config.align.max_attempts = attempts;
    }
    config.validate()?;

    let output_path = resolve_output_path(output_path)?;

    let mut body = match align.markers {
        Some(path) => {
            let markers = PointCloud::load(path)
                .with_context(|| format!("Failed to load rigid body markers from {:?}", path))?;
            Some(
                SimulatedRigidBody::new(config.name.clone(), markers.points)
                    .with_latency(align.latency),
            )
        }
        None => None,
    };
    if body.is_none() && align.project.is_some() {
        output::warning("--project needs --markers; no project will be saved", cli.quiet);
    }

    let saved_cameras = match body.as_mut() {
        Some(body) => {
            let saved = configure_for_scanning(body)?;
            output::info(
                &format!("Resetting rigid body '{}'...", body.name()),
                cli.format,
                cli.quiet,
            );
            reset_rigid_body(body, &config.align)?;
            Some(saved)
        }
        None => None,
    };

    let cloud = load_points(input);
    if let (Some(saved), Some(body)) = (saved_cameras, body.as_mut()) {
        saved.restore(body)?;
    }
    let cloud = cloud?;

    if body.is_some() && !config.mean_center {
        output::warning(
            "--markers has no effect with --no-mean-center; the pivot is left in place",
            cli.quiet,
        );
    }

    output::info(
        &format!("Reconstructing arena from {} points...", cloud.len()),
        cli.format,
        cli.quiet,
    );
    let outcome = run_scan(
        &cloud,
        &config,
        body.as_mut().map(|b| b as &mut dyn RigidBody),
        &output_path,
    )?;

    let project_output = match (align.project, body.as_mut()) {
        (Some(project), Some(body)) => {
            let path = scanned_project_path(project);
            body.save_project(&path)?;
            Some(path.display().to_string())
        }
        _ => None,
    };

    if let Some(path) = align.points_out {
        outcome
            .points
            .save(path)
            .with_context(|| format!("Failed to save points to {:?}", path))?;
    }

    let report = ScanReport {
        input: input.display().to_string(),
        output: outcome.output.display().to_string(),
        success: true,
        points: outcome.reconstruction.points.len(),
        surfaces: outcome.reconstruction.surfaces.len(),
        faces: outcome.reconstruction.indexed.face_count(),
        vertices: outcome.mesh.vertex_count(),
        triangles: outcome.mesh.face_count(),
        centered: config.mean_center,
        alignment: outcome.alignment.as_ref().map(|a| AlignmentInfo {
            body: config.name.clone(),
            attempts: a.attempts,
            pivot: a.pivot.coords.into(),
            previous_location: a.previous_location.coords.into(),
            final_location: a.final_location.coords.into(),
        }),
        points_output: align.points_out.map(|p| p.display().to_string()),
        project_output,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&report, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!("Arena mesh saved to {}", report.output),
                    cli.format,
                    cli.quiet,
                );
                println!(
                    "  {}: {} surfaces from {} points",
                    "Segments".cyan(),
                    report.surfaces,
                    report.points
                );
                println!(
                    "  {}: {} vertices, {} faces, {} triangles",
                    "Mesh".cyan(),
                    report.vertices,
                    report.faces,
                    report.triangles
                );
                if let Some(ref a) = report.alignment {
                    println!(
                        "  {}: '{}' pivot at ({:.4}, {:.4}, {:.4}) after {} attempts",
                        "Alignment".green(),
                        a.body,
                        a.pivot[0],
                        a.pivot[1],
                        a.pivot[2],
                        a.attempts
                    );
                } else if report.centered {
                    println!("  {}: mesh centered on its centroid", "Alignment".green());
                }
                if let Some(ref p) = report.points_output {
                    println!("  {}: {}", "Points".cyan(), p);
                }
                if let Some(ref p) = report.project_output {
                    println!("  {}: {}", "Project".cyan(), p);
                }
            }
        }
    }

    Ok(())
}
