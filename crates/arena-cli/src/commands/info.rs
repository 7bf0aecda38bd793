//! arena info command - display statistics of an exported mesh.

use std::path::Path;

use anyhow::{Context, Result};
use arena_scan::load_obj;
use colored::Colorize;
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct MeshInfo {
    path: String,
    name: String,
    vertices: usize,
    triangles: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    surface_area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    centroid: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normals: Option<Vec<[f64; 3]>>,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

pub fn run(input: &Path, detailed: bool, cli: &Cli) -> Result<()> {
    let mesh = load_obj(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let bounds = mesh.bounds().map(|(min, max)| {
        let dims = max - min;
        BoundsInfo {
            min: [min.x, min.y, min.z],
            max: [max.x, max.y, max.z],
            dimensions: [dims.x, dims.y, dims.z],
        }
    });

    let info = MeshInfo {
        path: input.display().to_string(),
        name: mesh.name.clone(),
        vertices: mesh.vertex_count(),
        triangles: mesh.face_count(),
        bounds,
        surface_area: mesh.surface_area(),
        centroid: mesh.face_weighted_centroid().map(|c| c.coords.into()),
        normals: detailed.then(|| mesh.normals.iter().map(|n| (*n).into()).collect()),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Arena Mesh".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Object".cyan(), info.name);
                println!("  {}: {}", "Vertices".cyan(), info.vertices);
                println!("  {}: {}", "Triangles".cyan(), info.triangles);
                println!("  {}: {:.4}", "Surface area".cyan(), info.surface_area);

                if let Some(ref b) = info.bounds {
                    println!(
                        "  {}: {:.3} x {:.3} x {:.3}",
                        "Dimensions".cyan(),
                        b.dimensions[0],
                        b.dimensions[1],
                        b.dimensions[2]
                    );
                    println!(
                        "  {}: ({:.3}, {:.3}, {:.3})",
                        "Min bounds".cyan(),
                        b.min[0],
                        b.min[1],
                        b.min[2]
                    );
                    println!(
                        "  {}: ({:.3}, {:.3}, {:.3})",
                        "Max bounds".cyan(),
                        b.max[0],
                        b.max[1],
                        b.max[2]
                    );
                }
                if let Some(c) = info.centroid {
                    println!(
                        "  {}: ({:.4}, {:.4}, {:.4})",
                        "Centroid".cyan(),
                        c[0],
                        c[1],
                        c[2]
                    );
                }
                if let Some(ref normals) = info.normals {
                    for (i, n) in normals.iter().enumerate() {
                        println!(
                            "  {} {:>3}: ({:+.3}, {:+.3}, {:+.3})",
                            "Normal".cyan(),
                            i,
                            n[0],
                            n[1],
                            n[2]
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
