//! Point cloud storage, file I/O and conditioning.
//!
//! The tracker reports the projected calibration pattern as an unordered set
//! of 3D marker positions. This module holds that data as a [`PointCloud`]
//! and provides:
//!
//! - I/O for XYZ-style text files and PLY (ASCII or binary)
//! - the minimum point count check every reconstruction starts with
//! - optional statistical outlier removal through a KD-tree
//!
//! # Example
//!
//! ```ignore
//! use arena_scan::pointcloud::{OutlierParams, PointCloud};
//!
//! let cloud = PointCloud::load("arena_points.xyz")?;
//! cloud.require_min_points()?;
//! let cleaned = cloud.remove_outliers(&OutlierParams::default());
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use ply_rs::ply::Property;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};

/// Fewest points a scan may contain before reconstruction is attempted.
pub const MIN_POINT_COUNT: usize = 100;

/// An ordered collection of 3D points in the tracker's world frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    /// Point positions.
    pub points: Vec<Point3<f64>>,
}

impl PointCloud {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// An empty cloud with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create a point cloud from positions.
    pub fn from_positions(positions: &[Point3<f64>]) -> Self {
        Self {
            points: positions.to_vec(),
        }
    }

    /// Point count.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned `(min, max)` corners.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        bounds_of(&self.points)
    }

    /// Length of the bounding box diagonal, 0 for an empty cloud.
    pub fn diagonal(&self) -> f64 {
        self.bounds().map(|(min, max)| (max - min).norm()).unwrap_or(0.0)
    }

    /// Compute the centroid (mean position) of the point cloud.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        centroid_of(&self.points)
    }

    /// Append one detection.
    #[inline]
    pub fn push(&mut self, point: Point3<f64>) {
        self.points.push(point);
    }

    #[inline]
    pub fn push_coords(&mut self, x: f64, y: f64, z: f64) {
        self.points.push(Point3::new(x, y, z));
    }

    /// Return a copy of the cloud translated by the given vector.
    pub fn translated(&self, offset: Vector3<f64>) -> Self {
        Self {
            points: self.points.iter().map(|p| p + offset).collect(),
        }
    }

    /// Fail with [`ScanError::InsufficientData`] unless the cloud holds at
    /// least [`MIN_POINT_COUNT`] points.
    pub fn require_min_points(&self) -> ScanResult<()> {
        if self.len() < MIN_POINT_COUNT {
            return Err(ScanError::insufficient_data(self.len(), MIN_POINT_COUNT));
        }
        Ok(())
    }

    /// Read a cloud, choosing the parser from the file extension.
    pub fn load(path: impl AsRef<Path>) -> ScanResult<Self> {
        let path = path.as_ref();
        let format =
            PointCloudFormat::from_path(path).ok_or_else(|| ScanError::UnsupportedFormat {
                extension: path.extension().and_then(|e| e.to_str()).map(String::from),
            })?;

        info!(path = %path.display(), ?format, "Loading point cloud");

        let cloud = match format {
            PointCloudFormat::Ply => load_ply(path)?,
            PointCloudFormat::Xyz => load_xyz(path)?,
        };

        if let Some(index) = cloud
            .points
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(ScanError::parse_error(
                path,
                format!("point {} has a non-finite coordinate", index),
            ));
        }

        info!(points = cloud.len(), "Loaded point cloud");
        Ok(cloud)
    }

    /// Write the cloud, choosing XYZ or ASCII PLY from the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> ScanResult<()> {
        let path = path.as_ref();
        let format =
            PointCloudFormat::from_path(path).ok_or_else(|| ScanError::UnsupportedFormat {
                extension: path.extension().and_then(|e| e.to_str()).map(String::from),
            })?;

        info!(path = %path.display(), ?format, "Saving point cloud");

        match format {
            PointCloudFormat::Ply => save_ply(self, path),
            PointCloudFormat::Xyz => save_xyz(self, path),
        }
    }

    /// Drop points whose mean distance to their `k` nearest neighbours is
    /// more than `std_ratio` standard deviations above the cloud average.
    pub fn remove_outliers(&self, params: &OutlierParams) -> Self {
        let k = params.k;
        if k == 0 || self.len() <= k {
            return self.clone();
        }

        let kdtree = build_kdtree(&self.points);

        let mean_distances: Vec<f64> = self
            .points
            .iter()
            .map(|p| {
                let neighbors =
                    kdtree.nearest_n::<kiddo::SquaredEuclidean>(&[p.x, p.y, p.z], k + 1);
                // The query point is its own nearest neighbour.
                let sum: f64 = neighbors.iter().skip(1).map(|n| n.distance.sqrt()).sum();
                sum / k as f64
            })
            .collect();

        let global_mean = mean_distances.iter().sum::<f64>() / mean_distances.len() as f64;
        let variance = mean_distances
            .iter()
            .map(|d| (d - global_mean).powi(2))
            .sum::<f64>()
            / mean_distances.len() as f64;
        let threshold = global_mean + params.std_ratio * variance.sqrt();

        let points: Vec<Point3<f64>> = self
            .points
            .iter()
            .zip(&mean_distances)
            .filter(|&(_, &d)| d <= threshold)
            .map(|(p, _)| *p)
            .collect();

        debug!(
            removed = self.len() - points.len(),
            threshold,
            "Removed outliers"
        );

        Self { points }
    }
}

/// Parameters for statistical outlier removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierParams {
    /// Neighbours inspected per point.
    pub k: usize,
    /// Standard deviation multiplier for the cut-off.
    pub std_ratio: f64,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            k: 16,
            std_ratio: 2.0,
        }
    }
}

impl OutlierParams {
    /// Only drop points far outside the local spacing.
    pub fn conservative() -> Self {
        Self {
            k: 16,
            std_ratio: 3.0,
        }
    }
}

pub(crate) fn bounds_of(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p))),
    )
}

pub(crate) fn centroid_of(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }

    let sum = points
        .iter()
        .map(|p| p.coords)
        .fold(Vector3::zeros(), |acc, v| acc + v);

    Some(Point3::from(sum / points.len() as f64))
}

fn build_kdtree(points: &[Point3<f64>]) -> kiddo::KdTree<f64, 3> {
    let mut kdtree = kiddo::KdTree::new();
    for (i, p) in points.iter().enumerate() {
        kdtree.add(&[p.x, p.y, p.z], i as u64);
    }
    kdtree
}

// ============================================================================
// File formats
// ============================================================================

/// Point cloud file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCloudFormat {
    /// Stanford PLY, ASCII or binary
    Ply,
    /// Whitespace-separated `x y z` per line
    Xyz,
}

impl PointCloudFormat {
    /// Format for a path's extension, if it is one we read.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "ply" => Some(PointCloudFormat::Ply),
                "xyz" | "txt" | "asc" | "pts" => Some(PointCloudFormat::Xyz),
                _ => None,
            })
    }
}

fn load_ply(path: &Path) -> ScanResult<PointCloud> {
    use ply_rs::parser::Parser;

    let file = File::open(path).map_err(|e| ScanError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<ply_rs::ply::DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| ScanError::parse_error(path, format!("PLY parse error: {:?}", e)))?;

    let Some(vertices) = ply.payload.get("vertex") else {
        return Err(ScanError::parse_error(path, "PLY file has no vertex element"));
    };

    let mut cloud = PointCloud::with_capacity(vertices.len());
    for (i, vertex) in vertices.iter().enumerate() {
        let coord = |name: &str| {
            get_ply_float(vertex.get(name)).ok_or_else(|| {
                ScanError::parse_error(path, format!("vertex {} has no numeric '{}'", i, name))
            })
        };
        cloud.push_coords(coord("x")?, coord("y")?, coord("z")?);
    }

    Ok(cloud)
}

fn get_ply_float(prop: Option<&Property>) -> Option<f64> {
    match prop? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn save_ply(cloud: &PointCloud, path: &Path) -> ScanResult<()> {
    let file = File::create(path).map_err(|e| ScanError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let emit = |writer: &mut BufWriter<File>| -> std::io::Result<()> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format ascii 1.0")?;
        writeln!(writer, "element vertex {}", cloud.len())?;
        writeln!(writer, "property double x")?;
        writeln!(writer, "property double y")?;
        writeln!(writer, "property double z")?;
        writeln!(writer, "end_header")?;
        for p in &cloud.points {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }
        writer.flush()
    };

    emit(&mut writer).map_err(|e| ScanError::io_write(path, e))
}

fn load_xyz(path: &Path) -> ScanResult<PointCloud> {
    let file = File::open(path).map_err(|e| ScanError::io_read(path, e))?;
    let reader = BufReader::new(file);

    let mut cloud = PointCloud::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ScanError::io_read(path, e))?;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let parts: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();
        if parts.len() < 3 {
            warn!("Skipping invalid line {} in XYZ file", line_num + 1);
            continue;
        }

        let mut coords = [0.0; 3];
        for (axis, (value, name)) in coords.iter_mut().zip(["x", "y", "z"]).enumerate() {
            *value = parts[axis].parse().map_err(|_| {
                ScanError::parse_error(
                    path,
                    format!("Invalid {} coordinate on line {}", name, line_num + 1),
                )
            })?;
        }

        cloud.push_coords(coords[0], coords[1], coords[2]);
    }

    Ok(cloud)
}

fn save_xyz(cloud: &PointCloud, path: &Path) -> ScanResult<()> {
    let file = File::create(path).map_err(|e| ScanError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    for p in &cloud.points {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z).map_err(|e| ScanError::io_write(path, e))?;
    }
    writer.flush().map_err(|e| ScanError::io_write(path, e))
}
