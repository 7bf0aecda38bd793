//! End-to-end reconstruction and scan configuration.
//!
//! [`reconstruct`] runs the pure part of a scan:
//! cloud -> segment -> index -> triangulate -> [`Mesh`].
//! [`run_scan`] adds the output path check, optional mean-centering with
//! pivot alignment, and OBJ export.
//!
//! A [`ScanConfig`] can be stored as TOML or JSON:
//!
//! ```toml
//! name = "arena"
//! n_surfaces = 0
//! mean_center = true
//!
//! [segment]
//! ransac_iterations = 800
//! seed = 7
//!
//! [index]
//! simplify_tolerance = 0.03
//!
//! [align]
//! max_attempts = 300
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::align::{AlignParams, Alignment, center_and_align, mean_center};
use crate::error::{ScanError, ScanResult};
use crate::hardware::RigidBody;
use crate::index::{IndexParams, IndexedFaces, index};
use crate::io::{resolve_output_path, save_obj};
use crate::pointcloud::{OutlierParams, PointCloud};
use crate::segment::{SegmentParams, Surface, segment};
use crate::tracing_ext::{OperationTimer, log_mesh_stats};
use crate::triangulate::triangulate_with_normals;
use crate::types::Mesh;

/// Everything that controls a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Rigid body name, also used as the OBJ object name.
    pub name: String,

    /// Number of planar surfaces; 0 estimates the count.
    pub n_surfaces: usize,

    /// Center the mesh on its centroid and move the pivot there.
    pub mean_center: bool,

    /// Outlier removal before segmentation; `None` disables it.
    pub outliers: Option<OutlierParams>,

    pub segment: SegmentParams,
    pub index: IndexParams,
    pub align: AlignParams,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            name: "arena".to_string(),
            n_surfaces: 0,
            mean_center: true,
            outliers: None,
            segment: SegmentParams::default(),
            index: IndexParams::default(),
            align: AlignParams::default(),
        }
    }
}

impl ScanConfig {
    /// Check every parameter group.
    pub fn validate(&self) -> ScanResult<()> {
        if self.name.trim().is_empty() {
            return Err(ScanError::invalid_config("name must not be empty"));
        }
        if self.name.contains(char::is_whitespace) {
            return Err(ScanError::invalid_config(format!(
                "name '{}' must not contain whitespace",
                self.name
            )));
        }
        self.segment.validate()?;
        self.index.validate()?;
        self.align.validate()?;
        Ok(())
    }

    /// Parse configuration from TOML.
    pub fn from_toml(toml_str: &str) -> ScanResult<Self> {
        toml::from_str(toml_str).map_err(|e| ScanError::invalid_config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ScanResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ScanError::io_read(path, e))?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> ScanResult<String> {
        toml::to_string_pretty(self).map_err(|e| ScanError::invalid_config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> ScanResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| ScanError::io_write(path, e))
    }

    /// Parse configuration from JSON.
    pub fn from_json(json_str: &str) -> ScanResult<Self> {
        serde_json::from_str(json_str).map_err(|e| ScanError::invalid_config(e.to_string()))
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> ScanResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScanError::invalid_config(e.to_string()))
    }
}

/// Intermediate and final products of [`reconstruct`].
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// The cloud after outlier removal.
    pub points: PointCloud,
    pub surfaces: Vec<Surface>,
    pub indexed: IndexedFaces,
    pub mesh: Mesh,
}

/// Turn a point cloud into a flat-shaded arena mesh.
pub fn reconstruct(cloud: &PointCloud, config: &ScanConfig) -> ScanResult<Reconstruction> {
    let _timer = OperationTimer::with_points("reconstruct", cloud.len());
    config.validate()?;
    cloud.require_min_points()?;

    let points = match &config.outliers {
        Some(params) => cloud.remove_outliers(params),
        None => cloud.clone(),
    };

    let surfaces = segment(&points, config.n_surfaces, &config.segment)?;
    let indexed = index(&surfaces, &config.index)?;
    let mesh = triangulate_with_normals(&indexed, config.name.clone())?;
    log_mesh_stats(&mesh, "reconstructed");

    Ok(Reconstruction {
        points,
        surfaces,
        indexed,
        mesh,
    })
}

/// Result of [`run_scan`].
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Where the OBJ was written.
    pub output: PathBuf,
    pub reconstruction: Reconstruction,
    /// The exported mesh, centered when mean-centering ran.
    pub mesh: Mesh,
    /// The conditioned points in the mesh's frame.
    pub points: PointCloud,
    /// Present when mean-centering ran against a rigid body.
    pub alignment: Option<Alignment>,
}

/// Reconstruct, optionally center and align, and export.
///
/// The output path is checked before any other work. With
/// `config.mean_center` set, the mesh and points are centered; when a rigid
/// body is given its pivot is also moved to the centroid.
pub fn run_scan(
    cloud: &PointCloud,
    config: &ScanConfig,
    body: Option<&mut dyn RigidBody>,
    output: impl AsRef<Path>,
) -> ScanResult<ScanOutcome> {
    let output = resolve_output_path(output)?;
    let reconstruction = reconstruct(cloud, config)?;

    let (mesh, points, alignment) = match (config.mean_center, body) {
        (true, Some(body)) => {
            let alignment =
                center_and_align(&reconstruction.mesh, &reconstruction.points, body, &config.align)?;
            (alignment.mesh.clone(), alignment.points.clone(), Some(alignment))
        }
        (true, None) => {
            let (mesh, points, _) = mean_center(&reconstruction.mesh, &reconstruction.points)?;
            (mesh, points, None)
        }
        (false, _) => (
            reconstruction.mesh.clone(),
            reconstruction.points.clone(),
            None,
        ),
    };

    save_obj(&mesh, &output)?;
    info!(
        output = %output.display(),
        surfaces = reconstruction.surfaces.len(),
        vertices = mesh.vertex_count(),
        triangles = mesh.face_count(),
        "Arena scan exported"
    );

    Ok(ScanOutcome {
        output,
        reconstruction,
        mesh,
        points,
        alignment,
    })
}
