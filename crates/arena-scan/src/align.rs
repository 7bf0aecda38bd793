//! Mean-centering and pivot alignment.
//!
//! The exported mesh is expressed relative to its own centroid, and the
//! tracker's rigid-body pivot is moved to that same centroid so tracked
//! poses and mesh coordinates share one origin.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};
use crate::hardware::RigidBody;
use crate::pointcloud::{PointCloud, centroid_of};
use crate::tracing_ext::{OperationTimer, log_alignment_attempt};
use crate::types::Mesh;

/// Parameters for [`center_and_align`] and [`reset_rigid_body`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignParams {
    /// Pivot move attempts before giving up.
    pub max_attempts: usize,
    /// Relative tolerance per coordinate.
    pub rtol: f64,
    /// Absolute tolerance per coordinate.
    pub atol: f64,
    /// Reset commands issued before verifying a reset.
    pub reset_cycles: usize,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            max_attempts: 300,
            rtol: 1e-3,
            atol: 1e-8,
            reset_cycles: 3,
        }
    }
}

impl AlignParams {
    pub fn validate(&self) -> ScanResult<()> {
        if self.max_attempts == 0 {
            return Err(ScanError::invalid_config("max_attempts must be at least 1"));
        }
        if !(self.rtol >= 0.0 && self.atol >= 0.0) {
            return Err(ScanError::invalid_config(format!(
                "tolerances must be non-negative, got rtol={} atol={}",
                self.rtol, self.atol
            )));
        }
        Ok(())
    }
}

/// Outcome of [`center_and_align`].
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Mesh translated so its face-weighted centroid is the origin.
    pub mesh: Mesh,
    /// Raw points translated by the same offset.
    pub points: PointCloud,
    /// Translation that was applied (the negated centroid).
    pub offset: Vector3<f64>,
    /// World-frame centroid the pivot was moved to.
    pub pivot: Point3<f64>,
    /// Attempts used, between 1 and `max_attempts`.
    pub attempts: usize,
    /// Pivot location before alignment.
    pub previous_location: Point3<f64>,
    /// Pivot location after alignment.
    pub final_location: Point3<f64>,
}

/// `|actual - expected| <= atol + rtol * |expected|` per coordinate.
pub fn is_close(actual: &Point3<f64>, expected: &Point3<f64>, rtol: f64, atol: f64) -> bool {
    actual
        .coords
        .iter()
        .zip(expected.coords.iter())
        .all(|(a, e)| (a - e).abs() <= atol + rtol * e.abs())
}

/// Translate mesh and points so the mesh's face-weighted centroid is the
/// origin. Returns the translated copies and the world-frame centroid.
///
/// Fails with [`ScanError::InvalidMesh`] for a mesh without faces.
pub fn mean_center(mesh: &Mesh, points: &PointCloud) -> ScanResult<(Mesh, PointCloud, Point3<f64>)> {
    let centroid = mesh
        .face_weighted_centroid()
        .ok_or_else(|| ScanError::invalid_mesh("cannot center a mesh without faces"))?;
    let offset = -centroid.coords;
    Ok((mesh.translated(offset), points.translated(offset), centroid))
}

/// Center mesh and points on the mesh centroid and move the tracker's pivot
/// there.
///
/// Each attempt resets the pivot offset, requests the new location, runs one
/// update cycle and compares the reported location with the centroid. When
/// `max_attempts` attempts pass without agreement the call fails with
/// [`ScanError::HardwareConvergenceFailure`] and no mesh is returned.
pub fn center_and_align<B: RigidBody + ?Sized>(
    mesh: &Mesh,
    points: &PointCloud,
    body: &mut B,
    params: &AlignParams,
) -> ScanResult<Alignment> {
    let _timer = OperationTimer::new("center_and_align");
    params.validate()?;

    let (centered_mesh, centered_points, pivot) = mean_center(mesh, points)?;
    let previous_location = body.location()?;

    info!(
        body = body.name(),
        pivot = format!("({:.4}, {:.4}, {:.4})", pivot.x, pivot.y, pivot.z),
        "Moving rigid body pivot to mesh centroid"
    );

    let mut reported = previous_location;
    for attempt in 1..=params.max_attempts {
        body.reset_pivot_offset()?;
        body.set_location(pivot)?;
        body.update()?;
        reported = body.location()?;
        log_alignment_attempt(attempt, &pivot, &reported);

        if is_close(&reported, &pivot, params.rtol, params.atol) {
            debug!(attempts = attempt, "Pivot aligned");
            return Ok(Alignment {
                mesh: centered_mesh,
                points: centered_points,
                offset: -pivot.coords,
                pivot,
                attempts: attempt,
                previous_location,
                final_location: reported,
            });
        }
    }

    warn!(
        body = body.name(),
        attempts = params.max_attempts,
        "Pivot did not reach the mesh centroid"
    );
    Err(ScanError::HardwareConvergenceFailure {
        attempts: params.max_attempts,
        target: pivot.coords.into(),
        reported: reported.coords.into(),
    })
}

/// Put a rigid body into a known state before scanning.
///
/// Issues `reset_cycles` rounds of orientation reset, pivot reset and update,
/// then checks that the orientation reads zero and the pivot sits on the
/// marker centroid. Fails with [`ScanError::HardwareReset`] otherwise.
pub fn reset_rigid_body<B: RigidBody + ?Sized>(body: &mut B, params: &AlignParams) -> ScanResult<()> {
    for _ in 0..params.reset_cycles.max(1) {
        body.reset_orientation()?;
        body.reset_pivot_offset()?;
        body.update()?;
    }

    let rotation = body.rotation()?;
    if !rotation.iter().all(|r| r.abs() <= params.atol.max(1e-6)) {
        return Err(ScanError::HardwareReset {
            body: body.name().to_string(),
            details: format!(
                "rotation reads ({:.3}, {:.3}, {:.3}) degrees after reset",
                rotation.x, rotation.y, rotation.z
            ),
        });
    }

    let markers = body.markers()?;
    let location = body.location()?;
    let Some(marker_centroid) = centroid_of(&markers) else {
        return Err(ScanError::HardwareReset {
            body: body.name().to_string(),
            details: "no markers are visible".to_string(),
        });
    };
    if !is_close(&location, &marker_centroid, params.rtol, params.atol) {
        return Err(ScanError::HardwareReset {
            body: body.name().to_string(),
            details: format!(
                "pivot at ({:.4}, {:.4}, {:.4}), marker centroid at ({:.4}, {:.4}, {:.4})",
                location.x,
                location.y,
                location.z,
                marker_centroid.x,
                marker_centroid.y,
                marker_centroid.z
            ),
        });
    }

    debug!(body = body.name(), "Rigid body reset");
    Ok(())
}
