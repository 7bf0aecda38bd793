//! Structured logging and timing for reconstruction steps.
//!
//! Every step logs through `tracing` under an `arena_scan::*` target so
//! individual stages can be filtered:
//!
//! - `arena_scan::timing`: start and elapsed time of each step
//! - `arena_scan::segment`: surface counts, sizes and residuals
//! - `arena_scan::mesh_state`: vertex/face counts and extents
//! - `arena_scan::align`: pivot alignment attempts
//!
//! ```rust,ignore
//! // RUST_LOG=arena_scan::segment=debug,arena_scan::timing=info
//! tracing_subscriber::fmt()
//!     .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!     .init();
//! ```

use std::time::Instant;

use nalgebra::Point3;
use tracing::{Span, debug, info, trace};

use crate::Mesh;
use crate::segment::Surface;

/// A timer that logs the duration of a step when dropped.
///
/// ```rust,ignore
/// fn index_faces() {
///     let _timer = OperationTimer::new("index");
///     // ...
/// } // logs elapsed_ms here
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Start timing `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("scan_operation", operation = name);
        debug!(target: "arena_scan::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer that also records the input size.
    pub fn with_points(name: &'static str, point_count: usize) -> Self {
        let span = tracing::info_span!("scan_operation", operation = name, points = point_count);
        debug!(
            target: "arena_scan::timing",
            operation = name,
            points = point_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Span entered for the timed operation.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "arena_scan::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log the outcome of segmentation, one line per surface at trace level.
pub fn log_segmentation(surfaces: &[Surface], requested: usize) {
    let members: usize = surfaces.iter().map(|s| s.len()).sum();
    let requested = match requested {
        0 => "auto".to_string(),
        n => n.to_string(),
    };
    info!(
        target: "arena_scan::segment",
        surfaces = surfaces.len(),
        requested = requested.as_str(),
        assigned_points = members,
        "Segmentation complete"
    );

    for (i, s) in surfaces.iter().enumerate() {
        let n = s.plane.normal;
        trace!(
            target: "arena_scan::segment",
            surface = i,
            points = s.len(),
            rms = format!("{:.5}", s.rms_residual),
            normal = format!("({:.3}, {:.3}, {:.3})", n.x, n.y, n.z),
            "Surface"
        );
    }
}

/// Log vertex, triangle and extent figures of a mesh.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let (min_bounds, max_bounds) = mesh.bounds().unwrap_or_default();
    let dims = max_bounds - min_bounds;

    debug!(
        target: "arena_scan::mesh_state",
        context = context,
        name = mesh.name.as_str(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        dimensions = format!("{:.3} x {:.3} x {:.3}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log one pivot alignment attempt.
pub fn log_alignment_attempt(attempt: usize, target: &Point3<f64>, reported: &Point3<f64>) {
    trace!(
        target: "arena_scan::align",
        attempt,
        expected = format!("({:.4}, {:.4}, {:.4})", target.x, target.y, target.z),
        reported = format!("({:.4}, {:.4}, {:.4})", reported.x, reported.y, reported.z),
        "Pivot alignment attempt"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::with_points("test_operation", 10);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_log_helpers_accept_empty_input() {
        log_mesh_stats(&Mesh::new("empty"), "test");
        log_segmentation(&[], 0);
        log_alignment_attempt(1, &Point3::origin(), &Point3::origin());
    }
}
