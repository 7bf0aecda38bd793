//! Projection-arena reconstruction from tracked point clouds.
//!
//! A motion-capture rig scans the interior of a projection arena by
//! detecting a projected calibration pattern as thousands of noisy 3D
//! points. This crate turns that cloud into a compact flat-shaded polygon
//! mesh, one convex face per planar wall, and registers it with the
//! tracker's rigid body so tracked poses and mesh coordinates share an
//! origin.
//!
//! # Pipeline
//!
//! ```text
//! PointCloud --segment--> Vec<Surface> --index--> IndexedFaces
//!            --triangulate--> Mesh --center_and_align--> OBJ
//! ```
//!
//! - [`segment`]: planar surfaces by seeded sequential RANSAC and k-planes
//!   refinement; the surface count may be given or estimated
//! - [`index()`]: convex hull per surface, Douglas-Peucker simplification,
//!   and corner deduplication into a shared vertex buffer
//! - [`triangulate`]: triangle fans with one flat normal per polygon
//! - [`center_and_align`]: mean-centering plus a bounded retry loop that
//!   moves the tracker's pivot to the mesh centroid
//!
//! # Conventions
//!
//! - Coordinates are in the tracker's world frame and units.
//! - Face winding is counter-clockwise when viewed from the side the face
//!   normal points to. Normals point away from the centroid of the scan.
//! - Vertices are shared between faces; normals are stored per face.
//!
//! # Quick Start
//!
//! ```no_run
//! use arena_scan::{PointCloud, ScanConfig, reconstruct, save_obj};
//!
//! let cloud = PointCloud::load("arena_points.xyz").unwrap();
//! let config = ScanConfig {
//!     n_surfaces: 4,
//!     ..Default::default()
//! };
//! let result = reconstruct(&cloud, &config).unwrap();
//! save_obj(&result.mesh, "arena.obj".as_ref()).unwrap();
//! ```
//!
//! # Aligning with the tracker
//!
//! ```no_run
//! use arena_scan::{PointCloud, ScanConfig, SimulatedRigidBody, run_scan};
//!
//! let cloud = PointCloud::load("arena_points.xyz").unwrap();
//! let mut body = SimulatedRigidBody::new("arena", cloud.points[..3].to_vec());
//! let outcome = run_scan(&cloud, &ScanConfig::default(), Some(&mut body), "arena").unwrap();
//! println!(
//!     "wrote {} after {} pivot attempts",
//!     outcome.output.display(),
//!     outcome.alignment.map(|a| a.attempts).unwrap_or(0)
//! );
//! ```
//!
//! # Errors
//!
//! Every failure is a [`ScanError`] with a stable [`ErrorCode`], a
//! [`RecoverySuggestion`], and where possible an [`ErrorLocation`]. All
//! errors are fatal: no partial mesh is ever returned.

mod error;
mod pipeline;
pub mod tracing_ext;
mod types;

pub mod align;
pub mod hardware;
pub mod index;
pub mod io;
pub mod plane;
pub mod pointcloud;
pub mod segment;
pub mod triangulate;

pub use error::{ErrorCode, ErrorLocation, RecoverySuggestion, ScanError, ScanResult};
pub use types::{Face, Mesh, Triangle};

pub use align::{AlignParams, Alignment, center_and_align, mean_center, reset_rigid_body};
pub use hardware::{
    CameraSettings, RigidBody, SavedCameraSettings, SimulatedRigidBody, Tracker,
    configure_for_scanning, scanned_project_path,
};
pub use index::{IndexParams, IndexedFaces, index};
pub use io::{load_obj, resolve_output_path, save_obj};
pub use pipeline::{Reconstruction, ScanConfig, ScanOutcome, reconstruct, run_scan};
pub use plane::{Plane, PlaneFit};
pub use pointcloud::{MIN_POINT_COUNT, OutlierParams, PointCloud};
pub use segment::{SegmentParams, Surface, segment};
pub use triangulate::{triangulate, triangulate_with_normals};
