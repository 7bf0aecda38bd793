//! End-to-end tests for arena reconstruction.
//!
//! These exercise the full pipeline from point cloud -> segment -> index ->
//! triangulate -> center -> OBJ against a synthetic open-cube arena.

mod common;

use arena_scan::{
    AlignParams, ErrorCode, IndexParams, PointCloud, Reconstruction, ScanConfig, ScanError,
    SegmentParams, SimulatedRigidBody, index, load_obj, reconstruct, reset_rigid_body, run_scan,
    segment, triangulate,
};
use nalgebra::{Point3, Vector3};
use tempfile::tempdir;

fn cube_config(n_surfaces: usize) -> ScanConfig {
    ScanConfig {
        n_surfaces,
        ..Default::default()
    }
}

fn wall_normals() -> [Vector3<f64>; 4] {
    [-Vector3::x(), Vector3::x(), -Vector3::y(), Vector3::y()]
}

// =============================================================================
// Open cube acceptance scenario
// =============================================================================

#[test]
fn test_open_cube_explicit_count() {
    let cloud = common::arena_scan();
    assert_eq!(cloud.len(), 4000);

    let result = reconstruct(&cloud, &cube_config(4)).unwrap();
    assert_eq!(result.surfaces.len(), 4);

    for surface in &result.surfaces {
        let angle = common::closest_axis_angle(&surface.plane.normal, &wall_normals());
        assert!(angle < 5.0, "Surface normal {:?} is {:.2} degrees off", surface.plane.normal, angle);
    }

    assert_box_of_quads(&result, 7);
}

/// Four quads over eight shared corners, fanned into eight triangles.
fn assert_box_of_quads(result: &Reconstruction, seed: u64) {
    let indexed = &result.indexed;
    assert_eq!(indexed.face_count(), 4, "seed {}", seed);
    for face in &indexed.faces {
        assert_eq!(face.len(), 4, "seed {}: wall face has {} corners", seed, face.len());
    }
    assert_eq!(indexed.vertex_count(), 8, "seed {}: corners are not shared", seed);
    assert_eq!(result.mesh.face_count(), 8, "seed {}", seed);
}

#[test]
fn test_open_cube_quads_across_seeds() {
    for seed in [1, 2, 3, 4, 5, 7] {
        let cloud = common::open_cube(1000, 0.01, seed);
        let explicit = reconstruct(&cloud, &cube_config(4)).unwrap();
        assert_box_of_quads(&explicit, seed);

        let estimated = reconstruct(&cloud, &cube_config(0)).unwrap();
        assert_eq!(estimated.surfaces.len(), 4, "seed {}", seed);
        assert_box_of_quads(&estimated, seed);
    }
}

#[test]
fn test_open_cube_auto_count() {
    let cloud = common::arena_scan();
    let result = reconstruct(&cloud, &cube_config(0)).unwrap();
    assert_eq!(result.surfaces.len(), 4);
}

#[test]
fn test_open_cube_corners_are_shared() {
    let cloud = common::arena_scan();
    let result = reconstruct(&cloud, &cube_config(4)).unwrap();

    // Each box corner is used by the two walls that meet there.
    let mut uses = vec![0usize; result.indexed.vertex_count()];
    for face in &result.indexed.faces {
        for &v in face {
            uses[v as usize] += 1;
        }
    }
    let shared = uses.iter().filter(|&&n| n >= 2).count();
    assert!(shared >= 8, "Only {} vertices are shared between walls", shared);

    // Every corner lies near the box.
    for v in &result.indexed.vertices {
        for c in v.iter() {
            assert!((-0.1..=1.1).contains(c), "Vertex {:?} is outside the arena", v);
        }
    }
}

#[test]
fn test_open_cube_flat_shading() {
    let cloud = common::arena_scan();
    let result = reconstruct(&cloud, &cube_config(4)).unwrap();
    let mesh = &result.mesh;

    assert_eq!(mesh.normals.len(), mesh.face_count());
    for (tri, normal) in mesh.triangles().zip(&mesh.normals) {
        assert!((normal.norm() - 1.0).abs() < 1e-9);
        if let Some(geometric) = tri.normal() {
            assert!(
                geometric.dot(normal) > 0.9,
                "Triangle winding disagrees with its face normal"
            );
        }
    }

    // Normals point out of the arena.
    let center = Point3::new(0.5, 0.5, 0.5);
    for (tri, normal) in mesh.triangles().zip(&mesh.normals) {
        let mid = Point3::from((tri.v0.coords + tri.v1.coords + tri.v2.coords) / 3.0);
        assert!((mid - center).dot(normal) > 0.0);
    }
}

#[test]
fn test_stages_compose() {
    let cloud = common::arena_scan();
    let surfaces = segment(&cloud, 4, &SegmentParams::default()).unwrap();
    let indexed = index(&surfaces, &IndexParams::default()).unwrap();
    let triangles = triangulate(&indexed.faces).unwrap();

    let full = reconstruct(&cloud, &cube_config(4)).unwrap();
    assert_eq!(triangles, full.mesh.faces);
    assert_eq!(indexed, full.indexed);
}

#[test]
fn test_reconstruction_is_deterministic() {
    let cloud = common::arena_scan();
    let a = reconstruct(&cloud, &cube_config(4)).unwrap();
    let b = reconstruct(&cloud, &cube_config(4)).unwrap();
    assert_eq!(a.mesh.vertices, b.mesh.vertices);
    assert_eq!(a.mesh.faces, b.mesh.faces);
}

#[test]
fn test_outlier_removal_keeps_walls() {
    let mut cloud = common::arena_scan();
    for i in 0..20 {
        let t = i as f64;
        cloud.push_coords(5.0 + t, -4.0, 3.0 * t);
    }

    let config = ScanConfig {
        n_surfaces: 4,
        outliers: Some(Default::default()),
        ..Default::default()
    };
    let result = reconstruct(&cloud, &config).unwrap();
    assert!(result.points.len() < cloud.len());
    assert_eq!(result.surfaces.len(), 4);
}

// =============================================================================
// Point count boundary
// =============================================================================

#[test]
fn test_minimum_point_count() {
    let mut cloud = common::flat_cloud(10);
    assert_eq!(cloud.len(), 100);

    let result = reconstruct(&cloud, &cube_config(1)).unwrap();
    assert_eq!(result.surfaces.len(), 1);
    assert_eq!(result.mesh.face_count(), 2);

    cloud.points.pop();
    let err = reconstruct(&cloud, &cube_config(1)).unwrap_err();
    match err {
        ScanError::InsufficientData { found, required } => {
            assert_eq!(found, 99);
            assert_eq!(required, 100);
        }
        other => panic!("Expected InsufficientData, got {:?}", other),
    }
}

#[test]
fn test_too_many_surfaces_requested() {
    let err = reconstruct(&common::flat_cloud(12), &cube_config(3)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsatisfiableConfiguration);
}

#[test]
fn test_fifth_wall_is_unsatisfiable() {
    for seed in [1, 2, 3, 7] {
        let cloud = common::open_cube(1000, 0.01, seed);
        match reconstruct(&cloud, &cube_config(5)) {
            Err(ScanError::UnsatisfiableConfiguration {
                requested,
                achievable,
            }) => {
                assert_eq!(requested, 5, "seed {}", seed);
                assert_eq!(achievable, 4, "seed {}", seed);
            }
            other => panic!(
                "seed {}: expected UnsatisfiableConfiguration, got {:?}",
                seed,
                other.map(|r| r.surfaces.len())
            ),
        }
    }
}

#[test]
fn test_surfaces_largest_first() {
    let cloud = common::arena_scan();
    for n in [0, 4] {
        let result = reconstruct(&cloud, &cube_config(n)).unwrap();
        let sizes: Vec<usize> = result.surfaces.iter().map(|s| s.len()).collect();
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]), "sizes {:?}", sizes);
    }
}

// =============================================================================
// Export and alignment
// =============================================================================

#[test]
fn test_run_scan_writes_centered_obj() {
    let dir = tempdir().unwrap();
    let cloud = common::arena_scan();

    let outcome = run_scan(&cloud, &cube_config(4), None, dir.path().join("arena")).unwrap();
    assert_eq!(outcome.output, dir.path().join("arena.obj"));
    assert!(outcome.alignment.is_none());

    let centroid = outcome.mesh.face_weighted_centroid().unwrap();
    assert!(centroid.coords.norm() < 1e-9);
    assert_eq!(outcome.points.len(), cloud.len());

    let loaded = load_obj(&outcome.output).unwrap();
    assert_eq!(loaded.name, "arena");
    assert_eq!(loaded.face_count(), outcome.mesh.face_count());
    assert_eq!(loaded.vertex_count(), outcome.mesh.vertex_count());
    assert!(loaded.face_weighted_centroid().unwrap().coords.norm() < 1e-5);
    assert!((loaded.surface_area() - outcome.mesh.surface_area()).abs() < 1e-4);
}

#[test]
fn test_run_scan_aligns_rigid_body() {
    let dir = tempdir().unwrap();
    let cloud = common::arena_scan();
    let markers = vec![
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let mut body = SimulatedRigidBody::new("arena", markers)
        .with_latency(2)
        .with_rotation(Vector3::new(0.0, 0.0, 30.0));
    reset_rigid_body(&mut body, &AlignParams::default()).unwrap();

    let outcome = run_scan(
        &cloud,
        &cube_config(4),
        Some(&mut body),
        dir.path().join("arena.obj"),
    )
    .unwrap();

    let alignment = outcome.alignment.unwrap();
    assert_eq!(alignment.attempts, 2);
    assert!((alignment.pivot - Point3::new(0.5, 0.5, 0.5)).norm() < 0.05);
    assert!((alignment.final_location - alignment.pivot).norm() < 1e-9);
    assert!(outcome.output.exists());
}

#[test]
fn test_run_scan_fails_when_pivot_is_stuck() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("arena.obj");
    let cloud = common::arena_scan();
    let mut body = SimulatedRigidBody::new("arena", vec![Point3::origin()]).with_stuck_pivot();

    let config = ScanConfig {
        n_surfaces: 4,
        align: AlignParams {
            max_attempts: 10,
            ..Default::default()
        },
        ..Default::default()
    };
    let err = run_scan(&cloud, &config, Some(&mut body), &output).unwrap_err();
    assert_eq!(err.code(), ErrorCode::HardwareConvergenceFailure);
    assert!(!output.exists(), "No mesh may be written after a failed alignment");
}

#[test]
fn test_run_scan_without_centering() {
    let dir = tempdir().unwrap();
    let cloud = common::arena_scan();
    let config = ScanConfig {
        n_surfaces: 4,
        mean_center: false,
        ..Default::default()
    };
    let outcome = run_scan(&cloud, &config, None, dir.path().join("raw.OBJ")).unwrap();
    assert_eq!(outcome.mesh.vertices, outcome.reconstruction.mesh.vertices);
    assert_eq!(outcome.points, outcome.reconstruction.points);
}

#[test]
fn test_run_scan_rejects_other_extensions() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("arena.stl");
    let err = run_scan(&common::arena_scan(), &cube_config(4), None, &output).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOutputPath);
    assert!(!output.exists());
}

#[test]
fn test_point_cloud_file_roundtrip_through_pipeline() {
    let dir = tempdir().unwrap();
    let points_path = dir.path().join("arena_points.xyz");
    let cloud = common::arena_scan();
    cloud.save(&points_path).unwrap();

    let loaded = PointCloud::load(&points_path).unwrap();
    assert_eq!(loaded.len(), cloud.len());

    let result = reconstruct(&loaded, &cube_config(4)).unwrap();
    assert_eq!(result.surfaces.len(), 4);
}
