//! Fan triangulation of convex polygons.

use crate::error::{ScanError, ScanResult};
use crate::index::IndexedFaces;
use crate::types::{Face, Mesh};

/// Split each convex polygon into a triangle fan around its first vertex.
///
/// A face `[v0, v1, .., vk]` yields `(v0, vi, vi+1)` for every `i` in
/// `1..k`, so a `k`-gon gives `k - 2` triangles with the polygon's winding.
/// Faces with fewer than 3 vertices fail with
/// [`ScanError::GeometryDegenerate`].
pub fn triangulate(faces: &[Face]) -> ScanResult<Vec<[u32; 3]>> {
    let total: usize = faces.iter().map(|f| f.len().saturating_sub(2)).sum();
    let mut triangles = Vec::with_capacity(total);

    for (face_index, face) in faces.iter().enumerate() {
        if face.len() < 3 {
            return Err(ScanError::geometry_degenerate(
                face_index,
                format!("cannot triangulate a face with {} vertices", face.len()),
            ));
        }
        triangles.extend(face.windows(2).skip(1).map(|w| [face[0], w[0], w[1]]));
    }

    Ok(triangles)
}

/// Triangulate indexed polygons into a flat-shaded [`Mesh`].
///
/// Every triangle carries the normal of the polygon it came from.
pub fn triangulate_with_normals(indexed: &IndexedFaces, name: impl Into<String>) -> ScanResult<Mesh> {
    let triangles = triangulate(&indexed.faces)?;

    let mut mesh = Mesh::with_capacity(name, indexed.vertex_count(), triangles.len());
    mesh.vertices.extend_from_slice(&indexed.vertices);
    for (face, normal) in indexed.faces.iter().zip(&indexed.normals) {
        mesh.normals
            .extend(std::iter::repeat_n(*normal, face.len() - 2));
    }
    mesh.faces = triangles;

    mesh.validate()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_fan_of_pentagon() {
        let tris = triangulate(&[vec![4, 7, 1, 9, 3]]).unwrap();
        assert_eq!(tris, vec![[4, 7, 1], [4, 1, 9], [4, 9, 3]]);
    }

    #[test]
    fn test_triangle_passes_through() {
        let tris = triangulate(&[vec![0, 1, 2], vec![2, 3, 0, 5]]).unwrap();
        assert_eq!(tris, vec![[0, 1, 2], [2, 3, 0], [2, 0, 5]]);
    }

    #[test]
    fn test_short_face_fails() {
        let err = triangulate(&[vec![0, 1, 2], vec![3, 4]]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeometryDegenerate);
        assert!(matches!(err, ScanError::GeometryDegenerate { face: 1, .. }));
    }

    #[test]
    fn test_mesh_normals_repeat_per_polygon() {
        let indexed = IndexedFaces {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            faces: vec![vec![0, 1, 2, 3], vec![0, 4, 1]],
            normals: vec![Vector3::z(), -Vector3::y()],
        };

        let mesh = triangulate_with_normals(&indexed, "arena").unwrap();
        assert_eq!(mesh.name, "arena");
        assert_eq!(mesh.face_count(), 3);
        assert_eq!(mesh.normals, vec![Vector3::z(), Vector3::z(), -Vector3::y()]);
        assert_eq!(mesh.vertex_count(), 5);
        assert!((mesh.surface_area() - 1.5).abs() < 1e-12);
    }
}
