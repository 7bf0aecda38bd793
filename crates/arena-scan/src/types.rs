//! Core mesh data types.

use nalgebra::{Point3, Vector3};

use crate::error::{ScanError, ScanResult};
use crate::pointcloud::bounds_of;

/// A polygon boundary as an ordered loop of indices into a vertex buffer.
///
/// Winding is counter-clockwise when viewed from the side the face normal
/// points to.
pub type Face = Vec<u32>;

/// A flat-shaded triangle mesh.
///
/// Vertices are shared between faces; normals are attached per face, so
/// `normals[i]` is the normal of `faces[i]`. This keeps deduplicated corner
/// vertices while still describing a faceted (not smooth) surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Object name written to the exported file.
    pub name: String,

    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,

    /// One unit normal per face.
    pub normals: Vec<Vector3<f64>>,

    /// Triangles, each three indices into `vertices`.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// An empty mesh with the given object name.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, 0, 0)
    }

    /// An empty mesh with room for `vertex_count` vertices and
    /// `face_count` triangles.
    pub fn with_capacity(name: impl Into<String>, vertex_count: usize, face_count: usize) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::with_capacity(vertex_count),
            normals: Vec::with_capacity(face_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Triangle count.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to export.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() || self.vertices.is_empty()
    }

    /// Axis-aligned `(min, max)` corners of all vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        bounds_of(&self.vertices)
    }

    /// Corner positions of every triangle, in face order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|face| {
            let [a, b, c] = face.map(|i| self.vertices[i as usize]);
            Triangle::new(a, b, c)
        })
    }

    /// Sum of triangle areas.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }

    /// Mean of the vertex positions referenced by faces, weighted by how
    /// often each vertex is referenced.
    ///
    /// Vertices no face uses do not contribute. Returns None for a mesh
    /// without faces.
    pub fn face_weighted_centroid(&self) -> Option<Point3<f64>> {
        if self.faces.is_empty() {
            return None;
        }

        let sum = self
            .faces
            .iter()
            .flatten()
            .map(|&i| self.vertices[i as usize].coords)
            .fold(Vector3::zeros(), |acc, v| acc + v);

        Some(Point3::from(sum / (self.faces.len() * 3) as f64))
    }

    /// Return a copy of the mesh translated by the given vector.
    pub fn translated(&self, offset: Vector3<f64>) -> Self {
        Self {
            name: self.name.clone(),
            vertices: self.vertices.iter().map(|p| p + offset).collect(),
            normals: self.normals.clone(),
            faces: self.faces.clone(),
        }
    }

    /// Check index bounds, the normal count, and coordinate finiteness.
    pub fn validate(&self) -> ScanResult<()> {
        if self.normals.len() != self.faces.len() {
            return Err(ScanError::invalid_mesh(format!(
                "{} normals for {} faces",
                self.normals.len(),
                self.faces.len()
            )));
        }

        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ScanError::invalid_mesh(format!(
                    "face {} references vertex {}, but mesh only has {} vertices",
                    face_index, bad, vertex_count
                )));
            }
        }

        if let Some(index) = self
            .vertices
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(ScanError::invalid_mesh(format!(
                "vertex {} has a non-finite coordinate",
                index
            )));
        }

        Ok(())
    }
}

/// Three corner positions of one mesh triangle.
///
/// The normal follows the right-hand rule, so a counter-clockwise triangle
/// faces the viewer.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`; its length is twice
    /// the area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or None when the corners are collinear.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.normal_unnormalized().try_normalize(f64::EPSILON.sqrt())
    }

    #[inline]
    pub fn area(&self) -> f64 {
        0.5 * self.normal_unnormalized().norm()
    }
}
