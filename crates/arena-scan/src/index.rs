//! Polygon boundaries from segmented surfaces.
//!
//! Each surface becomes one convex polygon:
//!
//! 1. members are projected into the plane's `(u, v)` basis
//! 2. the 2D convex hull is taken (monotone chain, counter-clockwise)
//! 3. the hull loop is simplified with Douglas-Peucker
//! 4. short edges that cut off a corner are squared off, so a sparse corner
//!    of the scan does not leave an extra bevel vertex
//! 5. corners are lifted back to 3D and merged into one shared vertex buffer
//!
//! Because `u x v` equals the surface normal, a loop that is counter-clockwise
//! in the plane is counter-clockwise when viewed from the normal side.

use hashbrown::HashMap;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScanError, ScanResult};
use crate::pointcloud::bounds_of;
use crate::segment::Surface;
use crate::tracing_ext::OperationTimer;
use crate::types::Face;

/// Default merge distance as a fraction of the surfaces' bounding-box diagonal.
pub const DEFAULT_MERGE_FRACTION: f64 = 0.05;

/// Hull areas below this fraction of the squared diameter count as zero.
const MIN_AREA_RATIO: f64 = 1e-9;

/// A bevel edge is squared off when the restored corner lies within this
/// multiple of the simplification distance.
const SQUARE_CORNER_FACTOR: f64 = 2.0;

/// Parameters for [`index`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Corners closer than this share one vertex. `None` uses 5% of the
    /// bounding-box diagonal of all surface points.
    pub merge_epsilon: Option<f64>,

    /// Douglas-Peucker tolerance as a fraction of each hull's diameter.
    /// It also bounds corner squaring. 0 keeps every hull vertex.
    pub simplify_tolerance: f64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            merge_epsilon: None,
            simplify_tolerance: 0.05,
        }
    }
}

impl IndexParams {
    /// Keep the raw convex hulls.
    pub fn raw_hulls() -> Self {
        Self {
            simplify_tolerance: 0.0,
            ..Default::default()
        }
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> ScanResult<()> {
        if let Some(eps) = self.merge_epsilon
            && !(eps > 0.0 && eps.is_finite())
        {
            return Err(ScanError::invalid_config(format!(
                "merge_epsilon must be positive, got {}",
                eps
            )));
        }
        if !(0.0..0.5).contains(&self.simplify_tolerance) {
            return Err(ScanError::invalid_config(format!(
                "simplify_tolerance must be in [0, 0.5), got {}",
                self.simplify_tolerance
            )));
        }
        Ok(())
    }
}

/// Convex polygons over a shared, deduplicated vertex buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedFaces {
    pub vertices: Vec<Point3<f64>>,
    /// Counter-clockwise index loops, one per surface.
    pub faces: Vec<Face>,
    /// One unit normal per face.
    pub normals: Vec<Vector3<f64>>,
}

impl IndexedFaces {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Area of polygon `face`, None if the index is out of range.
    pub fn face_area(&self, face: usize) -> Option<f64> {
        let loop_indices = self.faces.get(face)?;
        let corners: Vec<Point3<f64>> = loop_indices
            .iter()
            .map(|&i| self.vertices[i as usize])
            .collect();
        Some(polygon_area_3d(&corners))
    }
}

/// Build one convex polygon per surface over a shared vertex buffer.
///
/// Fails with [`ScanError::GeometryDegenerate`] when a surface's boundary
/// collapses to a line or point, or when merging leaves a face with fewer
/// than 3 distinct vertices. No face is silently dropped.
pub fn index(surfaces: &[Surface], params: &IndexParams) -> ScanResult<IndexedFaces> {
    let _timer = OperationTimer::new("index");
    params.validate()?;

    let epsilon = match params.merge_epsilon {
        Some(eps) => eps,
        None => {
            let all: Vec<Point3<f64>> = surfaces.iter().flat_map(|s| s.points.iter().copied()).collect();
            bounds_of(&all)
                .map(|(min, max)| (max - min).norm() * DEFAULT_MERGE_FRACTION)
                .unwrap_or(0.0)
        }
    };

    let mut merger = VertexMerger::new(epsilon);
    let mut result = IndexedFaces::default();

    for (face_index, surface) in surfaces.iter().enumerate() {
        let corners = surface_boundary(face_index, surface, params.simplify_tolerance)?;

        let mut face: Face = Vec::with_capacity(corners.len());
        for corner in &corners {
            let idx = merger.insert(*corner);
            if !face.contains(&idx) {
                face.push(idx);
            }
        }

        if face.len() < 3 {
            return Err(ScanError::geometry_degenerate(
                face_index,
                format!(
                    "{} corners merged into {} distinct vertices (merge epsilon {:.4})",
                    corners.len(),
                    face.len(),
                    epsilon
                ),
            ));
        }

        debug!(
            face = face_index,
            hull_corners = corners.len(),
            vertices = face.len(),
            "Indexed face"
        );
        result.faces.push(face);
        result.normals.push(surface.plane.normal);
    }

    result.vertices = merger.into_vertices();

    for face_index in 0..result.face_count() {
        let area = result.face_area(face_index).unwrap_or(0.0);
        let span = face_span(&result, face_index);
        if area <= span * span * MIN_AREA_RATIO {
            return Err(ScanError::geometry_degenerate(
                face_index,
                "merged polygon has zero area",
            ));
        }
    }

    debug!(
        faces = result.face_count(),
        vertices = result.vertex_count(),
        epsilon,
        "Indexing complete"
    );
    Ok(result)
}

/// Simplified convex boundary of one surface, lifted to 3D.
fn surface_boundary(
    face_index: usize,
    surface: &Surface,
    simplify_tolerance: f64,
) -> ScanResult<Vec<Point3<f64>>> {
    let plane = &surface.plane;
    let basis = plane.basis();
    let projected: Vec<Point2<f64>> = surface
        .points
        .iter()
        .map(|p| plane.to_2d(p, &basis))
        .collect();

    let hull: Vec<Point2<f64>> = convex_hull(&projected)
        .into_iter()
        .map(|i| projected[i])
        .collect();

    let diameter = diameter_pair(&hull).map(|(_, _, d)| d).unwrap_or(0.0);
    if hull.len() < 3 || polygon_area_2d(&hull) <= diameter * diameter * MIN_AREA_RATIO {
        return Err(ScanError::geometry_degenerate(
            face_index,
            format!(
                "boundary of {} points collapses to a line or point",
                surface.points.len()
            ),
        ));
    }

    let tolerance = simplify_tolerance * diameter;
    let kept = simplify_loop(&hull, tolerance);
    if kept.len() < 3 {
        return Err(ScanError::geometry_degenerate(
            face_index,
            format!(
                "simplification left {} corners; surface is thinner than the tolerance",
                kept.len()
            ),
        ));
    }

    let simplified: Vec<Point2<f64>> = kept.into_iter().map(|i| hull[i]).collect();
    let corners = square_corners(simplified, SQUARE_CORNER_FACTOR * tolerance);

    Ok(corners.iter().map(|p| plane.to_3d(p, &basis)).collect())
}

/// Collapse bevel edges of a convex counter-clockwise loop into the corner
/// their neighbouring edges meet at.
///
/// The edge whose restored corner lies closest to it goes first, and
/// collapsing stops once that distance exceeds `tolerance` or three corners
/// remain. Edges between parallel neighbours (any rectangle) are never
/// touched. The result stays convex and counter-clockwise.
pub fn square_corners(mut corners: Vec<Point2<f64>>, tolerance: f64) -> Vec<Point2<f64>> {
    if tolerance <= 0.0 {
        return corners;
    }

    while corners.len() > 3 {
        let n = corners.len();
        let best = (0..n)
            .filter_map(|i| {
                let prev = corners[(i + n - 1) % n];
                let (a, b) = (corners[i], corners[(i + 1) % n]);
                let next = corners[(i + 2) % n];
                let corner = extended_corner(&prev, &a, &next, &b)?;
                Some((i, corner, segment_distance(&corner, &a, &b)))
            })
            .min_by(|x, y| x.2.total_cmp(&y.2));

        let Some((i, corner, offset)) = best else {
            break;
        };
        if offset > tolerance {
            break;
        }

        corners[i] = corner;
        corners.remove((i + 1) % n);
    }

    corners
}

/// Where the ray `from -> through` meets the ray `other_from -> other_through`,
/// both continued past their second point. None for parallel lines or when
/// the meeting point lies behind either edge.
fn extended_corner(
    from: &Point2<f64>,
    through: &Point2<f64>,
    other_from: &Point2<f64>,
    other_through: &Point2<f64>,
) -> Option<Point2<f64>> {
    let d1 = through - from;
    let d2 = other_through - other_from;
    let r = other_from - from;
    let cross = |a: &Vector2<f64>, b: &Vector2<f64>| a.x * b.y - a.y * b.x;

    let denom = cross(&d1, &d2);
    if denom.abs() <= f64::EPSILON.sqrt() * d1.norm() * d2.norm() {
        return None;
    }

    let s = cross(&r, &d2) / denom;
    let t = cross(&r, &d1) / denom;
    (s >= 1.0 && t >= 1.0).then(|| from + d1 * s)
}

/// Indices of the convex hull of `points` in counter-clockwise order.
///
/// Collinear boundary points are dropped. Fewer than three distinct points
/// yield the distinct points themselves.
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .x
            .total_cmp(&points[b].x)
            .then(points[a].y.total_cmp(&points[b].y))
    });
    order.dedup_by(|a, b| points[*a] == points[*b]);

    if order.len() < 3 {
        return order;
    }

    let cross = |o: usize, a: usize, b: usize| {
        let (o, a, b) = (points[o], points[a], points[b]);
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);

    // Lower chain.
    for &p in &order {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper chain.
    let lower_len = hull.len() + 1;
    for &p in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }

    // The last point repeats the first.
    hull.pop();
    hull
}

/// Douglas-Peucker on a closed loop, seeded at the loop's diameter endpoints.
///
/// Returns the indices of kept vertices in loop order. A tolerance of 0
/// keeps every vertex.
pub fn simplify_loop(loop_points: &[Point2<f64>], tolerance: f64) -> Vec<usize> {
    let n = loop_points.len();
    if n <= 3 || tolerance <= 0.0 {
        return (0..n).collect();
    }
    let Some((a, b, _)) = diameter_pair(loop_points) else {
        return (0..n).collect();
    };

    let mut keep = vec![false; n];
    keep[a] = true;
    keep[b] = true;
    simplify_chain(loop_points, a, b, tolerance, &mut keep);
    simplify_chain(loop_points, b, a, tolerance, &mut keep);

    (0..n).filter(|&i| keep[i]).collect()
}

/// Mark vertices to keep on the cyclic chain `start..end`.
fn simplify_chain(points: &[Point2<f64>], start: usize, end: usize, tolerance: f64, keep: &mut [bool]) {
    let n = points.len();
    let mut stack = vec![(start, end)];

    while let Some((s, e)) = stack.pop() {
        let mut farthest = None;
        let mut max_dist = tolerance;

        let mut k = (s + 1) % n;
        while k != e {
            let d = segment_distance(&points[k], &points[s], &points[e]);
            if d > max_dist {
                max_dist = d;
                farthest = Some(k);
            }
            k = (k + 1) % n;
        }

        if let Some(k) = farthest {
            keep[k] = true;
            stack.push((s, k));
            stack.push((k, e));
        }
    }
}

fn segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// The two farthest-apart points and their distance.
fn diameter_pair(points: &[Point2<f64>]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = (points[j] - points[i]).norm();
            if best.is_none_or(|(_, _, bd)| d > bd) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

/// Signed area of a 2D loop; positive when counter-clockwise.
pub fn polygon_area_2d(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice * 0.5
}

/// Area of a planar 3D polygon (Newell's method).
pub fn polygon_area_3d(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let sum = (0..n).fold(Vector3::zeros(), |acc, i| {
        acc + points[i].coords.cross(&points[(i + 1) % n].coords)
    });
    sum.norm() * 0.5
}

fn face_span(faces: &IndexedFaces, face: usize) -> f64 {
    let corners: Vec<Point3<f64>> = faces.faces[face]
        .iter()
        .map(|&i| faces.vertices[i as usize])
        .collect();
    bounds_of(&corners)
        .map(|(min, max)| (max - min).norm())
        .unwrap_or(0.0)
}

/// First-seen vertex deduplication through a spatial hash.
struct VertexMerger {
    epsilon: f64,
    cell_size: f64,
    vertices: Vec<Point3<f64>>,
    cells: HashMap<(i64, i64, i64), Vec<u32>>,
}

impl VertexMerger {
    fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            cell_size: epsilon.max(f64::EPSILON),
            vertices: Vec::new(),
            cells: HashMap::new(),
        }
    }

    fn cell(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    /// Index of the nearest existing vertex within epsilon, or of `p` newly
    /// appended.
    fn insert(&mut self, p: Point3<f64>) -> u32 {
        let cell = self.cell(&p);
        let mut nearest: Option<(u32, f64)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = self.cells.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &idx in candidates {
                        let d = (self.vertices[idx as usize] - p).norm();
                        if d <= self.epsilon
                            && nearest.is_none_or(|(bi, bd)| d < bd || (d == bd && idx < bi))
                        {
                            nearest = Some((idx, d));
                        }
                    }
                }
            }
        }

        if let Some((idx, _)) = nearest {
            return idx;
        }

        let idx = self.vertices.len() as u32;
        self.vertices.push(p);
        self.cells.entry(cell).or_default().push(idx);
        idx
    }

    fn into_vertices(self) -> Vec<Point3<f64>> {
        self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::plane::Plane;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// A grid of points filling the axis-aligned square wall `x = x0`.
    fn wall_x(x0: f64, normal_sign: f64) -> Surface {
        let mut points = Vec::new();
        for i in 0..=10 {
            for j in 0..=10 {
                points.push(Point3::new(x0, i as f64 / 10.0, j as f64 / 10.0));
            }
        }
        Surface {
            plane: Plane::new(Point3::new(x0, 0.5, 0.5), Vector3::x() * normal_sign).unwrap(),
            points,
            rms_residual: 0.0,
        }
    }

    fn wall_y(y0: f64, normal_sign: f64) -> Surface {
        let mut points = Vec::new();
        for i in 0..=10 {
            for j in 0..=10 {
                points.push(Point3::new(i as f64 / 10.0, y0, j as f64 / 10.0));
            }
        }
        Surface {
            plane: Plane::new(Point3::new(0.5, y0, 0.5), Vector3::y() * normal_sign).unwrap(),
            points,
            rms_residual: 0.0,
        }
    }

    #[test]
    fn test_convex_hull_square_with_interior() {
        let points = vec![
            Point2::new(0.5, 0.5),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);

        let corners: Vec<Point2<f64>> = hull.iter().map(|&i| points[i]).collect();
        assert!(polygon_area_2d(&corners) > 0.0, "hull must be counter-clockwise");
        assert!(approx_eq(polygon_area_2d(&corners), 1.0));
    }

    #[test]
    fn test_convex_hull_degenerate_inputs() {
        assert!(convex_hull(&[]).is_empty());
        assert_eq!(convex_hull(&[Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)]).len(), 1);

        let line: Vec<Point2<f64>> = (0..5).map(|i| Point2::new(i as f64, 0.0)).collect();
        assert_eq!(convex_hull(&line).len(), 2);
    }

    #[test]
    fn test_simplify_loop_drops_near_collinear_vertices() {
        // Square with a slight bump in the middle of the bottom edge.
        let loop_points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.5, -0.01),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let kept = simplify_loop(&loop_points, 0.05);
        assert_eq!(kept, vec![0, 2, 3, 4]);

        assert_eq!(simplify_loop(&loop_points, 0.0).len(), 5);
        assert_eq!(simplify_loop(&loop_points, 0.001).len(), 5);
    }

    #[test]
    fn test_square_corners_restores_clipped_corner() {
        // Unit square with the (1, 1) corner cut off.
        let bevelled = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 0.9),
            Point2::new(0.9, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let squared = square_corners(bevelled.clone(), 0.1);
        assert_eq!(squared.len(), 4);
        assert!(squared.iter().any(|p| (p - Point2::new(1.0, 1.0)).norm() < 1e-9));
        assert!(approx_eq(polygon_area_2d(&squared), 1.0));

        // The restored corner sits 0.0707 off the bevel.
        assert_eq!(square_corners(bevelled.clone(), 0.05).len(), 5);
        assert_eq!(square_corners(bevelled, 0.0).len(), 5);
    }

    #[test]
    fn test_square_corners_keeps_rectangles_and_regular_polygons() {
        let rect = vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 0.2),
            Point2::new(0.0, 0.2),
        ];
        assert_eq!(square_corners(rect.clone(), 1.0), rect);

        let hexagon: Vec<Point2<f64>> = (0..6)
            .map(|k| {
                let a = k as f64 * std::f64::consts::PI / 3.0;
                Point2::new(a.cos(), a.sin())
            })
            .collect();
        assert_eq!(square_corners(hexagon, 0.2).len(), 6);
    }

    #[test]
    fn test_index_squares_sparse_corner() {
        // The (z = 1, y = 1) corner point is missing, so the hull is bevelled.
        let mut surface = wall_x(0.0, -1.0);
        surface
            .points
            .retain(|p| (p - Point3::new(0.0, 1.0, 1.0)).norm() > 1e-9);

        let indexed = index(&[surface.clone()], &IndexParams::default()).unwrap();
        assert_eq!(indexed.faces[0].len(), 4);
        assert!(approx_eq(indexed.face_area(0).unwrap(), 1.0));
        assert!(
            indexed
                .vertices
                .iter()
                .any(|v| (v - Point3::new(0.0, 1.0, 1.0)).norm() < 1e-9)
        );

        let raw = index(&[surface], &IndexParams::raw_hulls()).unwrap();
        assert_eq!(raw.faces[0].len(), 5);
    }

    #[test]
    fn test_index_two_walls_share_edge() {
        let surfaces = vec![wall_x(0.0, -1.0), wall_y(0.0, -1.0)];
        let indexed = index(&surfaces, &IndexParams::default()).unwrap();

        assert_eq!(indexed.face_count(), 2);
        assert_eq!(indexed.normals.len(), 2);
        assert!(indexed.faces.iter().all(|f| f.len() == 4));
        // The shared edge x = y = 0 contributes two vertices used by both faces.
        assert_eq!(indexed.vertex_count(), 6);

        for face in 0..2 {
            assert!(approx_eq(indexed.face_area(face).unwrap(), 1.0));
        }
    }

    #[test]
    fn test_index_winding_matches_normal() {
        let surfaces = vec![wall_x(1.0, 1.0), wall_x(0.0, -1.0)];
        let indexed = index(&surfaces, &IndexParams::default()).unwrap();

        for (face, normal) in indexed.faces.iter().zip(&indexed.normals) {
            let corners: Vec<Point3<f64>> =
                face.iter().map(|&i| indexed.vertices[i as usize]).collect();
            let winding = (0..corners.len()).fold(Vector3::zeros(), |acc, i| {
                acc + corners[i].coords.cross(&corners[(i + 1) % corners.len()].coords)
            });
            assert!(winding.dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_index_vertices_respect_epsilon() {
        let surfaces = vec![wall_x(0.0, -1.0), wall_y(0.0, -1.0), wall_x(1.0, 1.0), wall_y(1.0, 1.0)];
        let params = IndexParams {
            merge_epsilon: Some(0.1),
            ..Default::default()
        };
        let indexed = index(&surfaces, &params).unwrap();
        assert_eq!(indexed.vertex_count(), 8);

        for i in 0..indexed.vertex_count() {
            for j in (i + 1)..indexed.vertex_count() {
                assert!((indexed.vertices[i] - indexed.vertices[j]).norm() > 0.1);
            }
        }

        let again = index(&surfaces, &params).unwrap();
        assert_eq!(again, indexed);
    }

    #[test]
    fn test_index_rejects_collinear_surface() {
        let points: Vec<Point3<f64>> = (0..10).map(|i| Point3::new(0.0, i as f64, 0.0)).collect();
        let surfaces = vec![
            wall_y(0.0, -1.0),
            Surface {
                plane: Plane::new(Point3::origin(), Vector3::x()).unwrap(),
                points,
                rms_residual: 0.0,
            },
        ];
        let err = index(&surfaces, &IndexParams::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeometryDegenerate);
        assert!(matches!(err, ScanError::GeometryDegenerate { face: 1, .. }));
    }

    #[test]
    fn test_index_rejects_face_collapsed_by_merge() {
        let surfaces = vec![wall_x(0.0, -1.0)];
        let params = IndexParams {
            merge_epsilon: Some(5.0),
            ..Default::default()
        };
        let err = index(&surfaces, &params).unwrap_err();
        assert!(err.to_string().contains("distinct vertices"));
    }

    #[test]
    fn test_params_validation() {
        let params = IndexParams {
            simplify_tolerance: 0.7,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = IndexParams {
            merge_epsilon: Some(0.0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(IndexParams::raw_hulls().validate().is_ok());
    }

    #[test]
    fn test_polygon_areas() {
        let tri = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(0.0, 2.0)];
        assert!(approx_eq(polygon_area_2d(&tri), 2.0));

        let quad = [
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(2.0, 0.0, 5.0),
            Point3::new(2.0, 3.0, 5.0),
            Point3::new(0.0, 3.0, 5.0),
        ];
        assert!(approx_eq(polygon_area_3d(&quad), 6.0));
    }
}
