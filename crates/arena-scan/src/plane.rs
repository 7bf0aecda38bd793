//! Planes fitted to point sets.

use nalgebra::{Matrix3, Point2, Point3, Vector3};

use crate::pointcloud::centroid_of;

/// Eigenvalue ratio below which a point set counts as collinear.
const COLLINEAR_RATIO: f64 = 1e-10;

/// An infinite plane through `centroid` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub centroid: Point3<f64>,
    pub normal: Vector3<f64>,
}

/// Result of a least-squares plane fit.
#[derive(Debug, Clone, Copy)]
pub struct PlaneFit {
    pub plane: Plane,
    /// Covariance eigenvalues in ascending order.
    pub eigenvalues: [f64; 3],
    /// Root mean square of the point-to-plane distances.
    pub rms_residual: f64,
}

impl Plane {
    /// Create a plane, normalizing `normal`.
    ///
    /// Returns None when `normal` has no length.
    pub fn new(centroid: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let len = normal.norm();
        if len > f64::EPSILON && len.is_finite() {
            Some(Self {
                centroid,
                normal: normal / len,
            })
        } else {
            None
        }
    }

    /// Plane through three points, None if they are collinear.
    pub fn from_three(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let scale = (b - a).norm_squared().max((c - a).norm_squared());
        if n.norm_squared() <= scale * scale * COLLINEAR_RATIO {
            return None;
        }
        Self::new(Point3::from((a.coords + b.coords + c.coords) / 3.0), n)
    }

    /// Least-squares fit.
    ///
    /// The normal is the eigenvector of the smallest covariance eigenvalue.
    /// Returns None for fewer than 3 points or when the points do not span
    /// two dimensions (collinear or coincident).
    pub fn fit(points: &[Point3<f64>]) -> Option<PlaneFit> {
        if points.len() < 3 {
            return None;
        }
        let centroid = centroid_of(points)?;

        let mut cov = Matrix3::zeros();
        for p in points {
            let d = p - centroid;
            cov += d * d.transpose();
        }
        cov /= points.len() as f64;

        let eig = cov.symmetric_eigen();
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
        let eigenvalues = order.map(|i| eig.eigenvalues[i].max(0.0));

        if eigenvalues[2] <= 0.0 || eigenvalues[1] <= eigenvalues[2] * COLLINEAR_RATIO {
            return None;
        }

        let plane = Self::new(centroid, eig.eigenvectors.column(order[0]).into_owned())?;

        Some(PlaneFit {
            plane,
            eigenvalues,
            rms_residual: eigenvalues[0].sqrt(),
        })
    }

    /// Signed distance; positive on the side the normal points to.
    #[inline]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.centroid).dot(&self.normal)
    }

    /// Unsigned distance.
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.signed_distance(p).abs()
    }

    /// Orthogonal projection of `p` onto the plane.
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal * self.signed_distance(p)
    }

    /// Orthonormal in-plane axes `(u, v)` with `u x v == normal`.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let up = if self.normal.z.abs() < 0.9 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let u = up.cross(&self.normal).normalize();
        let v = self.normal.cross(&u);
        (u, v)
    }

    /// In-plane coordinates of `p` relative to the centroid.
    pub fn to_2d(&self, p: &Point3<f64>, basis: &(Vector3<f64>, Vector3<f64>)) -> Point2<f64> {
        let d = p - self.centroid;
        Point2::new(d.dot(&basis.0), d.dot(&basis.1))
    }

    /// Lift in-plane coordinates back to 3D.
    pub fn to_3d(&self, q: &Point2<f64>, basis: &(Vector3<f64>, Vector3<f64>)) -> Point3<f64> {
        self.centroid + basis.0 * q.x + basis.1 * q.y
    }

    /// Flip the normal, if needed, so it points away from `reference`.
    pub fn oriented_away_from(self, reference: &Point3<f64>) -> Self {
        if self.signed_distance(reference) > 0.0 {
            Self {
                centroid: self.centroid,
                normal: -self.normal,
            }
        } else {
            self
        }
    }
}

/// Angle in radians between two directions, ignoring their lengths.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= f64::EPSILON {
        return std::f64::consts::PI;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}
