//! Planar surface segmentation.
//!
//! Splits an unordered cloud into planar surfaces in two stages:
//!
//! 1. **Extraction**: sequential RANSAC. The plane with the most inliers
//!    among the unassigned points is taken, its inliers are removed, and the
//!    search repeats. No plane is accepted once the best candidate covers
//!    less than [`SegmentParams::min_surface_fraction`] of the cloud. With an
//!    explicit surface count that many planes must pass this floor; with a
//!    count of 0 extraction simply stops there.
//! 2. **Refinement**: k-planes. Every point is reassigned to its nearest
//!    plane and each plane is refit by least squares until the assignment no
//!    longer changes. Clusters that end up below the coverage floor are not
//!    surfaces.
//!
//! Surfaces are returned largest first.
//!
//! The random generator is seeded from [`SegmentParams::seed`], so the same
//! cloud, count and parameters always give the same surfaces.

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ScanError, ScanResult};
use crate::plane::Plane;
use crate::pointcloud::PointCloud;
use crate::tracing_ext::{OperationTimer, log_segmentation};

/// Default inlier threshold as a fraction of the cloud's bounding-box diagonal.
pub const DEFAULT_THRESHOLD_FRACTION: f64 = 0.02;

/// Points farther than this many inlier thresholds from every plane are
/// left out of refinement.
const OUTLIER_FACTOR: f64 = 3.0;

/// Parameters for [`segment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Maximum point-to-plane distance for an inlier. `None` uses 2% of the
    /// cloud's bounding-box diagonal.
    pub inlier_threshold: Option<f64>,

    /// Candidate planes sampled per extracted surface.
    pub ransac_iterations: usize,

    /// Upper bound on k-planes refinement passes.
    pub refine_iterations: usize,

    /// Smallest share of the whole cloud a surface must cover, whether the
    /// count is given or estimated.
    pub min_surface_fraction: f64,

    /// Most surfaces the estimator will return.
    pub max_surfaces: usize,

    /// Seed for candidate sampling.
    pub seed: u64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            inlier_threshold: None,
            ransac_iterations: 500,
            refine_iterations: 10,
            min_surface_fraction: 0.05,
            max_surfaces: 12,
            seed: 0,
        }
    }
}

impl SegmentParams {
    /// Faster settings for small or clean scans.
    pub fn fast() -> Self {
        Self {
            ransac_iterations: 150,
            refine_iterations: 3,
            ..Default::default()
        }
    }

    /// More candidates and passes for noisy scans of many small facets.
    pub fn thorough() -> Self {
        Self {
            ransac_iterations: 2000,
            refine_iterations: 30,
            min_surface_fraction: 0.02,
            max_surfaces: 24,
            ..Default::default()
        }
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> ScanResult<()> {
        if let Some(t) = self.inlier_threshold
            && !(t > 0.0 && t.is_finite())
        {
            return Err(ScanError::invalid_config(format!(
                "inlier_threshold must be positive, got {}",
                t
            )));
        }
        if self.ransac_iterations == 0 {
            return Err(ScanError::invalid_config("ransac_iterations must be at least 1"));
        }
        if !(self.min_surface_fraction > 0.0 && self.min_surface_fraction <= 1.0) {
            return Err(ScanError::invalid_config(format!(
                "min_surface_fraction must be in (0, 1], got {}",
                self.min_surface_fraction
            )));
        }
        if self.max_surfaces == 0 {
            return Err(ScanError::invalid_config("max_surfaces must be at least 1"));
        }
        Ok(())
    }
}

/// A planar region of the cloud.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Fitted plane, normal oriented away from the cloud's centroid.
    pub plane: Plane,

    /// Member points.
    pub points: Vec<Point3<f64>>,

    /// RMS distance of the members to the plane.
    pub rms_residual: f64,
}

impl Surface {
    /// Fit a surface to `points`, orienting its normal away from `reference`.
    ///
    /// `index` only labels the error raised when the points are collinear,
    /// coincident, or fewer than three.
    pub fn fit(index: usize, points: Vec<Point3<f64>>, reference: &Point3<f64>) -> ScanResult<Self> {
        let fit =
            Plane::fit(&points).ok_or_else(|| ScanError::degenerate_surface(index, points.len()))?;
        Ok(Self {
            plane: fit.plane.oriented_away_from(reference),
            points,
            rms_residual: fit.rms_residual,
        })
    }

    /// Number of member points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the surface has no members.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Partition `cloud` into planar surfaces.
///
/// `n_surfaces == 0` estimates the count. Otherwise exactly `n_surfaces`
/// surfaces are returned or the call fails with
/// [`ScanError::UnsatisfiableConfiguration`].
///
/// Surfaces are sorted by member count, largest first. Ties keep
/// extraction order.
pub fn segment(
    cloud: &PointCloud,
    n_surfaces: usize,
    params: &SegmentParams,
) -> ScanResult<Vec<Surface>> {
    let _timer = OperationTimer::new("segment");

    cloud.require_min_points()?;
    params.validate()?;

    let threshold = params
        .inlier_threshold
        .unwrap_or_else(|| cloud.diagonal() * DEFAULT_THRESHOLD_FRACTION);
    let reference = cloud.centroid().unwrap_or_else(Point3::origin);
    let explicit = n_surfaces > 0;
    let min_members = coverage_floor(cloud.len(), params);

    debug!(
        points = cloud.len(),
        n_surfaces, threshold, "Segmenting point cloud"
    );

    let planes = extract_planes(cloud, n_surfaces, threshold, min_members, params)?;
    let surfaces = refine(cloud, planes, threshold, params.refine_iterations, &reference);

    let mut result = Vec::with_capacity(surfaces.len());
    for (index, members) in surfaces.into_iter().enumerate() {
        if members.len() < min_members {
            if explicit {
                debug!(
                    surface = index,
                    members = members.len(),
                    min_members,
                    "Cluster below coverage"
                );
            } else {
                warn!(
                    surface = index,
                    members = members.len(),
                    min_members,
                    "Dropping small surface"
                );
            }
            continue;
        }
        match Surface::fit(index, members, &reference) {
            Ok(surface) => result.push(surface),
            Err(e) if explicit => debug!("{}", e),
            Err(e) => warn!("Dropping surface: {}", e),
        }
    }
    result.sort_by_key(|s| std::cmp::Reverse(s.len()));

    if explicit && result.len() < n_surfaces {
        return Err(ScanError::unsatisfiable(n_surfaces, result.len()));
    }
    if result.is_empty() {
        return Err(ScanError::insufficient_data(0, 3));
    }

    log_segmentation(&result, n_surfaces);
    Ok(result)
}

/// Sequential RANSAC extraction.
fn extract_planes(
    cloud: &PointCloud,
    n_surfaces: usize,
    threshold: f64,
    min_inliers: usize,
    params: &SegmentParams,
) -> ScanResult<Vec<Plane>> {
    let explicit = n_surfaces > 0;
    let target = if explicit { n_surfaces } else { params.max_surfaces };

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut remaining: Vec<usize> = (0..cloud.len()).collect();
    let mut planes = Vec::new();

    while planes.len() < target && remaining.len() >= 3 {
        let Some((candidate, count)) =
            best_candidate(&cloud.points, &remaining, threshold, params.ransac_iterations, &mut rng)
        else {
            break;
        };
        if count < min_inliers {
            debug!(count, min_inliers, "Best candidate below coverage, stopping");
            break;
        }

        let inliers: Vec<Point3<f64>> = remaining
            .iter()
            .map(|&i| cloud.points[i])
            .filter(|p| candidate.distance(p) <= threshold)
            .collect();
        let plane = Plane::fit(&inliers).map(|f| f.plane).unwrap_or(candidate);

        let before = remaining.len();
        remaining.retain(|&i| plane.distance(&cloud.points[i]) > threshold);
        if remaining.len() == before {
            // Refit drifted off every inlier; fall back to the sampled plane.
            remaining.retain(|&i| candidate.distance(&cloud.points[i]) > threshold);
        }

        debug!(
            surface = planes.len(),
            inliers = before - remaining.len(),
            remaining = remaining.len(),
            "Extracted plane"
        );
        planes.push(plane);
    }

    if explicit && planes.len() < n_surfaces {
        return Err(ScanError::unsatisfiable(n_surfaces, planes.len()));
    }
    if planes.is_empty() {
        return Err(ScanError::insufficient_data(0, min_inliers));
    }

    Ok(planes)
}

/// Fewest points a surface may have: `min_surface_fraction` of the cloud,
/// and never fewer than three.
fn coverage_floor(cloud_len: usize, params: &SegmentParams) -> usize {
    ((params.min_surface_fraction * cloud_len as f64).ceil() as usize).max(3)
}

/// Best plane through three sampled points, with its inlier count.
fn best_candidate(
    points: &[Point3<f64>],
    remaining: &[usize],
    threshold: f64,
    iterations: usize,
    rng: &mut StdRng,
) -> Option<(Plane, usize)> {
    let mut best: Option<(Plane, usize)> = None;

    for _ in 0..iterations {
        let sample = rand::seq::index::sample(rng, remaining.len(), 3);
        let [a, b, c] = [0, 1, 2].map(|k| points[remaining[sample.index(k)]]);
        let Some(plane) = Plane::from_three(a, b, c) else {
            continue;
        };

        let count = remaining
            .iter()
            .filter(|&&i| plane.distance(&points[i]) <= threshold)
            .count();

        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((plane, count));
        }
    }

    best
}

/// k-planes refinement. Returns the member points of each plane.
fn refine(
    cloud: &PointCloud,
    mut planes: Vec<Plane>,
    threshold: f64,
    iterations: usize,
    reference: &Point3<f64>,
) -> Vec<Vec<Point3<f64>>> {
    let cutoff = threshold * OUTLIER_FACTOR;
    let mut assignment = assign(&cloud.points, &planes, cutoff);

    for iteration in 0..iterations {
        for (k, plane) in planes.iter_mut().enumerate() {
            let members: Vec<Point3<f64>> = members_of(&cloud.points, &assignment, k);
            if let Some(fit) = Plane::fit(&members) {
                *plane = fit.plane.oriented_away_from(reference);
            }
        }

        let next = assign(&cloud.points, &planes, cutoff);
        let changed = next.iter().zip(&assignment).filter(|(a, b)| a != b).count();
        assignment = next;

        debug!(iteration, changed, "k-planes pass");
        if changed == 0 {
            break;
        }
    }

    (0..planes.len())
        .map(|k| members_of(&cloud.points, &assignment, k))
        .collect()
}

fn assign(points: &[Point3<f64>], planes: &[Plane], cutoff: f64) -> Vec<Option<usize>> {
    points
        .iter()
        .map(|p| {
            planes
                .iter()
                .enumerate()
                .map(|(k, plane)| (k, plane.distance(p)))
                .filter(|&(_, d)| d <= cutoff)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, _)| k)
        })
        .collect()
}

fn members_of(points: &[Point3<f64>], assignment: &[Option<usize>], k: usize) -> Vec<Point3<f64>> {
    points
        .iter()
        .zip(assignment)
        .filter(|&(_, a)| *a == Some(k))
        .map(|(p, _)| *p)
        .collect()
}
