//! Synthetic arena scans shared by the integration tests and benchmarks.

#![allow(dead_code)]

use arena_scan::PointCloud;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal sample via Box-Muller.
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Uniform samples on the rectangle `origin + s*u + t*v`, `s, t` in [0, 1],
/// displaced along `normal` by Gaussian noise.
pub fn noisy_rectangle(
    rng: &mut StdRng,
    origin: Point3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
    count: usize,
    sigma: f64,
) -> Vec<Point3<f64>> {
    let normal = u.cross(&v).normalize();
    (0..count)
        .map(|_| {
            let s: f64 = rng.r#gen();
            let t: f64 = rng.r#gen();
            origin + u * s + v * t + normal * (gaussian(rng) * sigma)
        })
        .collect()
}

/// Four walls of a unit box open at top and bottom: x=0, x=1, y=0, y=1
/// with z in [0, 1].
pub fn open_cube(points_per_wall: usize, sigma: f64, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let up = Vector3::z();
    let walls = [
        (Point3::new(0.0, 0.0, 0.0), Vector3::y()),
        (Point3::new(1.0, 0.0, 0.0), Vector3::y()),
        (Point3::new(0.0, 0.0, 0.0), Vector3::x()),
        (Point3::new(0.0, 1.0, 0.0), Vector3::x()),
    ];

    let mut cloud = PointCloud::with_capacity(points_per_wall * walls.len());
    for (origin, along) in walls {
        for p in noisy_rectangle(&mut rng, origin, along, up, points_per_wall, sigma) {
            cloud.push(p);
        }
    }
    cloud
}

/// The open cube from the acceptance scenario: 1000 points per wall,
/// sigma 0.01.
pub fn arena_scan() -> PointCloud {
    open_cube(1000, 0.01, 7)
}

/// Points on a single noiseless plane z = 0.
pub fn flat_cloud(side: usize) -> PointCloud {
    let mut cloud = PointCloud::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            cloud.push_coords(i as f64 / side as f64, j as f64 / side as f64, 0.0);
        }
    }
    cloud
}

/// Angle in degrees between `n` and the closest of `candidates`.
pub fn closest_axis_angle(n: &Vector3<f64>, candidates: &[Vector3<f64>]) -> f64 {
    candidates
        .iter()
        .map(|c| n.angle(c).to_degrees())
        .fold(f64::INFINITY, f64::min)
}
