//! Subcommand implementations.

pub mod info;
pub mod scan;
pub mod segment;

use std::path::Path;

use anyhow::{Context, Result};
use arena_scan::{OutlierParams, PointCloud, ScanConfig};

use crate::SegmentArgs;

/// Build the scan configuration: file values first, then flag overrides.
pub fn load_config(args: &SegmentArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => ScanConfig::default(),
    };

    if let Some(n) = args.n_surfaces {
        config.n_surfaces = n;
    }
    if let Some(threshold) = args.threshold {
        config.segment.inlier_threshold = Some(threshold);
    }
    if let Some(seed) = args.seed {
        config.segment.seed = seed;
    }
    if args.remove_outliers && config.outliers.is_none() {
        config.outliers = Some(OutlierParams::default());
    }

    config.validate()?;
    Ok(config)
}

pub fn load_points(input: &Path) -> Result<PointCloud> {
    PointCloud::load(input).with_context(|| format!("Failed to load point cloud from {:?}", input))
}
