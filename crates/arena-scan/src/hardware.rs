//! Tracking-system rigid bodies.
//!
//! The arena is registered with the tracker as a rigid body whose pivot
//! (the point the tracker reports as the body's location) must be moved to
//! the mesh origin. Tracker state is eventually consistent: a command is
//! accepted immediately but only shows up in reported values after one or
//! more update cycles.
//!
//! Camera exposure and the tracker's project file sit behind [`Tracker`].
//! Cameras are switched to visible-light settings while the projected
//! pattern is detected and must be put back before the project is saved.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::{ScanError, ScanResult};
use crate::pointcloud::centroid_of;

/// A rigid body tracked by the motion-capture system.
pub trait RigidBody {
    /// Name the body is registered under.
    fn name(&self) -> &str;

    /// Run one driver update cycle, applying any settled commands.
    fn update(&mut self) -> ScanResult<()>;

    /// Request the body's orientation be reset to zero.
    fn reset_orientation(&mut self) -> ScanResult<()>;

    /// Request the pivot be moved back to the centroid of the markers.
    fn reset_pivot_offset(&mut self) -> ScanResult<()>;

    /// Last reported pivot location in world coordinates.
    fn location(&self) -> ScanResult<Point3<f64>>;

    /// Request the pivot be moved to `location` (world coordinates).
    fn set_location(&mut self, location: Point3<f64>) -> ScanResult<()>;

    /// Last reported orientation as XYZ Euler angles in degrees.
    fn rotation(&self) -> ScanResult<Vector3<f64>>;

    /// Last reported marker positions in world coordinates.
    fn markers(&self) -> ScanResult<Vec<Point3<f64>>>;
}

/// Exposure settings of one tracking camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Frames per second.
    pub frame_rate: u32,
    /// Sensor gain step.
    pub gain: u32,
    /// Whether the infrared filter is in front of the sensor.
    pub ir_filter: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            frame_rate: 120,
            gain: 1,
            ir_filter: true,
        }
    }
}

impl CameraSettings {
    /// These settings with the IR filter out and gain raised, so projected
    /// visible light registers as markers.
    pub fn for_visible_light(self) -> Self {
        Self {
            gain: self.gain.max(8),
            ir_filter: false,
            ..self
        }
    }
}

/// Camera and project control of the tracking system.
pub trait Tracker {
    /// Current settings of every camera, in camera order.
    fn camera_settings(&self) -> ScanResult<Vec<CameraSettings>>;

    /// Apply one settings entry per camera.
    fn set_camera_settings(&mut self, settings: &[CameraSettings]) -> ScanResult<()>;

    /// Write the tracker project, including rigid body pivots, to `path`.
    fn save_project(&mut self, path: &Path) -> ScanResult<()>;
}

/// Camera settings captured before scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCameraSettings(Vec<CameraSettings>);

impl SavedCameraSettings {
    /// Put the captured settings back.
    pub fn restore(self, tracker: &mut dyn Tracker) -> ScanResult<()> {
        debug!(cameras = self.0.len(), "Restoring camera settings");
        tracker.set_camera_settings(&self.0)
    }

    pub fn cameras(&self) -> &[CameraSettings] {
        &self.0
    }
}

/// Switch every camera to visible-light detection, returning the previous
/// settings for [`SavedCameraSettings::restore`].
pub fn configure_for_scanning(tracker: &mut dyn Tracker) -> ScanResult<SavedCameraSettings> {
    let saved = tracker.camera_settings()?;
    let scanning: Vec<CameraSettings> = saved.iter().map(|c| c.for_visible_light()).collect();
    tracker.set_camera_settings(&scanning)?;
    info!(cameras = saved.len(), "Cameras configured for visible light");
    Ok(SavedCameraSettings(saved))
}

/// Where a scanned project is saved: `<stem>_scanned.<ext>` beside the
/// original, so the loaded project is never overwritten.
pub fn scanned_project_path(project: &Path) -> PathBuf {
    let stem = project
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match project.extension() {
        Some(ext) => format!("{}_scanned.{}", stem, ext.to_string_lossy()),
        None => format!("{}_scanned", stem),
    };
    project.with_file_name(name)
}

#[derive(Serialize)]
struct ProjectSnapshot<'a> {
    body: &'a str,
    location: [f64; 3],
    rotation: [f64; 3],
    markers: Vec<[f64; 3]>,
    cameras: &'a [CameraSettings],
}

#[derive(Debug, Clone, Copy)]
enum Command {
    ResetOrientation,
    ResetPivot,
    SetLocation(Point3<f64>),
}

/// In-memory rigid body used when no tracker is attached.
///
/// Commands take effect after `latency` calls to [`RigidBody::update`]
/// (immediately when `latency` is 0), in the order they were issued.
#[derive(Debug, Clone)]
pub struct SimulatedRigidBody {
    name: String,
    markers: Vec<Point3<f64>>,
    location: Point3<f64>,
    rotation: Vector3<f64>,
    latency: u32,
    pending: VecDeque<(u32, Command)>,
    ignore_set_location: bool,
    ignore_resets: bool,
    connected: bool,
    updates: usize,
    cameras: Vec<CameraSettings>,
}

impl SimulatedRigidBody {
    /// A body whose pivot starts at the marker centroid with zero rotation.
    pub fn new(name: impl Into<String>, markers: Vec<Point3<f64>>) -> Self {
        let location = centroid_of(&markers).unwrap_or_else(Point3::origin);
        Self {
            name: name.into(),
            markers,
            location,
            rotation: Vector3::zeros(),
            latency: 1,
            pending: VecDeque::new(),
            ignore_set_location: false,
            ignore_resets: false,
            connected: true,
            updates: 0,
            cameras: vec![CameraSettings::default()],
        }
    }

    /// Attach cameras with the given starting settings.
    pub fn with_cameras(mut self, cameras: Vec<CameraSettings>) -> Self {
        self.cameras = cameras;
        self
    }

    /// Number of update cycles before a command is visible.
    pub fn with_latency(mut self, cycles: u32) -> Self {
        self.latency = cycles;
        self
    }

    /// Start with the pivot displaced from the marker centroid.
    pub fn with_location(mut self, location: Point3<f64>) -> Self {
        self.location = location;
        self
    }

    /// Start with a non-zero orientation.
    pub fn with_rotation(mut self, rotation: Vector3<f64>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Accept but never apply `set_location` commands.
    pub fn with_stuck_pivot(mut self) -> Self {
        self.ignore_set_location = true;
        self
    }

    /// Accept but never apply orientation and pivot resets.
    pub fn with_stuck_resets(mut self) -> Self {
        self.ignore_resets = true;
        self
    }

    /// Make every subsequent call fail as if the driver went away.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Update cycles run so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Commands issued but not yet applied.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn check_connected(&self) -> ScanResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(ScanError::hardware(format!(
                "rigid body '{}' is not connected",
                self.name
            )))
        }
    }

    fn issue(&mut self, command: Command) -> ScanResult<()> {
        self.check_connected()?;
        if self.latency == 0 {
            self.apply(command);
        } else {
            self.pending.push_back((self.latency, command));
        }
        Ok(())
    }

    fn apply(&mut self, command: Command) {
        trace!(body = self.name.as_str(), ?command, "Applying command");
        match command {
            Command::ResetOrientation if !self.ignore_resets => {
                self.rotation = Vector3::zeros();
            }
            Command::ResetPivot if !self.ignore_resets => {
                self.location = centroid_of(&self.markers).unwrap_or(self.location);
            }
            Command::SetLocation(p) if !self.ignore_set_location => {
                self.location = p;
            }
            _ => {}
        }
    }
}

impl RigidBody for SimulatedRigidBody {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self) -> ScanResult<()> {
        self.check_connected()?;
        self.updates += 1;

        for (remaining, _) in self.pending.iter_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        while let Some(&(0, command)) = self.pending.front() {
            self.pending.pop_front();
            self.apply(command);
        }
        Ok(())
    }

    fn reset_orientation(&mut self) -> ScanResult<()> {
        self.issue(Command::ResetOrientation)
    }

    fn reset_pivot_offset(&mut self) -> ScanResult<()> {
        self.issue(Command::ResetPivot)
    }

    fn location(&self) -> ScanResult<Point3<f64>> {
        self.check_connected()?;
        Ok(self.location)
    }

    fn set_location(&mut self, location: Point3<f64>) -> ScanResult<()> {
        self.issue(Command::SetLocation(location))
    }

    fn rotation(&self) -> ScanResult<Vector3<f64>> {
        self.check_connected()?;
        Ok(self.rotation)
    }

    fn markers(&self) -> ScanResult<Vec<Point3<f64>>> {
        self.check_connected()?;
        Ok(self.markers.clone())
    }
}

impl Tracker for SimulatedRigidBody {
    fn camera_settings(&self) -> ScanResult<Vec<CameraSettings>> {
        self.check_connected()?;
        Ok(self.cameras.clone())
    }

    fn set_camera_settings(&mut self, settings: &[CameraSettings]) -> ScanResult<()> {
        self.check_connected()?;
        if settings.len() != self.cameras.len() {
            return Err(ScanError::hardware(format!(
                "{} camera settings for {} cameras",
                settings.len(),
                self.cameras.len()
            )));
        }
        self.cameras = settings.to_vec();
        Ok(())
    }

    /// Saves the body and cameras as TOML.
    fn save_project(&mut self, path: &Path) -> ScanResult<()> {
        self.check_connected()?;
        let snapshot = ProjectSnapshot {
            body: &self.name,
            location: self.location.coords.into(),
            rotation: self.rotation.into(),
            markers: self.markers.iter().map(|p| p.coords.into()).collect(),
            cameras: &self.cameras,
        };
        let text = toml::to_string(&snapshot)
            .map_err(|e| ScanError::hardware(format!("cannot serialize project: {}", e)))?;
        std::fs::write(path, text).map_err(|e| ScanError::io_write(path, e))?;
        info!(body = self.name.as_str(), ?path, "Saved tracker project");
        Ok(())
    }
}
