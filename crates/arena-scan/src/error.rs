//! Error types for arena reconstruction with rich diagnostics.
//!
//! This module provides error handling with:
//! - Machine-readable error codes for programmatic handling
//! - Context for diagnosis without re-running the scan (counts, thresholds, achieved values)
//! - Recovery suggestions for common issues
//! - Terminal display via miette
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `ARENA-XXXX`:
//! - `ARENA-1xxx`: I/O errors (file reading, writing, parsing)
//! - `ARENA-2xxx`: Input data errors (too few points, unsatisfiable surface count)
//! - `ARENA-3xxx`: Geometry errors (degenerate faces, invalid meshes)
//! - `ARENA-4xxx`: Tracking hardware errors
//! - `ARENA-5xxx`: Configuration errors (output path, config files)
//!
//! # Example
//!
//! ```rust,ignore
//! use arena_scan::{ScanError, ErrorCode};
//!
//! let err = ScanError::insufficient_data(99, 100);
//! println!("Error code: {}", err.code()); // ARENA-2001
//! println!("Recovery: {}", err.recovery_suggestion());
//! ```

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// ARENA-1001: Failed to read file
    IoRead = 1001,
    /// ARENA-1002: Failed to write file
    IoWrite = 1002,
    /// ARENA-1003: Failed to parse file contents
    ParseError = 1003,
    /// ARENA-1004: Unsupported file format
    UnsupportedFormat = 1004,

    // Input data errors (2xxx)
    /// ARENA-2001: Too few points to reconstruct
    InsufficientData = 2001,
    /// ARENA-2002: A surface cluster has fewer than 3 non-collinear points
    DegenerateSurface = 2002,
    /// ARENA-2003: Requested surface count cannot be achieved
    UnsatisfiableConfiguration = 2003,

    // Geometry errors (3xxx)
    /// ARENA-3001: Face boundary collapsed below 3 usable vertices
    GeometryDegenerate = 3001,
    /// ARENA-3002: Mesh violates its index or normal invariants
    InvalidMesh = 3002,

    // Hardware errors (4xxx)
    /// ARENA-4001: Pivot alignment did not converge within the retry cap
    HardwareConvergenceFailure = 4001,
    /// ARENA-4002: Orientation or pivot offset did not reset
    HardwareReset = 4002,
    /// ARENA-4003: Driver command failed
    Hardware = 4003,

    // Configuration errors (5xxx)
    /// ARENA-5001: Output path has the wrong extension
    InvalidOutputPath = 5001,
    /// ARENA-5002: Configuration could not be parsed or is out of range
    InvalidConfig = 5002,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `ARENA-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "ARENA-1001",
            ErrorCode::IoWrite => "ARENA-1002",
            ErrorCode::ParseError => "ARENA-1003",
            ErrorCode::UnsupportedFormat => "ARENA-1004",
            ErrorCode::InsufficientData => "ARENA-2001",
            ErrorCode::DegenerateSurface => "ARENA-2002",
            ErrorCode::UnsatisfiableConfiguration => "ARENA-2003",
            ErrorCode::GeometryDegenerate => "ARENA-3001",
            ErrorCode::InvalidMesh => "ARENA-3002",
            ErrorCode::HardwareConvergenceFailure => "ARENA-4001",
            ErrorCode::HardwareReset => "ARENA-4002",
            ErrorCode::Hardware => "ARENA-4003",
            ErrorCode::InvalidOutputPath => "ARENA-5001",
            ErrorCode::InvalidConfig => "ARENA-5002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for scan errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check the scanning setup before re-running.
    CheckSetup { checks: Vec<String> },
    /// Adjust parameters for the operation.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Use a different file format.
    UseDifferentFormat { suggested: Vec<String> },
    /// Check the input file.
    CheckInput { checks: Vec<String> },
    /// Manual intervention may be required.
    ManualIntervention { description: String },
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckSetup { checks } => {
                write!(f, "Check the scanning setup: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::UseDifferentFormat { suggested } => {
                write!(f, "Try using a different format: {}", suggested.join(", "))
            }
            RecoverySuggestion::CheckInput { checks } => {
                write!(f, "Check the input for: {}", checks.join(", "))
            }
            RecoverySuggestion::ManualIntervention { description } => {
                write!(f, "{}", description)
            }
        }
    }
}

/// Where in the data an error was detected.
#[derive(Debug, Clone)]
pub enum ErrorLocation {
    /// A segmented surface.
    Surface { index: usize },
    /// A polygon or triangle face.
    Face { index: usize },
    /// A file.
    File { path: PathBuf },
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorLocation::Surface { index } => write!(f, "surface {}", index),
            ErrorLocation::Face { index } => write!(f, "face {}", index),
            ErrorLocation::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Errors that can occur while scanning and reconstructing an arena.
#[derive(Debug, Error, Diagnostic)]
pub enum ScanError {
    /// Error reading from a file.
    #[error("failed to read {path}")]
    #[diagnostic(
        code(arena::io::read),
        help("Check that the file exists and is readable. Try: ls -la {}", path.display())
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write {path}")]
    #[diagnostic(
        code(arena::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a point cloud or mesh file.
    #[error("failed to parse {path}: {details}")]
    #[diagnostic(
        code(arena::parse::error),
        help("The file may be truncated or written by an incompatible exporter.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file format.
    #[error("unsupported file format: {extension:?}")]
    #[diagnostic(
        code(arena::format::unsupported),
        help("Point clouds: XYZ, TXT, ASC, PTS, PLY. Meshes: OBJ.")
    )]
    UnsupportedFormat { extension: Option<String> },

    /// Too few points were detected to model the arena.
    #[error("only {found} points detected, at least {required} are required to model the arena")]
    #[diagnostic(
        code(arena::data::insufficient),
        help(
            "The tracker is not detecting enough points. Is the projector turned on and the calibration pattern visible?"
        )
    )]
    InsufficientData { found: usize, required: usize },

    /// A surface cluster cannot define a plane.
    #[error(
        "surface {surface} is degenerate: {points} points, {non_collinear} needed that are not collinear"
    )]
    #[diagnostic(
        code(arena::data::degenerate_surface),
        help("The cluster's points are collinear or coincident and cannot define a plane.")
    )]
    DegenerateSurface {
        surface: usize,
        points: usize,
        non_collinear: usize,
    },

    /// The requested number of surfaces cannot be found in the data.
    #[error("requested {requested} surfaces but the data supports only {achievable}")]
    #[diagnostic(
        code(arena::data::unsatisfiable),
        help("Lower the surface count, or pass 0 to estimate it from the data.")
    )]
    UnsatisfiableConfiguration { requested: usize, achievable: usize },

    /// A face boundary collapsed.
    #[error("face {face} is degenerate: {details}")]
    #[diagnostic(
        code(arena::geometry::degenerate),
        help("Lower the merge epsilon or check that the surface was scanned over its full extent.")
    )]
    GeometryDegenerate { face: usize, details: String },

    /// The mesh violates its own invariants.
    #[error("invalid mesh: {details}")]
    #[diagnostic(code(arena::geometry::invalid_mesh))]
    InvalidMesh { details: String },

    /// The tracker did not move its pivot to the target in time.
    #[error(
        "tracker failed to move pivot to ({:.4}, {:.4}, {:.4}) after {attempts} attempts; last reported ({:.4}, {:.4}, {:.4})",
        .target[0], .target[1], .target[2], .reported[0], .reported[1], .reported[2]
    )]
    #[diagnostic(
        code(arena::hardware::convergence),
        help("The exported mesh would disagree with the tracker's origin. Check the rigid body in the tracking software.")
    )]
    HardwareConvergenceFailure {
        attempts: usize,
        target: [f64; 3],
        reported: [f64; 3],
    },

    /// Orientation or pivot offset did not reset.
    #[error("rigid body {body} did not reset: {details}")]
    #[diagnostic(code(arena::hardware::reset))]
    HardwareReset { body: String, details: String },

    /// A driver command failed.
    #[error("tracking hardware error: {details}")]
    #[diagnostic(code(arena::hardware::driver))]
    Hardware { details: String },

    /// Output file has the wrong extension.
    #[error("output arena filename must be a Wavefront (.obj) file, got {path} (extension {extension:?})")]
    #[diagnostic(
        code(arena::config::output_path),
        help("Use a .obj extension or omit the extension entirely.")
    )]
    InvalidOutputPath { path: PathBuf, extension: String },

    /// Configuration could not be used.
    #[error("invalid configuration: {details}")]
    #[diagnostic(code(arena::config::invalid))]
    InvalidConfig { details: String },
}

impl ScanError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ScanError::IoRead { .. } => ErrorCode::IoRead,
            ScanError::IoWrite { .. } => ErrorCode::IoWrite,
            ScanError::ParseError { .. } => ErrorCode::ParseError,
            ScanError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            ScanError::InsufficientData { .. } => ErrorCode::InsufficientData,
            ScanError::DegenerateSurface { .. } => ErrorCode::DegenerateSurface,
            ScanError::UnsatisfiableConfiguration { .. } => ErrorCode::UnsatisfiableConfiguration,
            ScanError::GeometryDegenerate { .. } => ErrorCode::GeometryDegenerate,
            ScanError::InvalidMesh { .. } => ErrorCode::InvalidMesh,
            ScanError::HardwareConvergenceFailure { .. } => ErrorCode::HardwareConvergenceFailure,
            ScanError::HardwareReset { .. } => ErrorCode::HardwareReset,
            ScanError::Hardware { .. } => ErrorCode::Hardware,
            ScanError::InvalidOutputPath { .. } => ErrorCode::InvalidOutputPath,
            ScanError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            ScanError::IoRead { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            ScanError::IoWrite { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["directory exists".into(), "write permissions".into()],
            },
            ScanError::ParseError { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["three numeric columns per line".into(), "finite values".into()],
            },
            ScanError::UnsupportedFormat { .. } => RecoverySuggestion::UseDifferentFormat {
                suggested: vec!["XYZ".into(), "PLY".into(), "OBJ".into()],
            },
            ScanError::InsufficientData { .. } => RecoverySuggestion::CheckSetup {
                checks: vec![
                    "projector is on".into(),
                    "cameras see the projected pattern".into(),
                    "camera exposure and gain".into(),
                ],
            },
            ScanError::DegenerateSurface { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![("n_surfaces".into(), "try 0 (auto-estimate)".into())],
            },
            ScanError::UnsatisfiableConfiguration { achievable, .. } => {
                RecoverySuggestion::AdjustParameters {
                    parameters: vec![("n_surfaces".into(), format!("{} or 0", achievable))],
                }
            }
            ScanError::GeometryDegenerate { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![
                    ("merge_epsilon".into(), "try a smaller value".into()),
                    ("simplify_tolerance".into(), "try a smaller value".into()),
                ],
            },
            ScanError::InvalidMesh { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["face indices".into(), "normal count".into()],
            },
            ScanError::HardwareConvergenceFailure { .. } => {
                RecoverySuggestion::ManualIntervention {
                    description: "Move the rigid body pivot manually in the tracking software and re-run"
                        .into(),
                }
            }
            ScanError::HardwareReset { .. } | ScanError::Hardware { .. } => {
                RecoverySuggestion::CheckSetup {
                    checks: vec!["tracker connection".into(), "rigid body is tracked".into()],
                }
            }
            ScanError::InvalidOutputPath { .. } => RecoverySuggestion::UseDifferentFormat {
                suggested: vec!["OBJ".into()],
            },
            ScanError::InvalidConfig { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["configuration keys".into(), "value ranges".into()],
            },
        }
    }

    /// Returns location information if available.
    pub fn location(&self) -> Option<ErrorLocation> {
        match self {
            ScanError::DegenerateSurface { surface, .. } => {
                Some(ErrorLocation::Surface { index: *surface })
            }
            ScanError::GeometryDegenerate { face, .. } => Some(ErrorLocation::Face { index: *face }),
            ScanError::IoRead { path, .. }
            | ScanError::IoWrite { path, .. }
            | ScanError::ParseError { path, .. }
            | ScanError::InvalidOutputPath { path, .. } => {
                Some(ErrorLocation::File { path: path.clone() })
            }
            _ => None,
        }
    }

    // Constructor helpers for common error patterns

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        ScanError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create an InsufficientData error.
    pub fn insufficient_data(found: usize, required: usize) -> Self {
        ScanError::InsufficientData { found, required }
    }

    /// Create a DegenerateSurface error.
    pub fn degenerate_surface(surface: usize, points: usize) -> Self {
        ScanError::DegenerateSurface {
            surface,
            points,
            non_collinear: 3,
        }
    }

    /// Create an UnsatisfiableConfiguration error.
    pub fn unsatisfiable(requested: usize, achievable: usize) -> Self {
        ScanError::UnsatisfiableConfiguration {
            requested,
            achievable,
        }
    }

    /// Create a GeometryDegenerate error.
    pub fn geometry_degenerate(face: usize, details: impl Into<String>) -> Self {
        ScanError::GeometryDegenerate {
            face,
            details: details.into(),
        }
    }

    /// Create an InvalidMesh error.
    pub fn invalid_mesh(details: impl Into<String>) -> Self {
        ScanError::InvalidMesh {
            details: details.into(),
        }
    }

    /// Create a Hardware error.
    pub fn hardware(details: impl Into<String>) -> Self {
        ScanError::Hardware {
            details: details.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        ScanError::InvalidConfig {
            details: details.into(),
        }
    }
}
