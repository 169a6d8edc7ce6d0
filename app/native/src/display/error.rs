//! Error types for display geometry.
//!
//! Everything here is a configuration problem detected before any geometry
//! runs. Degenerate-but-recoverable conditions (a zero-length rotation axis,
//! an unusable pixel density) never surface as errors; the geometry code
//! substitutes a safe default and logs instead.

use thiserror::Error;

use super::model::DisplayId;

/// Result type alias for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Errors produced by the display geometry model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The display set is empty.
    #[error("No displays available")]
    NoDisplays,

    /// A display reported a zero or negative resolution.
    #[error("Display '{name}' has an invalid resolution {width}x{height}")]
    InvalidResolution {
        /// Name reported by enumeration.
        name: String,
        /// Reported width in device pixels.
        width: i64,
        /// Reported height in device pixels.
        height: i64,
    },

    /// A display has a pixel density that cannot be used for normalization.
    #[error("Display {id} has a non-positive pixel density ({ppi})")]
    NonPositivePpi {
        /// The offending display.
        id: DisplayId,
        /// The computed density.
        ppi: f64,
    },

    /// A manual diagonal override was zero, negative or not finite.
    #[error("Display {id} cannot have a diagonal of {inches} inches")]
    InvalidDiagonal {
        /// The display being overridden.
        id: DisplayId,
        /// The rejected value.
        inches: f64,
    },

    /// The viewer must sit in front of the reference plane.
    #[error("Viewer depth must be strictly positive, got {0}")]
    InvalidViewerDepth(f64),

    /// Per-display rotation arrays do not cover the display set.
    #[error("Perspective has {swivels} swivels and {tilts} tilts for {displays} displays")]
    RotationCountMismatch {
        /// Number of displays in the set.
        displays: usize,
        /// Number of configured swivels.
        swivels: usize,
        /// Number of configured tilts.
        tilts: usize,
    },

    /// The central display index does not name a display in the set.
    #[error("Central display {index} is outside the display set of {count}")]
    CentralDisplayOutOfRange {
        /// The configured index.
        index: usize,
        /// Number of displays in the set.
        count: usize,
    },

    /// A rotated corner ended up at or behind the viewer, so it has no projection.
    #[error("Display {0} is rotated behind the viewer")]
    BehindViewer(DisplayId),

    /// Two per-display inputs have different lengths.
    #[error("Expected {expected} {what}, got {actual}")]
    LengthMismatch {
        /// What was being counted.
        what: &'static str,
        /// The display count.
        expected: usize,
        /// The count that was supplied.
        actual: usize,
    },

    /// The span-group partition does not cover every display exactly once.
    #[error("Invalid span groups: {0}")]
    InvalidSpanGroups(String),

    /// The corner correspondences do not determine a projective map.
    #[error("Corner correspondences do not determine a projective transform")]
    SingularTransform,
}
