//! Physical display model.
//!
//! A [`DisplayModel`] is built once per enumerated display when the display
//! set is refreshed. Apart from a manual diagonal override, which produces a
//! new model, it never changes afterwards.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::{GeometryError, GeometryResult};

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Diagonal assumed when a display does not report its physical size.
pub const FALLBACK_DIAGONAL_INCHES: f64 = 23.0;

/// Largest relative disagreement tolerated between horizontal and vertical density.
const PPI_TOLERANCE: f64 = 0.01;

/// Stable handle for a display within one display set.
///
/// Ids are assigned after sorting by digital offset, so `DisplayId(0)` is the
/// left-most (then top-most) display. Every per-display record downstream is
/// keyed by this id rather than by its position in some array.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct DisplayId(pub usize);

impl DisplayId {
    /// Returns the position of this display in the sorted display set.
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self { Self { width, height } }

    /// Returns `width / height`.
    #[must_use]
    pub fn aspect_ratio(self) -> f64 { f64::from(self.width) / f64::from(self.height) }

    /// Returns true if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool { self.width == 0 || self.height == 0 }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A position in some pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self { Self { x, y } }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "({}, {})", self.x, self.y) }
}

/// Physical panel size in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PhysicalSize {
    #[must_use]
    pub const fn new(width_mm: f64, height_mm: f64) -> Self { Self { width_mm, height_mm } }

    /// Derives the panel size from a diagonal, assuming square pixels.
    #[must_use]
    pub fn from_diagonal_inches(inches: f64, resolution: Resolution) -> Self {
        let width = f64::from(resolution.width);
        let height = f64::from(resolution.height);
        let diagonal_px = width.hypot(height);
        let diagonal_mm = inches * MM_PER_INCH;
        Self {
            width_mm: diagonal_mm * width / diagonal_px,
            height_mm: diagonal_mm * height / diagonal_px,
        }
    }

    /// Returns the diagonal in inches.
    #[must_use]
    pub fn diagonal_inches(self) -> f64 { self.width_mm.hypot(self.height_mm) / MM_PER_INCH }

    /// Enumeration reports `0x0` when a panel's size is unknown.
    fn is_reported(self) -> bool { self.width_mm.abs() > 0.0 || self.height_mm.abs() > 0.0 }
}

/// One display as reported by enumeration, before sanitizing.
///
/// Offsets may be negative (common when the primary display is not the
/// left-most one) and the physical size may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    /// Name reported by the system, e.g. "DP-1".
    #[serde(default)]
    pub name: String,

    /// Resolution as `[width, height]` in device pixels.
    pub resolution: (i64, i64),

    /// Top-left position as `[x, y]` in desktop coordinates.
    #[serde(default)]
    pub offset: (i64, i64),

    /// Physical size as `[width, height]` in millimeters, if known.
    #[serde(default)]
    pub physical_size_mm: Option<(f64, f64)>,
}

/// A physical display with its derived pixel density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayModel {
    id: DisplayId,
    name: String,
    resolution: Resolution,
    digital_offset: Position,
    physical_size: PhysicalSize,
    physical_size_detection_failed: bool,
}

impl DisplayModel {
    /// Creates a display model.
    ///
    /// When `physical_size` is missing or reported as `0x0`, a 23" panel with
    /// the display's aspect ratio is assumed and the fallback is flagged. Any
    /// other reported size is kept as is, even if it yields an unusable density.
    #[must_use]
    pub fn new(
        id: DisplayId,
        name: impl Into<String>,
        resolution: Resolution,
        digital_offset: Position,
        physical_size: Option<PhysicalSize>,
    ) -> Self {
        let name = name.into();
        let (physical_size, detection_failed) = match physical_size {
            Some(size) if size.is_reported() => (size, false),
            _ => {
                tracing::warn!(
                    display = %id,
                    name = %name,
                    "physical size unavailable, assuming a {FALLBACK_DIAGONAL_INCHES}\" diagonal"
                );
                (PhysicalSize::from_diagonal_inches(FALLBACK_DIAGONAL_INCHES, resolution), true)
            }
        };

        Self {
            id,
            name,
            resolution,
            digital_offset,
            physical_size,
            physical_size_detection_failed: detection_failed,
        }
    }

    /// Builds the sorted display set from raw enumeration output.
    ///
    /// Negative offsets are translated so the smallest x and the smallest y
    /// are both zero, displays are sorted by `(x, y)` offset, and ids are
    /// assigned in that order.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidResolution`] if any display reports a
    /// zero or negative resolution.
    pub fn discover(infos: &[DisplayInfo]) -> GeometryResult<Vec<Self>> {
        let mut entries = Vec::with_capacity(infos.len());
        for info in infos {
            let (width, height) = info.resolution;
            let resolution = match (u32::try_from(width), u32::try_from(height)) {
                (Ok(w), Ok(h)) if w > 0 && h > 0 => Resolution::new(w, h),
                _ => {
                    return Err(GeometryError::InvalidResolution {
                        name: info.name.clone(),
                        width,
                        height,
                    });
                }
            };
            entries.push((info, resolution));
        }

        let min_x = infos.iter().map(|info| info.offset.0).min().unwrap_or(0);
        let min_y = infos.iter().map(|info| info.offset.1).min().unwrap_or(0);

        let mut sanitized: Vec<_> = entries
            .into_iter()
            .map(|(info, resolution)| {
                let offset = Position::new(info.offset.0 - min_x, info.offset.1 - min_y);
                (info, resolution, offset)
            })
            .collect();
        sanitized.sort_by_key(|(_, _, offset)| (offset.x, offset.y));

        let displays = sanitized
            .into_iter()
            .enumerate()
            .map(|(index, (info, resolution, offset))| {
                let physical = info.physical_size_mm.map(|(w, h)| PhysicalSize::new(w, h));
                let model = Self::new(DisplayId(index), &info.name, resolution, offset, physical);
                if !model.has_consistent_ppi() {
                    tracing::warn!(
                        display = %model.id,
                        horizontal = model.ppi(),
                        vertical = model.ppi_vertical(),
                        "horizontal and vertical pixel densities disagree"
                    );
                }
                model
            })
            .collect();

        Ok(displays)
    }

    /// Returns a copy of this display with its physical size derived from a
    /// user-supplied diagonal.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidDiagonal`] if `inches` is not a
    /// positive finite number.
    pub fn with_diagonal_inches(&self, inches: f64) -> GeometryResult<Self> {
        if !inches.is_finite() || inches <= 0.0 {
            return Err(GeometryError::InvalidDiagonal { id: self.id, inches });
        }

        Ok(Self {
            physical_size: PhysicalSize::from_diagonal_inches(inches, self.resolution),
            physical_size_detection_failed: false,
            ..self.clone()
        })
    }

    #[must_use]
    pub const fn id(&self) -> DisplayId { self.id }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub const fn resolution(&self) -> Resolution { self.resolution }

    #[must_use]
    pub const fn digital_offset(&self) -> Position { self.digital_offset }

    #[must_use]
    pub const fn physical_size(&self) -> PhysicalSize { self.physical_size }

    /// True when the physical size is the 23" fallback rather than a reported value.
    #[must_use]
    pub const fn physical_size_detection_failed(&self) -> bool {
        self.physical_size_detection_failed
    }

    /// Horizontal pixel density in pixels per inch.
    #[must_use]
    pub fn ppi(&self) -> f64 {
        f64::from(self.resolution.width) / (self.physical_size.width_mm / MM_PER_INCH)
    }

    /// Vertical pixel density in pixels per inch.
    #[must_use]
    pub fn ppi_vertical(&self) -> f64 {
        f64::from(self.resolution.height) / (self.physical_size.height_mm / MM_PER_INCH)
    }

    /// Returns true when horizontal and vertical densities agree within 1%.
    #[must_use]
    pub fn has_consistent_ppi(&self) -> bool {
        let horizontal = self.ppi();
        let vertical = self.ppi_vertical();
        let larger = horizontal.abs().max(vertical.abs());
        larger == 0.0 || (horizontal - vertical).abs() / larger <= PPI_TOLERANCE
    }
}
