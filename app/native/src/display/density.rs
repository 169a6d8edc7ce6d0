//! Pixel density normalization.
//!
//! Maps every display into a shared "PPI-normalized" pixel space where one
//! pixel covers the same physical length on every panel. The densest display
//! keeps its native resolution and every other display grows, so crops are
//! only ever scaled down on the way back to device pixels.

use serde::Serialize;

use super::error::{GeometryError, GeometryResult};
use super::model::{DisplayId, DisplayModel, MM_PER_INCH, Position, Resolution};

/// Density used to convert bezel millimeters when no display has a usable one.
const FALLBACK_PPI: f64 = 96.0;

/// Bezel thickness in normalized pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BezelPx {
    /// Material to the right of the display.
    pub right: i64,
    /// Material below the display.
    pub bottom: i64,
}

/// A display expressed in normalized pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedDisplay {
    pub id: DisplayId,
    pub ppi_norm_resolution: Resolution,
    /// Top-left position in the guessed physical layout.
    pub ppi_norm_offset: Position,
    pub ppi_norm_bezels: BezelPx,
}

/// Result of normalizing a display set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalization {
    /// Density of the densest display, used to convert millimeters to pixels.
    pub max_ppi: f64,
    /// False when densities were unusable and native resolutions were kept.
    pub ppi_corrected: bool,
    pub displays: Vec<NormalizedDisplay>,
}

impl Normalization {
    /// Converts a physical length to normalized pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn mm_to_px(&self, mm: f64) -> i64 { (mm * (self.max_ppi / MM_PER_INCH)).round() as i64 }
}

/// Returns the highest pixel density in the set.
///
/// # Errors
///
/// Returns [`GeometryError::NoDisplays`] for an empty set, or
/// [`GeometryError::NonPositivePpi`] if any display's density is zero,
/// negative or not finite.
pub fn max_ppi(displays: &[DisplayModel]) -> GeometryResult<f64> {
    let mut max = None::<f64>;
    for display in displays {
        let ppi = display.ppi();
        if !ppi.is_finite() || ppi <= 0.0 {
            return Err(GeometryError::NonPositivePpi { id: display.id(), ppi });
        }
        max = Some(max.map_or(ppi, |current| current.max(ppi)));
    }
    max.ok_or(GeometryError::NoDisplays)
}

/// Scales every display's resolution into normalized pixel space.
///
/// Each resolution becomes `round(resolution / (ppi / max_ppi))`.
///
/// # Errors
///
/// Fails under the same conditions as [`max_ppi`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize(displays: &[DisplayModel]) -> GeometryResult<Vec<NormalizedDisplay>> {
    let max = max_ppi(displays)?;

    Ok(displays
        .iter()
        .map(|display| {
            let ratio = display.ppi() / max;
            let native = display.resolution();
            NormalizedDisplay {
                id: display.id(),
                ppi_norm_resolution: Resolution::new(
                    (f64::from(native.width) / ratio).round() as u32,
                    (f64::from(native.height) / ratio).round() as u32,
                ),
                ppi_norm_offset: Position::default(),
                ppi_norm_bezels: BezelPx::default(),
            }
        })
        .collect())
}

/// Uses native resolutions as normalized resolutions.
#[must_use]
pub fn native(displays: &[DisplayModel]) -> Vec<NormalizedDisplay> {
    displays
        .iter()
        .map(|display| NormalizedDisplay {
            id: display.id(),
            ppi_norm_resolution: display.resolution(),
            ppi_norm_offset: Position::default(),
            ppi_norm_bezels: BezelPx::default(),
        })
        .collect()
}

/// Normalizes the set, or falls back to native resolutions when densities are unusable.
///
/// With `ppi_correction` off, native resolutions are used directly. In both
/// the disabled and the fallback case `max_ppi` is still the best available
/// density so bezel millimeters keep a sensible size.
#[must_use]
pub fn normalize_or_native(displays: &[DisplayModel], ppi_correction: bool) -> Normalization {
    let usable_max = displays
        .iter()
        .map(DisplayModel::ppi)
        .filter(|ppi| ppi.is_finite() && *ppi > 0.0)
        .fold(None::<f64>, |max, ppi| Some(max.map_or(ppi, |m| m.max(ppi))))
        .unwrap_or(FALLBACK_PPI);

    if !ppi_correction {
        return Normalization {
            max_ppi: usable_max,
            ppi_corrected: false,
            displays: native(displays),
        };
    }

    match normalize(displays) {
        Ok(normalized) => Normalization {
            max_ppi: usable_max,
            ppi_corrected: true,
            displays: normalized,
        },
        Err(err) => {
            tracing::warn!(error = %err, "pixel density correction disabled");
            Normalization {
                max_ppi: usable_max,
                ppi_corrected: false,
                displays: native(displays),
            }
        }
    }
}
