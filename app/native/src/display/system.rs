//! The display system: one immutable snapshot of the full display geometry.
//!
//! A [`DisplaySystem`] is built when displays are refreshed and rebuilt from
//! scratch whenever the user reconfigures bezels, diagonals or offsets. It is
//! never mutated in place. Compositing jobs take an `Arc` snapshot from
//! [`SharedDisplaySystem`] and keep reading that snapshot even if a newer one
//! is published mid-job.

use std::sync::Arc;

use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::density::{self, BezelPx, NormalizedDisplay};
use super::error::{GeometryError, GeometryResult};
use super::layout::{self, DisplayCrop};
use super::model::{DisplayId, DisplayModel, Position, Resolution};

/// How source images are spread across displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SpanMode {
    /// One image stretched across each span group's true desktop area, no corrections.
    #[default]
    Single,
    /// One image per span group with density, bezel and perspective correction.
    Advanced,
    /// One image per display.
    Multi,
}

impl std::fmt::Display for SpanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Advanced => write!(f, "advanced"),
            Self::Multi => write!(f, "multi"),
        }
    }
}

/// A partition of the display set into independently composited groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanGroups(Vec<Vec<DisplayId>>);

impl SpanGroups {
    /// One group holding every display.
    #[must_use]
    pub fn single(display_count: usize) -> Self {
        Self(vec![(0..display_count).map(DisplayId).collect()])
    }

    /// Builds a partition from lists of display indices.
    ///
    /// Repeated indices inside one group are collapsed. An empty `groups`
    /// slice means a single group.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidSpanGroups`] if a group is empty, an
    /// index is out of range, a display appears in more than one group, or a
    /// display is not covered.
    pub fn new(groups: &[Vec<usize>], display_count: usize) -> GeometryResult<Self> {
        if groups.is_empty() {
            return Ok(Self::single(display_count));
        }

        let mut owner: Vec<Option<usize>> = vec![None; display_count];
        let mut partition = Vec::with_capacity(groups.len());

        for (group_index, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(GeometryError::InvalidSpanGroups(format!("group {group_index} is empty")));
            }

            let mut members = Vec::with_capacity(group.len());
            for &index in group {
                let Some(slot) = owner.get_mut(index) else {
                    return Err(GeometryError::InvalidSpanGroups(format!(
                        "display {index} does not exist ({display_count} displays)"
                    )));
                };
                match *slot {
                    Some(existing) if existing == group_index => {}
                    Some(existing) => {
                        return Err(GeometryError::InvalidSpanGroups(format!(
                            "display {index} is in groups {existing} and {group_index}"
                        )));
                    }
                    None => {
                        *slot = Some(group_index);
                        members.push(DisplayId(index));
                    }
                }
            }
            partition.push(members);
        }

        if let Some(missing) = owner.iter().position(Option::is_none) {
            return Err(GeometryError::InvalidSpanGroups(format!(
                "display {missing} is not in any group"
            )));
        }

        Ok(Self(partition))
    }

    #[must_use]
    pub fn groups(&self) -> &[Vec<DisplayId>] { &self.0 }

    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Returns the index of the group containing `id`.
    #[must_use]
    pub fn group_of(&self, id: DisplayId) -> Option<usize> {
        self.0.iter().position(|group| group.contains(&id))
    }
}

/// User-controlled geometry inputs.
///
/// Empty vectors mean "not set". This is also the record persisted per
/// display set by the geometry store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometrySettings {
    /// Scale displays into a common pixel density.
    pub ppi_correction: bool,
    /// Per-display diagonal override in inches; `null` keeps the detected size.
    pub diagonal_inches: Vec<Option<f64>>,
    /// Per-display `[right, bottom]` bezel thickness in millimeters.
    pub bezels_mm: Vec<(f64, f64)>,
    /// Per-display manual offsets relative to the side-by-side arrangement.
    pub manual_offsets: Vec<(i64, i64)>,
    /// Per-display absolute normalized positions; overrides everything else.
    pub ppi_norm_offsets: Vec<(i64, i64)>,
    pub perspective_enabled: bool,
    pub default_perspective: Option<String>,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            ppi_correction: true,
            diagonal_inches: Vec::new(),
            bezels_mm: Vec::new(),
            manual_offsets: Vec::new(),
            ppi_norm_offsets: Vec::new(),
            perspective_enabled: false,
            default_perspective: None,
        }
    }
}

impl GeometrySettings {
    fn check_len<T>(values: &[T], what: &'static str, expected: usize) -> GeometryResult<()> {
        if values.is_empty() || values.len() == expected {
            Ok(())
        } else {
            Err(GeometryError::LengthMismatch { what, expected, actual: values.len() })
        }
    }

    /// Checks that every per-display list is empty or matches the display count.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::LengthMismatch`] for the first list that does not.
    pub fn validate(&self, display_count: usize) -> GeometryResult<()> {
        Self::check_len(&self.diagonal_inches, "diagonal sizes", display_count)?;
        Self::check_len(&self.bezels_mm, "bezel sizes", display_count)?;
        Self::check_len(&self.manual_offsets, "manual offsets", display_count)?;
        Self::check_len(&self.ppi_norm_offsets, "normalized offsets", display_count)
    }
}

/// Immutable geometry for one display set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySystem {
    detected: Vec<DisplayModel>,
    displays: Vec<DisplayModel>,
    normalized: Vec<NormalizedDisplay>,
    max_ppi: f64,
    ppi_corrected: bool,
    settings: GeometrySettings,
}

impl DisplaySystem {
    /// Builds a system with automatic layout and default settings.
    ///
    /// # Errors
    ///
    /// See [`DisplaySystem::configure`].
    pub fn new(displays: Vec<DisplayModel>) -> GeometryResult<Self> {
        Self::configure(displays, GeometrySettings::default())
    }

    /// Builds a system from detected displays and user settings.
    ///
    /// Normalized offsets come from, in order of preference: explicit
    /// normalized offsets, manual offsets with accumulated bezels, or the
    /// automatic column layout (which accounts for bezels on its own).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NoDisplays`] for an empty set and a
    /// configuration error for settings that do not fit the display set.
    /// Unusable pixel densities are not an error: correction is disabled and a
    /// warning logged.
    pub fn configure(detected: Vec<DisplayModel>, settings: GeometrySettings) -> GeometryResult<Self> {
        if detected.is_empty() {
            return Err(GeometryError::NoDisplays);
        }
        settings.validate(detected.len())?;

        let displays = detected
            .iter()
            .enumerate()
            .map(|(index, display)| match settings.diagonal_inches.get(index).copied().flatten() {
                Some(inches) => display.with_diagonal_inches(inches),
                None => Ok(display.clone()),
            })
            .collect::<GeometryResult<Vec<_>>>()?;

        let normalization = density::normalize_or_native(&displays, settings.ppi_correction);
        let mut normalized = normalization.displays.clone();

        for (entry, (right, bottom)) in normalized.iter_mut().zip(&settings.bezels_mm) {
            entry.ppi_norm_bezels = BezelPx {
                right: normalization.mm_to_px(*right),
                bottom: normalization.mm_to_px(*bottom),
            };
        }

        let offsets = if !settings.ppi_norm_offsets.is_empty() {
            settings.ppi_norm_offsets.iter().map(|&(x, y)| Position::new(x, y)).collect()
        } else if !settings.manual_offsets.is_empty() {
            manual_layout(&normalized, &settings.manual_offsets)?
        } else {
            layout::auto_offsets(&layout::guess_columns(&displays), &normalized)
        };

        for (entry, offset) in normalized.iter_mut().zip(offsets) {
            entry.ppi_norm_offset = offset;
        }

        Ok(Self {
            detected,
            displays,
            normalized,
            max_ppi: normalization.max_ppi,
            ppi_corrected: normalization.ppi_corrected,
            settings,
        })
    }

    /// Returns a new system with different settings over the same displays.
    ///
    /// # Errors
    ///
    /// See [`DisplaySystem::configure`].
    pub fn reconfigure(&self, settings: GeometrySettings) -> GeometryResult<Self> {
        Self::configure(self.detected.clone(), settings)
    }

    /// Displays as detected, before diagonal overrides.
    #[must_use]
    pub fn detected(&self) -> &[DisplayModel] { &self.detected }

    #[must_use]
    pub fn displays(&self) -> &[DisplayModel] { &self.displays }

    #[must_use]
    pub fn normalized(&self) -> &[NormalizedDisplay] { &self.normalized }

    #[must_use]
    pub fn display(&self, id: DisplayId) -> Option<&DisplayModel> { self.displays.get(id.index()) }

    #[must_use]
    pub fn len(&self) -> usize { self.displays.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.displays.is_empty() }

    #[must_use]
    pub const fn max_ppi(&self) -> f64 { self.max_ppi }

    /// False when density correction is off or was disabled by a fallback.
    #[must_use]
    pub const fn ppi_corrected(&self) -> bool { self.ppi_corrected }

    #[must_use]
    pub const fn settings(&self) -> &GeometrySettings { &self.settings }

    #[must_use]
    pub const fn perspective_enabled(&self) -> bool { self.settings.perspective_enabled }

    #[must_use]
    pub fn default_perspective(&self) -> Option<&str> { self.settings.default_perspective.as_deref() }

    /// Normalized crop regions of every display, starting at `(0, 0)`.
    #[must_use]
    pub fn normalized_crops(&self) -> Vec<DisplayCrop> { layout::crops_from_offsets(&self.normalized) }

    /// Size of the true desktop.
    #[must_use]
    pub fn true_canvas(&self) -> Resolution { layout::final_canvas(&self.displays) }

    /// Current normalized offsets, in the form accepted by [`GeometrySettings`].
    #[must_use]
    pub fn ppi_norm_offsets(&self) -> Vec<(i64, i64)> {
        self.normalized.iter().map(|entry| (entry.ppi_norm_offset.x, entry.ppi_norm_offset.y)).collect()
    }
}

/// Places displays side by side, shifted by manual offsets plus accumulated right bezels.
fn manual_layout(
    normalized: &[NormalizedDisplay],
    manual_offsets: &[(i64, i64)],
) -> GeometryResult<Vec<Position>> {
    let right_bezels: Vec<_> = normalized.iter().map(|entry| entry.ppi_norm_bezels.right).collect();
    let bezel_offsets = layout::accumulate_bezels(&right_bezels);

    let offsets: Vec<_> = bezel_offsets
        .iter()
        .enumerate()
        .map(|(index, bezel)| {
            let (x, y) = manual_offsets.get(index).copied().unwrap_or_default();
            Position::new(x + bezel, y)
        })
        .collect();

    let resolutions: Vec<_> = normalized.iter().map(|entry| entry.ppi_norm_resolution).collect();
    let crops = layout::compute_crop_tuples(&resolutions, &offsets)?;
    Ok(crops.into_iter().map(|crop| Position::new(crop.left, crop.top)).collect())
}

/// Process-wide holder of the current [`DisplaySystem`].
///
/// Readers get an `Arc` snapshot; writers swap in a whole new system.
#[derive(Debug)]
pub struct SharedDisplaySystem {
    current: RwLock<Arc<DisplaySystem>>,
}

impl SharedDisplaySystem {
    #[must_use]
    pub fn new(system: DisplaySystem) -> Self { Self { current: RwLock::new(Arc::new(system)) } }

    /// Returns the current system. The snapshot never changes underneath the caller.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DisplaySystem> { Arc::clone(&self.current.read()) }

    /// Publishes a new system and returns the previous one.
    pub fn replace(&self, system: DisplaySystem) -> Arc<DisplaySystem> {
        std::mem::replace(&mut *self.current.write(), Arc::new(system))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::layout::CropRegion;
    use crate::display::model::PhysicalSize;

    fn display(id: usize, resolution: (u32, u32), offset: (i64, i64), diagonal: f64) -> DisplayModel {
        let resolution = Resolution::new(resolution.0, resolution.1);
        DisplayModel::new(
            DisplayId(id),
            format!("display-{id}"),
            resolution,
            Position::new(offset.0, offset.1),
            Some(PhysicalSize::from_diagonal_inches(diagonal, resolution)),
        )
    }

    fn twin_24() -> Vec<DisplayModel> {
        vec![display(0, (1920, 1080), (0, 0), 24.0), display(1, (1920, 1080), (1920, 0), 24.0)]
    }

    // ========================================================================
    // SpanGroups tests
    // ========================================================================

    #[test]
    fn test_single_group_covers_all_displays() {
        let groups = SpanGroups::single(3);
        assert_eq!(groups.groups(), &[vec![DisplayId(0), DisplayId(1), DisplayId(2)]]);
    }

    #[test]
    fn test_span_groups_partition_every_display_once() {
        let groups = SpanGroups::new(&[vec![0, 2, 2], vec![1]], 3).unwrap();
        let mut seen: Vec<_> = groups.groups().iter().flatten().copied().collect();
        seen.sort();
        assert_eq!(seen, vec![DisplayId(0), DisplayId(1), DisplayId(2)]);
        assert_eq!(groups.group_of(DisplayId(1)), Some(1));
    }

    #[test]
    fn test_span_groups_reject_duplicates_across_groups() {
        let result = SpanGroups::new(&[vec![0, 1], vec![1]], 2);
        assert!(matches!(result, Err(GeometryError::InvalidSpanGroups(_))));
    }

    #[test]
    fn test_span_groups_reject_missing_display() {
        let result = SpanGroups::new(&[vec![0]], 2);
        assert!(matches!(result, Err(GeometryError::InvalidSpanGroups(_))));
    }

    #[test]
    fn test_span_groups_reject_out_of_range() {
        let result = SpanGroups::new(&[vec![0, 1, 7]], 2);
        assert!(matches!(result, Err(GeometryError::InvalidSpanGroups(_))));
    }

    #[test]
    fn test_empty_partition_is_a_single_group() {
        assert_eq!(SpanGroups::new(&[], 2).unwrap(), SpanGroups::single(2));
    }

    #[test]
    fn test_span_mode_serde() {
        let mode: SpanMode = serde_json::from_str("\"multi\"").unwrap();
        assert_eq!(mode, SpanMode::Multi);
        assert_eq!(SpanMode::Advanced.to_string(), "advanced");
    }

    // ========================================================================
    // DisplaySystem tests
    // ========================================================================

    #[test]
    fn test_two_equal_displays_layout() {
        let system = DisplaySystem::new(twin_24()).unwrap();
        let crops = system.normalized_crops();

        assert_eq!(crops[0].region, CropRegion::new(0, 0, 1920, 1080));
        assert_eq!(crops[1].region, CropRegion::new(1920, 0, 3840, 1080));
        assert_eq!(system.true_canvas(), Resolution::new(3840, 1080));
        for entry in system.normalized() {
            assert_eq!(entry.ppi_norm_resolution, Resolution::new(1920, 1080));
        }
    }

    #[test]
    fn test_diagonal_override_rescales() {
        let settings = GeometrySettings {
            diagonal_inches: vec![None, Some(12.0)],
            ..GeometrySettings::default()
        };
        let system = DisplaySystem::configure(twin_24(), settings).unwrap();
        assert_eq!(system.normalized()[0].ppi_norm_resolution, Resolution::new(3840, 2160));
        assert_eq!(system.normalized()[1].ppi_norm_resolution, Resolution::new(1920, 1080));
        assert_eq!(system.true_canvas(), Resolution::new(3840, 1080));
    }

    #[test]
    fn test_bezels_separate_displays() {
        let settings = GeometrySettings {
            bezels_mm: vec![(10.0, 0.0), (10.0, 0.0)],
            ..GeometrySettings::default()
        };
        let system = DisplaySystem::configure(twin_24(), settings).unwrap();
        let crops = system.normalized_crops();
        let gap = crops[1].region.left - crops[0].region.right;
        let expected = (10.0 * system.max_ppi() / 25.4).round() as i64;
        assert_eq!(gap, expected);
        assert!(gap > 0);
    }

    #[test]
    fn test_manual_offsets_use_crop_tuples() {
        let settings = GeometrySettings {
            manual_offsets: vec![(0, 0), (100, -40)],
            bezels_mm: vec![(0.0, 0.0), (0.0, 0.0)],
            ..GeometrySettings::default()
        };
        let system = DisplaySystem::configure(twin_24(), settings).unwrap();
        let crops = system.normalized_crops();
        assert_eq!(crops[0].region, CropRegion::new(0, 40, 1920, 1120));
        assert_eq!(crops[1].region, CropRegion::new(2020, 0, 3940, 1080));
    }

    #[test]
    fn test_explicit_offsets_win() {
        let settings = GeometrySettings {
            ppi_norm_offsets: vec![(0, 200), (2000, 0)],
            manual_offsets: vec![(0, 0), (50, 0)],
            ..GeometrySettings::default()
        };
        let system = DisplaySystem::configure(twin_24(), settings).unwrap();
        let crops = system.normalized_crops();
        assert_eq!(crops[0].region, CropRegion::new(0, 200, 1920, 1280));
        assert_eq!(crops[1].region, CropRegion::new(2000, 0, 3920, 1080));
    }

    #[test]
    fn test_settings_length_mismatch_is_rejected() {
        let settings = GeometrySettings {
            bezels_mm: vec![(1.0, 1.0)],
            ..GeometrySettings::default()
        };
        assert!(matches!(
            DisplaySystem::configure(twin_24(), settings),
            Err(GeometryError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_display_set_is_rejected() {
        assert_eq!(DisplaySystem::new(Vec::new()), Err(GeometryError::NoDisplays));
    }

    #[test]
    fn test_reconfigure_drops_old_diagonal_override() {
        let settings = GeometrySettings {
            diagonal_inches: vec![None, Some(12.0)],
            ..GeometrySettings::default()
        };
        let system = DisplaySystem::configure(twin_24(), settings).unwrap();
        let plain = system.reconfigure(GeometrySettings::default()).unwrap();
        assert_eq!(plain.normalized()[0].ppi_norm_resolution, Resolution::new(1920, 1080));
        assert_eq!(plain.displays()[1], twin_24()[1]);
    }

    // ========================================================================
    // SharedDisplaySystem tests
    // ========================================================================

    #[test]
    fn test_snapshot_survives_replace() {
        let shared = SharedDisplaySystem::new(DisplaySystem::new(twin_24()).unwrap());
        let before = shared.snapshot();

        let settings = GeometrySettings {
            diagonal_inches: vec![None, Some(12.0)],
            ..GeometrySettings::default()
        };
        shared.replace(before.reconfigure(settings).unwrap());

        assert_eq!(before.normalized()[0].ppi_norm_resolution, Resolution::new(1920, 1080));
        assert_eq!(shared.snapshot().normalized()[0].ppi_norm_resolution, Resolution::new(3840, 2160));
    }
}
