//! Layout solving: bezels, crop regions and canvas sizes.
//!
//! Two ways of placing displays in normalized space live here:
//!
//! - [`auto_offsets`] guesses a column layout from digital offsets and is what
//!   a fresh display set starts with.
//! - [`compute_crop_tuples`] places displays side by side, shifted by
//!   user-supplied manual offsets, and is used when a profile carries them.
//!
//! Either way the result is a set of crop regions whose union starts at
//! exactly `(0, 0)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::density::NormalizedDisplay;
use super::error::{GeometryError, GeometryResult};
use super::model::{DisplayId, DisplayModel, Position, Resolution};

/// A `(left, top, right, bottom)` rectangle in some pixel space.
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CropRegion {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl CropRegion {
    #[must_use]
    pub const fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Creates a region from its top-left corner and size.
    #[must_use]
    pub fn from_origin_size(origin: Position, size: Resolution) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + i64::from(size.width),
            origin.y + i64::from(size.height),
        )
    }

    #[must_use]
    pub const fn width(&self) -> i64 { self.right - self.left }

    #[must_use]
    pub const fn height(&self) -> i64 { self.bottom - self.top }

    /// Returns the exact (possibly half-pixel) center.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.left + self.right) as f64 / 2.0,
            (self.top + self.bottom) as f64 / 2.0,
        )
    }

    /// Returns the region's size, clamping inverted regions to zero.
    #[must_use]
    pub fn size(&self) -> Resolution {
        Resolution::new(
            u32::try_from(self.width().max(0)).unwrap_or(u32::MAX),
            u32::try_from(self.height().max(0)).unwrap_or(u32::MAX),
        )
    }

    /// True when the region has positive width and height.
    #[must_use]
    pub const fn is_valid(&self) -> bool { self.right > self.left && self.bottom > self.top }

    /// Returns true if the region lies within a `width` x `height` canvas.
    #[must_use]
    pub fn fits_within(&self, canvas: Resolution) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right <= i64::from(canvas.width)
            && self.bottom <= i64::from(canvas.height)
    }

    /// Returns the region moved by `(dx, dy)`.
    #[must_use]
    pub const fn translate(&self, dx: i64, dy: i64) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Returns the smallest region containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.left, self.top, self.right, self.bottom)
    }
}

/// A crop region tagged with the display it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayCrop {
    pub id: DisplayId,
    pub region: CropRegion,
}

/// Returns the bounding box of all regions, or `None` for an empty set.
#[must_use]
pub fn bounding_box<'a>(regions: impl IntoIterator<Item = &'a CropRegion>) -> Option<CropRegion> {
    regions.into_iter().fold(None, |acc, region| {
        Some(acc.map_or(*region, |bbox: CropRegion| bbox.union(region)))
    })
}

/// Shifts all regions so the minimum left and the minimum top are exactly zero.
pub fn translate_to_origin(regions: &mut [CropRegion]) {
    let Some(bbox) = bounding_box(regions.iter()) else {
        return;
    };

    for region in regions.iter_mut() {
        *region = region.translate(-bbox.left, -bbox.top);
    }
}

/// Size of the canvas that holds every region, measured from the origin.
#[must_use]
pub fn working_canvas<'a>(regions: impl IntoIterator<Item = &'a CropRegion>) -> Resolution {
    bounding_box(regions).map_or_else(Resolution::default, |bbox| {
        CropRegion::new(0, 0, bbox.right, bbox.bottom).size()
    })
}

/// Size of the true desktop: the union of every display's resolution at its digital offset.
#[must_use]
pub fn final_canvas(displays: &[DisplayModel]) -> Resolution {
    let regions: Vec<_> = displays.iter().map(true_region).collect();
    working_canvas(&regions)
}

/// A display's region in true (device pixel) desktop coordinates.
#[must_use]
pub fn true_region(display: &DisplayModel) -> CropRegion {
    CropRegion::from_origin_size(display.digital_offset(), display.resolution())
}

// ============================================================================
// Bezels
// ============================================================================

/// Returns each display's cumulative horizontal bezel offset.
///
/// The first display is never shifted; display `k` is shifted by the sum of
/// the right-edge bezels of displays `0..k`, since a bezel is the material
/// between a display and its right neighbour.
#[must_use]
pub fn accumulate_bezels(right_bezels: &[i64]) -> Vec<i64> {
    right_bezels
        .iter()
        .scan(0_i64, |sum, bezel| {
            let offset = *sum;
            *sum += bezel;
            Some(offset)
        })
        .collect()
}

// ============================================================================
// Manual offsets
// ============================================================================

/// Places displays side by side and shifts each by its manual offset.
///
/// Display `i` is centered at `(sum of previous widths + offset.x + width / 2,
/// first height / 2 + offset.y)`. The resulting regions are translated so the
/// union starts at `(0, 0)`.
///
/// # Errors
///
/// Returns [`GeometryError::LengthMismatch`] if the two slices differ in length.
pub fn compute_crop_tuples(
    resolutions: &[Resolution],
    manual_offsets: &[Position],
) -> GeometryResult<Vec<CropRegion>> {
    if resolutions.len() != manual_offsets.len() {
        return Err(GeometryError::LengthMismatch {
            what: "manual offsets",
            expected: resolutions.len(),
            actual: manual_offsets.len(),
        });
    }

    let Some(first) = resolutions.first() else {
        return Ok(Vec::new());
    };
    let anchor_height = half(first.height);

    let mut cumulative_width = 0_i64;
    let mut regions: Vec<_> = resolutions
        .iter()
        .zip(manual_offsets)
        .map(|(resolution, offset)| {
            let center_x = cumulative_width + offset.x + half(resolution.width);
            let center_y = anchor_height + offset.y;
            cumulative_width += i64::from(resolution.width);

            let left = center_x - half(resolution.width);
            let top = center_y - half(resolution.height);
            CropRegion::from_origin_size(Position::new(left, top), *resolution)
        })
        .collect();

    translate_to_origin(&mut regions);
    Ok(regions)
}

#[allow(clippy::cast_possible_truncation)]
fn half(length: u32) -> i64 { (f64::from(length) / 2.0).round() as i64 }

// ============================================================================
// Automatic layout
// ============================================================================

/// Groups displays into physical columns based on their digital offsets.
///
/// A display joins the current column when its horizontal center falls inside
/// the horizontal span of the last display placed there. Columns are ordered
/// left to right and each column top to bottom.
#[must_use]
pub fn guess_columns(displays: &[DisplayModel]) -> Vec<Vec<DisplayId>> {
    let mut ordered: Vec<&DisplayModel> = displays.iter().collect();
    ordered.sort_by_key(|d| (d.digital_offset().x, d.digital_offset().y));

    // Doubled coordinates keep the center exact; i128 holds them for any offset.
    let mut columns: Vec<Vec<&DisplayModel>> = Vec::new();
    for display in ordered {
        let center_x =
            i128::from(display.digital_offset().x) * 2 + i128::from(display.resolution().width);
        let joins_current = columns.last().and_then(|column| column.last()).is_some_and(|last| {
            let left = i128::from(last.digital_offset().x) * 2;
            let right = left + i128::from(last.resolution().width) * 2;
            (left..right).contains(&center_x)
        });

        match columns.last_mut() {
            Some(column) if joins_current => column.push(display),
            _ => columns.push(vec![display]),
        }
    }

    for column in &mut columns {
        column.sort_by_key(|d| d.digital_offset().y);
    }
    columns.sort_by_key(|column| column.first().map_or(0, |d| d.digital_offset().x));

    columns
        .into_iter()
        .map(|column| column.into_iter().map(DisplayModel::id).collect())
        .collect()
}

/// Computes default normalized offsets for a column layout.
///
/// Columns are laid out left to right and vertically centered against the
/// tallest column; displays inside a column are stacked top to bottom and
/// horizontally centered against the widest member. Bezels count towards
/// each display's footprint. The returned offsets are indexed by
/// [`DisplayId`].
#[must_use]
pub fn auto_offsets(columns: &[Vec<DisplayId>], normalized: &[NormalizedDisplay]) -> Vec<Position> {
    let footprint = |id: DisplayId| {
        normalized.get(id.index()).map_or((0, 0), |entry| {
            (
                i64::from(entry.ppi_norm_resolution.width) + entry.ppi_norm_bezels.right,
                i64::from(entry.ppi_norm_resolution.height) + entry.ppi_norm_bezels.bottom,
            )
        })
    };

    let column_sizes: Vec<(i64, i64)> = columns
        .iter()
        .map(|column| {
            column.iter().fold((0, 0), |(width, height), id| {
                let (w, h) = footprint(*id);
                (width.max(w), height + h)
            })
        })
        .collect();
    let tallest = column_sizes.iter().map(|(_, h)| *h).max().unwrap_or(0);

    let mut offsets = vec![Position::default(); normalized.len()];
    let mut column_x = 0;
    for (column, (column_width, column_height)) in columns.iter().zip(&column_sizes) {
        let mut y = (tallest - column_height) / 2;
        for id in column {
            let (w, h) = footprint(*id);
            if let Some(slot) = offsets.get_mut(id.index()) {
                *slot = Position::new(column_x + (column_width - w) / 2, y);
            }
            y += h;
        }
        column_x += column_width;
    }

    offsets
}

/// Turns normalized offsets into crop regions whose union starts at `(0, 0)`.
#[must_use]
pub fn crops_from_offsets(normalized: &[NormalizedDisplay]) -> Vec<DisplayCrop> {
    let mut regions: Vec<_> = normalized
        .iter()
        .map(|entry| CropRegion::from_origin_size(entry.ppi_norm_offset, entry.ppi_norm_resolution))
        .collect();
    translate_to_origin(&mut regions);

    normalized
        .iter()
        .zip(regions)
        .map(|(entry, region)| DisplayCrop { id: entry.id, region })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::density::BezelPx;
    use crate::display::model::PhysicalSize;

    fn display(id: usize, resolution: (u32, u32), offset: (i64, i64)) -> DisplayModel {
        let resolution = Resolution::new(resolution.0, resolution.1);
        DisplayModel::new(
            DisplayId(id),
            "",
            resolution,
            Position::new(offset.0, offset.1),
            Some(PhysicalSize::from_diagonal_inches(24.0, resolution)),
        )
    }

    fn normalized(id: usize, resolution: (u32, u32), bezels: (i64, i64)) -> NormalizedDisplay {
        NormalizedDisplay {
            id: DisplayId(id),
            ppi_norm_resolution: Resolution::new(resolution.0, resolution.1),
            ppi_norm_offset: Position::default(),
            ppi_norm_bezels: BezelPx { right: bezels.0, bottom: bezels.1 },
        }
    }

    // ========================================================================
    // CropRegion tests
    // ========================================================================

    #[test]
    fn test_crop_region_geometry() {
        let region = CropRegion::new(10, 20, 110, 70);
        assert_eq!(region.width(), 100);
        assert_eq!(region.height(), 50);
        assert_eq!(region.center(), (60.0, 45.0));
        assert!(region.is_valid());
        assert!(region.fits_within(Resolution::new(110, 70)));
        assert!(!region.fits_within(Resolution::new(109, 70)));
    }

    #[test]
    fn test_translate_to_origin_moves_negative_regions() {
        let mut regions = vec![CropRegion::new(-50, 10, 50, 110), CropRegion::new(50, -20, 150, 80)];
        translate_to_origin(&mut regions);
        assert_eq!(regions[0], CropRegion::new(0, 30, 100, 130));
        assert_eq!(regions[1], CropRegion::new(100, 0, 200, 100));
    }

    #[test]
    fn test_translate_to_origin_keeps_regions_already_at_zero() {
        let mut regions = vec![CropRegion::new(0, 0, 10, 10), CropRegion::new(10, 5, 20, 15)];
        translate_to_origin(&mut regions);
        assert_eq!(regions[0], CropRegion::new(0, 0, 10, 10));
        assert_eq!(regions[1], CropRegion::new(10, 5, 20, 15));
    }

    // ========================================================================
    // Bezel tests
    // ========================================================================

    #[test]
    fn test_first_display_has_no_bezel_offset() {
        assert_eq!(accumulate_bezels(&[30, 30, 30]), vec![0, 30, 60]);
    }

    #[test]
    fn test_bezel_accumulation_is_monotonic() {
        let bezels = vec![25_i64; 6];
        let offsets = accumulate_bezels(&bezels);
        for (k, offset) in offsets.iter().enumerate() {
            assert_eq!(*offset, bezels[..k].iter().sum::<i64>());
        }
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    // ========================================================================
    // compute_crop_tuples tests
    // ========================================================================

    #[test]
    fn test_two_equal_displays_side_by_side() {
        let resolutions = [Resolution::new(1920, 1080), Resolution::new(1920, 1080)];
        let crops = compute_crop_tuples(&resolutions, &[Position::default(); 2]).unwrap();
        assert_eq!(crops, vec![
            CropRegion::new(0, 0, 1920, 1080),
            CropRegion::new(1920, 0, 3840, 1080)
        ]);
        assert_eq!(working_canvas(&crops), Resolution::new(3840, 1080));
    }

    #[test]
    fn test_mixed_heights_are_vertically_centered() {
        let resolutions = [Resolution::new(1920, 1080), Resolution::new(1080, 1920)];
        let crops = compute_crop_tuples(&resolutions, &[Position::default(); 2]).unwrap();
        assert_eq!(crops[0], CropRegion::new(0, 420, 1920, 1500));
        assert_eq!(crops[1], CropRegion::new(1920, 0, 3000, 1920));
    }

    #[test]
    fn test_manual_offsets_shift_regions_and_keep_origin() {
        let resolutions = [Resolution::new(100, 100), Resolution::new(100, 100)];
        let offsets = [Position::new(0, 0), Position::new(20, -30)];
        let crops = compute_crop_tuples(&resolutions, &offsets).unwrap();
        assert_eq!(crops[0], CropRegion::new(0, 30, 100, 130));
        assert_eq!(crops[1], CropRegion::new(120, 0, 220, 100));

        let bbox = bounding_box(&crops).unwrap();
        assert_eq!((bbox.left, bbox.top), (0, 0));
    }

    #[test]
    fn test_bezels_feed_manual_offsets() {
        let resolutions = [Resolution::new(100, 50); 3];
        let offsets: Vec<_> = accumulate_bezels(&[10, 10, 10])
            .into_iter()
            .map(|x| Position::new(x, 0))
            .collect();
        let crops = compute_crop_tuples(&resolutions, &offsets).unwrap();
        let lefts: Vec<_> = crops.iter().map(|c| c.left).collect();
        assert_eq!(lefts, vec![0, 110, 220]);
    }

    #[test]
    fn test_crop_tuples_reject_mismatched_lengths() {
        let result = compute_crop_tuples(&[Resolution::new(10, 10)], &[]);
        assert!(matches!(result, Err(GeometryError::LengthMismatch { .. })));
    }

    #[test]
    fn test_crop_tuples_odd_sizes_keep_exact_dimensions() {
        let resolutions = [Resolution::new(1365, 767), Resolution::new(1023, 769)];
        let crops = compute_crop_tuples(&resolutions, &[Position::default(); 2]).unwrap();
        assert_eq!(crops[0].width(), 1365);
        assert_eq!(crops[1].height(), 769);
        assert_eq!(crops[0].right, crops[1].left);
    }

    // ========================================================================
    // Automatic layout tests
    // ========================================================================

    #[test]
    fn test_guess_columns_row_of_displays() {
        let displays = vec![
            display(0, (1920, 1080), (0, 0)),
            display(1, (1920, 1080), (1920, 0)),
            display(2, (1920, 1080), (3840, 0)),
        ];
        let columns = guess_columns(&displays);
        assert_eq!(columns, vec![vec![DisplayId(0)], vec![DisplayId(1)], vec![DisplayId(2)]]);
    }

    #[test]
    fn test_guess_columns_stacked_displays() {
        let displays = vec![
            display(0, (1920, 1080), (0, 0)),
            display(1, (1920, 1080), (0, 1080)),
            display(2, (2560, 1440), (1920, 0)),
        ];
        let columns = guess_columns(&displays);
        assert_eq!(columns, vec![vec![DisplayId(0), DisplayId(1)], vec![DisplayId(2)]]);
    }

    #[test]
    fn test_guess_columns_extreme_offsets() {
        let far = i64::MAX - 1920;
        let displays = vec![
            display(0, (1920, 1080), (i64::MIN, 0)),
            display(1, (1920, 1080), (far, 0)),
            display(2, (1920, 1080), (far, 1080)),
        ];
        let columns = guess_columns(&displays);
        assert_eq!(columns, vec![vec![DisplayId(0)], vec![DisplayId(1), DisplayId(2)]]);
    }

    #[test]
    fn test_auto_offsets_center_columns_and_members() {
        let columns = vec![vec![DisplayId(0), DisplayId(1)], vec![DisplayId(2)]];
        let entries = vec![
            normalized(0, (1920, 1080), (0, 0)),
            normalized(1, (1280, 1024), (0, 0)),
            normalized(2, (2560, 1440), (0, 0)),
        ];
        let offsets = auto_offsets(&columns, &entries);

        assert_eq!(offsets[0], Position::new(0, 0));
        assert_eq!(offsets[1], Position::new(320, 1080));
        assert_eq!(offsets[2], Position::new(1920, 332));
    }

    #[test]
    fn test_auto_offsets_include_bezels() {
        let columns = vec![vec![DisplayId(0)], vec![DisplayId(1)]];
        let entries = vec![normalized(0, (1920, 1080), (40, 0)), normalized(1, (1920, 1080), (40, 0))];
        let offsets = auto_offsets(&columns, &entries);
        assert_eq!(offsets[1], Position::new(1960, 0));
    }

    #[test]
    fn test_crops_from_offsets_start_at_origin() {
        let mut entries = vec![normalized(0, (100, 100), (0, 0)), normalized(1, (100, 100), (0, 0))];
        entries[0].ppi_norm_offset = Position::new(50, 80);
        entries[1].ppi_norm_offset = Position::new(150, 60);
        let crops = crops_from_offsets(&entries);
        assert_eq!(crops[0].region, CropRegion::new(0, 20, 100, 120));
        assert_eq!(crops[1].region, CropRegion::new(100, 0, 200, 100));
    }

    #[test]
    fn test_final_canvas_is_union_of_true_regions() {
        let displays = vec![display(0, (1920, 1080), (0, 0)), display(1, (2560, 1440), (1920, 0))];
        assert_eq!(final_canvas(&displays), Resolution::new(4480, 1440));
    }
}
