//! Perspective correction for swiveled and tilted displays.
//!
//! Each display is modelled as a rectangle in a viewer-centred, right-handed
//! coordinate system: the viewer sits at the origin, `x` grows to the right,
//! `y` grows downwards (matching image rows) and `z` grows into the scene. With
//! no rotation every display lies in the reference plane `z = depth`.
//!
//! A rotated display is projected back onto that plane along rays through the
//! viewer. The resulting quadrilateral is where the source image has to be
//! sampled so that, seen from the viewer, the picture continues undistorted
//! across the rotated panel. [`ProjectiveCoeffs`] encode the map from the
//! display's normalized crop rectangle onto that quadrilateral.
//!
//! # Angle conventions
//!
//! - A positive swivel turns the screen to face left: rotating about the
//!   left edge brings the right edge towards the viewer, rotating about the
//!   right edge pushes the left edge away.
//! - A positive tilt turns the screen to face upwards, bringing the bottom
//!   edge towards the viewer.
//!
//! Both rotations use world-fixed axes derived from the unrotated rectangle;
//! the swivel is applied first.

use glam::{DMat3, DMat4, DVec3, DVec4};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::{GeometryError, GeometryResult};
use super::layout::{CropRegion, DisplayCrop};
use super::model::{DisplayId, Resolution};

/// Axis lengths below this are treated as degenerate.
const DEGENERATE_AXIS: f64 = 1e-9;

/// Pivot magnitudes below this make the coefficient system singular.
const SINGULAR_PIVOT: f64 = 1e-10;

/// Rotated points closer than this to the viewer plane cannot be projected.
const MIN_PROJECTION_DEPTH: f64 = 1e-6;

/// Which vertical edge a display swivels about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SwivelAxis {
    /// No swivel.
    #[default]
    None,
    /// Swivel about the left edge.
    Left,
    /// Swivel about the right edge.
    Right,
}

/// Rotation about a vertical edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Swivel {
    /// Edge the display pivots on.
    pub axis: SwivelAxis,
    /// Angle in degrees. Positive turns the screen to face left.
    pub angle: f64,
    /// Shift of the pivot line along `x`, in normalized pixels.
    pub lateral_offset: f64,
    /// Shift of the pivot line along `z`, in normalized pixels.
    pub depth_offset: f64,
}

/// Rotation about the horizontal line through the display center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Tilt {
    /// Angle in degrees. Positive turns the screen to face upwards.
    pub angle: f64,
    /// Shift of the pivot line along `y`, in normalized pixels.
    pub vertical_offset: f64,
    /// Shift of the pivot line along `z`, in normalized pixels.
    pub depth_offset: f64,
}

/// Viewer position relative to the central display's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ViewerOffset {
    pub lateral: f64,
    pub vertical: f64,
    /// Distance from the viewer to the reference plane. Must be positive.
    pub depth: f64,
}

impl Default for ViewerOffset {
    fn default() -> Self { Self { lateral: 0.0, vertical: 0.0, depth: 1.0 } }
}

/// Viewer position and per-display rotations for one named perspective.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PerspectiveProfile {
    /// The display the viewer faces directly.
    pub central_display: DisplayId,
    pub viewer: ViewerOffset,
    /// One entry per display, indexed by display id.
    pub swivels: Vec<Swivel>,
    /// One entry per display, indexed by display id.
    pub tilts: Vec<Tilt>,
}

impl PerspectiveProfile {
    /// A profile with no rotation on any display.
    #[must_use]
    pub fn flat(display_count: usize, central_display: DisplayId, depth: f64) -> Self {
        Self {
            central_display,
            viewer: ViewerOffset { depth, ..ViewerOffset::default() },
            swivels: vec![Swivel::default(); display_count],
            tilts: vec![Tilt::default(); display_count],
        }
    }

    /// Checks the profile against a display set of `display_count` displays.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive viewer depth, rotation arrays that
    /// do not match the display count, or an unknown central display.
    pub fn validate(&self, display_count: usize) -> GeometryResult<()> {
        validate_depth(self.viewer.depth)?;

        if self.swivels.len() != display_count || self.tilts.len() != display_count {
            return Err(GeometryError::RotationCountMismatch {
                displays: display_count,
                swivels: self.swivels.len(),
                tilts: self.tilts.len(),
            });
        }

        if self.central_display.index() >= display_count {
            return Err(GeometryError::CentralDisplayOutOfRange {
                index: self.central_display.index(),
                count: display_count,
            });
        }

        Ok(())
    }

    /// True if no display is swiveled or tilted.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.swivels.iter().all(|s| s.axis == SwivelAxis::None || s.angle.abs() < f64::EPSILON)
            && self.tilts.iter().all(|t| t.angle.abs() < f64::EPSILON)
    }
}

fn validate_depth(depth: f64) -> GeometryResult<()> {
    if depth.is_finite() && depth > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidViewerDepth(depth))
    }
}

/// A quadrilateral with corners ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quad {
    pub corners: [(f64, f64); 4],
}

impl Quad {
    /// The four corners of a crop region.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_region(region: &CropRegion) -> Self {
        let (l, t, r, b) = (
            region.left as f64,
            region.top as f64,
            region.right as f64,
            region.bottom as f64,
        );
        Self { corners: [(l, t), (r, t), (r, b), (l, b)] }
    }

    /// Returns the smallest `(min_x, min_y, max_x, max_y)` box around the corners.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }

    /// Returns the integer region covering the quad.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn covering_region(&self) -> CropRegion {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        CropRegion::new(
            snap(min_x).floor() as i64,
            snap(min_y).floor() as i64,
            snap(max_x).ceil() as i64,
            snap(max_y).ceil() as i64,
        )
    }

    /// Length of the left edge.
    #[must_use]
    pub fn left_height(&self) -> f64 { distance(self.corners[0], self.corners[3]) }

    /// Length of the right edge.
    #[must_use]
    pub fn right_height(&self) -> f64 { distance(self.corners[1], self.corners[2]) }

    fn translate(&self, dx: f64, dy: f64) -> Self {
        Self { corners: self.corners.map(|(x, y)| (x + dx, y + dy)) }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 { (a.0 - b.0).hypot(a.1 - b.1) }

/// Rounds away floating-point noise so exact integers stay exact.
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 { rounded } else { value }
}

/// The eight coefficients of a planar projective transform.
///
/// A point `(x, y)` maps to
/// `((a x + b y + c) / (g x + h y + 1), (d x + e y + f) / (g x + h y + 1))`,
/// stored as `[a, b, c, d, e, f, g, h]`. This is the layout image libraries
/// use for inverse-mapped perspective warps: `(x, y)` is an output pixel and
/// the result is where to sample the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectiveCoeffs(pub [f64; 8]);

impl ProjectiveCoeffs {
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);

    /// Maps a point, or returns `None` where the transform is undefined.
    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let [a, b, c, d, e, f, g, h] = self.0;
        let w = g.mul_add(x, h * y) + 1.0;
        if !w.is_finite() || w.abs() < f64::EPSILON {
            return None;
        }
        Some((a.mul_add(x, b.mul_add(y, c)) / w, d.mul_add(x, e.mul_add(y, f)) / w))
    }

    /// True if every coefficient is within `tolerance` of the identity map.
    #[must_use]
    pub fn is_identity(&self, tolerance: f64) -> bool {
        self.0.iter().zip(Self::IDENTITY.0).all(|(value, id)| (value - id).abs() <= tolerance)
    }
}

/// Solves the projective map taking each `target` corner to its `source` corner.
///
/// Both arrays must use the same corner order. Each correspondence
/// contributes the two rows
/// `[tx, ty, 1, 0, 0, 0, -sx tx, -sx ty] = sx` and
/// `[0, 0, 0, tx, ty, 1, -sy tx, -sy ty] = sy`.
///
/// # Errors
///
/// Returns [`GeometryError::SingularTransform`] when the corners are
/// collinear or otherwise degenerate.
pub fn solve_coefficients(
    target: [(f64, f64); 4],
    source: [(f64, f64); 4],
) -> GeometryResult<ProjectiveCoeffs> {
    let mut a = [[0.0_f64; 8]; 8];
    let mut b = [0.0_f64; 8];

    for (i, (&(tx, ty), &(sx, sy))) in target.iter().zip(&source).enumerate() {
        a[2 * i] = [tx, ty, 1.0, 0.0, 0.0, 0.0, -sx * tx, -sx * ty];
        b[2 * i] = sx;
        a[2 * i + 1] = [0.0, 0.0, 0.0, tx, ty, 1.0, -sy * tx, -sy * ty];
        b[2 * i + 1] = sy;
    }

    solve_8x8(a, b).map(ProjectiveCoeffs).ok_or(GeometryError::SingularTransform)
}

/// Gauss-Jordan elimination with partial pivoting.
fn solve_8x8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot_row = (col..8).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        let pivot = a[pivot_row][col];
        if !pivot.is_finite() || pivot.abs() < SINGULAR_PIVOT {
            return None;
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let inv_pivot = 1.0 / a[col][col];
        for value in &mut a[col][col..] {
            *value *= inv_pivot;
        }
        b[col] *= inv_pivot;

        let pivot_values = a[col];
        let pivot_rhs = b[col];
        for row in (0..8).filter(|&row| row != col) {
            let factor = a[row][col];
            if factor.abs() < f64::MIN_POSITIVE {
                continue;
            }
            for (value, pivot_value) in a[row][col..].iter_mut().zip(&pivot_values[col..]) {
                *value -= factor * pivot_value;
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    b.iter().all(|v| v.is_finite()).then_some(b)
}

/// Rodrigues rotation matrix for `angle` radians about `axis` (right-hand rule).
///
/// Returns `None` when the axis has no usable direction.
#[must_use]
pub fn rotation_matrix(axis: DVec3, angle: f64) -> Option<DMat3> {
    let length = axis.length();
    if !length.is_finite() || length < DEGENERATE_AXIS {
        return None;
    }

    let k = axis / length;
    let (sin, cos) = angle.sin_cos();
    let cross = DMat3::from_cols(
        DVec3::new(0.0, k.z, -k.y),
        DVec3::new(-k.z, 0.0, k.x),
        DVec3::new(k.y, -k.x, 0.0),
    );
    let outer = DMat3::from_cols(k * k.x, k * k.y, k * k.z);

    Some(DMat3::IDENTITY * cos + cross * sin + outer * (1.0 - cos))
}

/// Homogeneous transform rotating `angle` radians about the line through
/// `point` along `axis`.
///
/// A degenerate axis yields the identity.
#[must_use]
pub fn rotation_about_line(point: DVec3, axis: DVec3, angle: f64) -> DMat4 {
    let Some(rotation) = rotation_matrix(axis, angle) else {
        tracing::warn!(?axis, "degenerate rotation axis, leaving display unrotated");
        return DMat4::IDENTITY;
    };

    DMat4::from_translation(point) * DMat4::from_mat3(rotation) * DMat4::from_translation(-point)
}

/// A display after perspective projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedDisplay {
    pub id: DisplayId,
    /// The display's rectangle in normalized crop space.
    pub target: CropRegion,
    /// The back-projected rectangle in working-canvas space.
    pub quad: Quad,
    /// Integer bounding box of `quad`.
    pub crop: CropRegion,
    /// Maps points of `target` onto `quad`.
    pub coeffs: ProjectiveCoeffs,
}

/// Output of [`project`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub displays: Vec<ProjectedDisplay>,
    /// Size of the canvas holding every quad.
    pub working_canvas: Resolution,
}

impl Projection {
    /// Returns the projection for one display.
    #[must_use]
    pub fn get(&self, id: DisplayId) -> Option<&ProjectedDisplay> {
        self.displays.iter().find(|display| display.id == id)
    }

    /// True if the working canvas exceeds `budget` pixels on either axis.
    #[must_use]
    pub const fn exceeds_budget(&self, budget: u32) -> bool {
        self.working_canvas.width > budget || self.working_canvas.height > budget
    }
}

/// Projects rotated displays back onto the reference plane.
///
/// `crops` are the displays' normalized crop regions; they must include the
/// profile's central display. Quads are translated so that their union starts
/// at `(0, 0)`.
///
/// # Errors
///
/// Returns a configuration error before any trigonometry if the viewer depth
/// is not positive, a display has no rotation entry, or the central display is
/// missing from `crops`. Returns [`GeometryError::BehindViewer`] if a rotation
/// swings a corner behind the viewer and [`GeometryError::SingularTransform`]
/// if a display's coefficients cannot be solved.
pub fn project(crops: &[DisplayCrop], profile: &PerspectiveProfile) -> GeometryResult<Projection> {
    validate_depth(profile.viewer.depth)?;

    for crop in crops {
        let index = crop.id.index();
        if index >= profile.swivels.len() || index >= profile.tilts.len() {
            return Err(GeometryError::RotationCountMismatch {
                displays: index + 1,
                swivels: profile.swivels.len(),
                tilts: profile.tilts.len(),
            });
        }
    }

    let central = crops
        .iter()
        .find(|crop| crop.id == profile.central_display)
        .ok_or(GeometryError::CentralDisplayOutOfRange {
            index: profile.central_display.index(),
            count: crops.len(),
        })?;

    let viewer = profile.viewer;
    let (central_x, central_y) = central.region.center();
    let plane_point = DVec3::new(-viewer.lateral, -viewer.vertical, viewer.depth);

    let mut quads = Vec::with_capacity(crops.len());
    for crop in crops {
        let (center_x, center_y) = crop.region.center();
        let center = DVec3::new(
            center_x - central_x - viewer.lateral,
            center_y - central_y - viewer.vertical,
            viewer.depth,
        );
        let corners = rectangle_corners(center, &crop.region);
        let transform = display_transform(
            &corners,
            center,
            &profile.swivels[crop.id.index()],
            &profile.tilts[crop.id.index()],
        );

        let mut quad = [(0.0, 0.0); 4];
        for (slot, corner) in quad.iter_mut().zip(corners) {
            let rotated = transform * corner.extend(1.0);
            let on_plane =
                back_project(rotated, plane_point).ok_or(GeometryError::BehindViewer(crop.id))?;
            let relative = on_plane - plane_point;
            *slot = (relative.dot(DVec3::X) + central_x, relative.dot(DVec3::Y) + central_y);
        }
        quads.push(Quad { corners: quad });
    }

    let (min_x, min_y) = quads.iter().fold((f64::INFINITY, f64::INFINITY), |(x, y), quad| {
        let (qx, qy, _, _) = quad.bounds();
        (x.min(qx), y.min(qy))
    });

    let mut displays = Vec::with_capacity(crops.len());
    for (crop, quad) in crops.iter().zip(quads) {
        let quad = quad.translate(-snap(min_x), -snap(min_y));
        let target = Quad::from_region(&crop.region);
        let coeffs = solve_coefficients(target.corners, quad.corners)?;
        displays.push(ProjectedDisplay {
            id: crop.id,
            target: crop.region,
            quad,
            crop: quad.covering_region(),
            coeffs,
        });
    }

    let covering: Vec<_> = displays.iter().map(|display| display.crop).collect();
    let working_canvas = super::layout::working_canvas(&covering);

    Ok(Projection { displays, working_canvas })
}

/// Corners of a display rectangle centered at `center`, in TL, TR, BR, BL order.
#[allow(clippy::cast_precision_loss)]
fn rectangle_corners(center: DVec3, region: &CropRegion) -> [DVec3; 4] {
    let half_w = region.width() as f64 / 2.0;
    let half_h = region.height() as f64 / 2.0;
    [
        center + DVec3::new(-half_w, -half_h, 0.0),
        center + DVec3::new(half_w, -half_h, 0.0),
        center + DVec3::new(half_w, half_h, 0.0),
        center + DVec3::new(-half_w, half_h, 0.0),
    ]
}

/// Combined swivel-then-tilt transform for one display.
fn display_transform(corners: &[DVec3; 4], center: DVec3, swivel: &Swivel, tilt: &Tilt) -> DMat4 {
    let [top_left, top_right, bottom_right, bottom_left] = *corners;

    let swivel_transform = match swivel.axis {
        SwivelAxis::None => DMat4::IDENTITY,
        SwivelAxis::Left | SwivelAxis::Right => {
            let (top, bottom) = if swivel.axis == SwivelAxis::Left {
                (top_left, bottom_left)
            } else {
                (top_right, bottom_right)
            };
            let side_mid = (top + bottom) / 2.0;
            let pivot = side_mid + DVec3::new(swivel.lateral_offset, 0.0, swivel.depth_offset);
            rotation_about_line(pivot, bottom - side_mid, swivel.angle.to_radians())
        }
    };

    let left_mid = (top_left + bottom_left) / 2.0;
    let tilt_pivot = center + DVec3::new(0.0, tilt.vertical_offset, tilt.depth_offset);
    let tilt_transform = rotation_about_line(tilt_pivot, left_mid - center, tilt.angle.to_radians());

    tilt_transform * swivel_transform
}

/// Intersects the ray from the viewer through `point` with the reference plane.
///
/// The homogeneous coordinate is rescaled so the point's projection onto the
/// plane normal equals the plane's offset.
fn back_project(point: DVec4, plane_point: DVec3) -> Option<DVec3> {
    let normal = DVec3::Z;
    let plane_offset = normal.dot(plane_point);
    let along_normal = normal.dot(point.truncate()) / point.w;
    if !along_normal.is_finite() || along_normal < MIN_PROJECTION_DEPTH {
        return None;
    }

    let scaled = DVec4::from((point.truncate(), point.w * along_normal / plane_offset));
    Some(scaled.truncate() / scaled.w)
}
