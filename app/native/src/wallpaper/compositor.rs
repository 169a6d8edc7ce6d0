//! Turns source images into one composite wallpaper for the whole desktop.
//!
//! A job runs through these stages:
//!
//! ```text
//! LOAD_SOURCE -> SIZE_WORKING_CANVAS -> TRANSFORM_PER_DISPLAY (perspective only)
//!   -> CROP_PER_DISPLAY -> RESIZE_TO_TRUE_RESOLUTION -> PASTE_TO_FINAL_CANVAS -> COMMIT
//! ```
//!
//! Geometry is planned for every span group before any image is decoded, so
//! an oversized working canvas is caught before heavy allocation. Span groups
//! are then composed in parallel; each owns its working canvas and only reads
//! the shared source decode. A group that fails leaves its displays black and
//! is reported in [`CompositeOutcome::failures`]. `COMMIT` (writing the
//! result) belongs to the caller; see [`super::output`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::processing::{self, ProcessingError};
use crate::display::layout::{self, DisplayCrop};
use crate::display::{
    CropRegion, DisplayId, DisplaySystem, GeometryError, PerspectiveProfile, Position,
    ProjectiveCoeffs, Resolution, SpanGroups, SpanMode,
};

/// Default working-canvas budget in pixels per axis.
pub const DEFAULT_CANVAS_BUDGET: u32 = 12_000;

/// Stages of a compositing job, logged as the job advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    LoadSource,
    SizeWorkingCanvas,
    TransformPerDisplay,
    CropPerDisplay,
    ResizeToTrueResolution,
    PasteToFinalCanvas,
    Commit,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadSource => "LOAD_SOURCE",
            Self::SizeWorkingCanvas => "SIZE_WORKING_CANVAS",
            Self::TransformPerDisplay => "TRANSFORM_PER_DISPLAY",
            Self::CropPerDisplay => "CROP_PER_DISPLAY",
            Self::ResizeToTrueResolution => "RESIZE_TO_TRUE_RESOLUTION",
            Self::PasteToFinalCanvas => "PASTE_TO_FINAL_CANVAS",
            Self::Commit => "COMMIT",
        };
        f.write_str(name)
    }
}

/// Logs a stage transition.
pub fn enter_stage(stage: JobStage, group: Option<usize>) {
    match group {
        Some(group) => tracing::debug!(%stage, group, "compositor stage"),
        None => tracing::debug!(%stage, "compositor stage"),
    }
}

/// Why a single span group could not be composed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// A span group that failed while the rest of the job went ahead.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("span group {group} ({displays:?}) failed: {error}")]
pub struct GroupFailure {
    pub group: usize,
    pub displays: Vec<DisplayId>,
    pub error: GroupError,
}

/// Errors that abort a whole job.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("No source images given")]
    NoSources,

    #[error("Expected {expected} source image(s) for {mode} mode, got {actual}")]
    SourceCountMismatch { mode: SpanMode, expected: usize, actual: usize },

    #[error(
        "Working canvas of span group {group} is {size}, over the {budget} px budget; \
         allow large canvases to proceed"
    )]
    CanvasTooLarge { group: usize, size: Resolution, budget: u32 },

    #[error("Every span group failed; first error: {}", .0.first().map_or_else(String::new, ToString::to_string))]
    AllGroupsFailed(Vec<GroupFailure>),
}

/// Everything a compositing job needs.
///
/// The display system is a snapshot; reconfiguration during the job does not
/// affect it.
#[derive(Debug, Clone)]
pub struct CompositeRequest<'a> {
    pub system: &'a DisplaySystem,
    pub mode: SpanMode,
    pub groups: SpanGroups,
    /// One source per span group, or one per display in multi mode. A single
    /// source is reused everywhere.
    pub sources: Vec<PathBuf>,
    /// Only used in advanced mode.
    pub perspective: Option<&'a PerspectiveProfile>,
    pub canvas_budget: u32,
    pub allow_large_canvas: bool,
}

impl<'a> CompositeRequest<'a> {
    /// Creates a request with one span group and no perspective.
    #[must_use]
    pub fn new(system: &'a DisplaySystem, mode: SpanMode, sources: Vec<PathBuf>) -> Self {
        Self {
            system,
            mode,
            groups: SpanGroups::single(system.len()),
            sources,
            perspective: None,
            canvas_budget: DEFAULT_CANVAS_BUDGET,
            allow_large_canvas: false,
        }
    }
}

/// How one display's pixels are taken from its group's working canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PieceSource {
    /// A plain crop of the working canvas.
    Crop { region: CropRegion },
    /// A projective warp evaluated over `region`, with the working canvas
    /// placed at `origin`.
    Warp { region: CropRegion, coeffs: ProjectiveCoeffs, origin: Position },
}

/// Where one display's image comes from and where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PiecePlan {
    pub id: DisplayId,
    pub source: PieceSource,
    /// The display's rectangle on the final canvas.
    pub destination: CropRegion,
}

/// Geometry of one span group, computed before any pixels are touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPlan {
    pub group: usize,
    pub displays: Vec<DisplayId>,
    pub working_canvas: Resolution,
    pub pieces: Vec<PiecePlan>,
}

/// Result of a job that produced an image.
#[derive(Debug)]
pub struct CompositeOutcome {
    pub image: RgbImage,
    /// Source files actually used, in group order.
    pub sources: Vec<PathBuf>,
    pub failures: Vec<GroupFailure>,
}

impl CompositeOutcome {
    /// True if some span groups failed.
    #[must_use]
    pub fn is_partial(&self) -> bool { !self.failures.is_empty() }
}

/// Plans the geometry of every span group.
///
/// # Errors
///
/// Returns a geometry error for an invalid perspective profile or a
/// projection that cannot be computed.
pub fn plan(request: &CompositeRequest<'_>) -> Result<Vec<GroupPlan>, CompositeError> {
    enter_stage(JobStage::SizeWorkingCanvas, None);
    let system = request.system;

    let plans: Vec<GroupPlan> = match request.mode {
        SpanMode::Single => request
            .groups
            .groups()
            .iter()
            .enumerate()
            .map(|(group, ids)| single_plan(system, group, ids))
            .collect(),
        SpanMode::Multi => system
            .displays()
            .iter()
            .enumerate()
            .map(|(group, display)| single_plan(system, group, &[display.id()]))
            .collect(),
        SpanMode::Advanced => match request.perspective {
            Some(profile) => perspective_plans(system, &request.groups, profile)?,
            None => {
                let crops = system.normalized_crops();
                request
                    .groups
                    .groups()
                    .iter()
                    .enumerate()
                    .map(|(group, ids)| normalized_plan(system, &crops, group, ids))
                    .collect()
            }
        },
    };

    Ok(plans)
}

/// Plan cropping true-resolution regions out of a canvas the size of the group.
fn single_plan(system: &DisplaySystem, group: usize, ids: &[DisplayId]) -> GroupPlan {
    let regions: Vec<_> = ids
        .iter()
        .filter_map(|id| system.display(*id))
        .map(|display| (display.id(), layout::true_region(display)))
        .collect();
    let bbox = layout::bounding_box(regions.iter().map(|(_, region)| region)).unwrap_or_default();

    GroupPlan {
        group,
        displays: ids.to_vec(),
        working_canvas: bbox.size(),
        pieces: regions
            .into_iter()
            .map(|(id, region)| PiecePlan {
                id,
                source: PieceSource::Crop { region: region.translate(-bbox.left, -bbox.top) },
                destination: region,
            })
            .collect(),
    }
}

/// Plan cropping normalized regions, relative to the group's own origin.
fn normalized_plan(
    system: &DisplaySystem,
    crops: &[DisplayCrop],
    group: usize,
    ids: &[DisplayId],
) -> GroupPlan {
    let members: Vec<_> = crops.iter().filter(|crop| ids.contains(&crop.id)).collect();
    let bbox = layout::bounding_box(members.iter().map(|crop| &crop.region)).unwrap_or_default();

    GroupPlan {
        group,
        displays: ids.to_vec(),
        working_canvas: bbox.size(),
        pieces: members
            .into_iter()
            .filter_map(|crop| {
                let display = system.display(crop.id)?;
                Some(PiecePlan {
                    id: crop.id,
                    source: PieceSource::Crop {
                        region: crop.region.translate(-bbox.left, -bbox.top),
                    },
                    destination: layout::true_region(display),
                })
            })
            .collect(),
    }
}

/// Plan warping each display out of its group's share of the projected canvas.
///
/// The whole display set is projected so every group sees the same
/// reference plane; each group's working canvas covers only its own quads.
fn perspective_plans(
    system: &DisplaySystem,
    groups: &SpanGroups,
    profile: &PerspectiveProfile,
) -> Result<Vec<GroupPlan>, CompositeError> {
    profile.validate(system.len())?;
    let projection = crate::display::project(&system.normalized_crops(), profile)?;

    let plans = groups
        .groups()
        .iter()
        .enumerate()
        .map(|(group, ids)| {
            let members: Vec<_> =
                ids.iter().filter_map(|id| projection.get(*id)).collect();
            let bbox = layout::bounding_box(members.iter().map(|projected| &projected.crop))
                .unwrap_or_default();
            let origin = Position::new(bbox.left, bbox.top);

            GroupPlan {
                group,
                displays: ids.clone(),
                working_canvas: bbox.size(),
                pieces: members
                    .into_iter()
                    .filter_map(|projected| {
                        let display = system.display(projected.id)?;
                        Some(PiecePlan {
                            id: projected.id,
                            source: PieceSource::Warp {
                                region: projected.target,
                                coeffs: projected.coeffs,
                                origin,
                            },
                            destination: layout::true_region(display),
                        })
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(plans)
}

/// Checks every plan against the canvas budget.
///
/// # Errors
///
/// Returns [`CompositeError::CanvasTooLarge`] for the first group over budget
/// unless `allow_large` is set, in which case it only warns.
pub fn check_budget(plans: &[GroupPlan], budget: u32, allow_large: bool) -> Result<(), CompositeError> {
    for plan in plans {
        let size = plan.working_canvas;
        if size.width > budget || size.height > budget {
            tracing::warn!(group = plan.group, %size, budget, "working canvas exceeds pixel budget");
            if !allow_large {
                return Err(CompositeError::CanvasTooLarge { group: plan.group, size, budget });
            }
        }
    }
    Ok(())
}

/// Picks the source file of each group.
fn assign_sources(
    request: &CompositeRequest<'_>,
    group_count: usize,
) -> Result<Vec<PathBuf>, CompositeError> {
    match request.sources.len() {
        0 => Err(CompositeError::NoSources),
        1 => Ok(vec![request.sources[0].clone(); group_count]),
        count if count >= group_count => Ok(request.sources[..group_count].to_vec()),
        actual => Err(CompositeError::SourceCountMismatch {
            mode: request.mode,
            expected: group_count,
            actual,
        }),
    }
}

type Decoded = Result<Arc<RgbImage>, ProcessingError>;

/// Decodes each distinct source once.
fn decode_sources(sources: &[PathBuf]) -> HashMap<&Path, Decoded> {
    enter_stage(JobStage::LoadSource, None);
    let mut unique: Vec<&Path> = sources.iter().map(PathBuf::as_path).collect();
    unique.sort_unstable();
    unique.dedup();

    unique
        .into_par_iter()
        .map(|path| (path, processing::load_image(path).map(Arc::new)))
        .collect()
}

/// Renders one group's displays at their true resolutions.
fn compose_group(plan: &GroupPlan, source: &RgbImage) -> Result<Vec<(PiecePlan, RgbImage)>, GroupError> {
    enter_stage(JobStage::SizeWorkingCanvas, Some(plan.group));
    let canvas = processing::resize_to_fill(source, plan.working_canvas)?;

    plan.pieces
        .iter()
        .map(|piece| {
            let cropped = match piece.source {
                PieceSource::Crop { region } => {
                    enter_stage(JobStage::CropPerDisplay, Some(plan.group));
                    processing::crop(&canvas, &region)?
                }
                PieceSource::Warp { region, coeffs, origin } => {
                    enter_stage(JobStage::TransformPerDisplay, Some(plan.group));
                    processing::warp_region(&canvas, &coeffs, &region, origin)?
                }
            };

            enter_stage(JobStage::ResizeToTrueResolution, Some(plan.group));
            let resized = processing::resize_exact(&cropped, piece.destination.size())?;
            Ok((*piece, resized))
        })
        .collect()
}

/// Runs a compositing job up to, but not including, `COMMIT`.
///
/// # Errors
///
/// Returns an error for invalid geometry, a canvas over budget, a wrong
/// number of sources, or when every span group failed. Failures of only some
/// groups are reported in the outcome instead.
pub fn compose(request: &CompositeRequest<'_>) -> Result<CompositeOutcome, CompositeError> {
    let plans = plan(request)?;
    check_budget(&plans, request.canvas_budget, request.allow_large_canvas)?;

    let sources = assign_sources(request, plans.len())?;
    let decoded = decode_sources(&sources);

    let results: Vec<_> = plans
        .par_iter()
        .zip(&sources)
        .map(|(plan, path)| {
            let rendered = match decoded.get(path.as_path()) {
                Some(Ok(image)) => compose_group(plan, image),
                Some(Err(err)) => Err(err.clone().into()),
                None => Err(GroupError::Processing(ProcessingError::ImageRead {
                    path: path.display().to_string(),
                    reason: "not decoded".to_string(),
                })),
            };
            (plan, rendered)
        })
        .collect();

    enter_stage(JobStage::PasteToFinalCanvas, None);
    let canvas_size = request.system.true_canvas();
    let mut image = RgbImage::new(canvas_size.width, canvas_size.height);
    let mut failures = Vec::new();

    for (plan, rendered) in results {
        match rendered {
            Ok(pieces) => {
                for (piece, pixels) in pieces {
                    let at = Position::new(piece.destination.left, piece.destination.top);
                    processing::paste(&mut image, &pixels, at)?;
                }
            }
            Err(error) => {
                tracing::warn!(group = plan.group, error = %error, "span group failed");
                failures.push(GroupFailure { group: plan.group, displays: plan.displays.clone(), error });
            }
        }
    }

    if !failures.is_empty() && failures.len() == plans.len() {
        return Err(CompositeError::AllGroupsFailed(failures));
    }

    Ok(CompositeOutcome { image, sources, failures })
}
