//! Display geometry.
//!
//! Describes the physical display set, normalizes pixel densities, lays the
//! displays out in a shared pixel space and projects rotated displays back
//! onto a flat reference plane.

pub mod density;
pub mod error;
pub mod layout;
pub mod model;
pub mod perspective;
pub mod store;
pub mod system;

pub use density::{BezelPx, Normalization, NormalizedDisplay};
pub use error::{GeometryError, GeometryResult};
pub use layout::{CropRegion, DisplayCrop, compute_crop_tuples};
pub use model::{DisplayId, DisplayInfo, DisplayModel, PhysicalSize, Position, Resolution};
pub use perspective::{
    PerspectiveProfile, ProjectedDisplay, ProjectiveCoeffs, Projection, Quad, Swivel, SwivelAxis,
    Tilt, ViewerOffset, project, solve_coefficients,
};
pub use store::{GeometryStore, PerspectiveStore, StoreError, display_set_key};
pub use system::{DisplaySystem, GeometrySettings, SharedDisplaySystem, SpanGroups, SpanMode};
