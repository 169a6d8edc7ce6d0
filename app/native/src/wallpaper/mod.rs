//! Wallpaper compositing and setting.

pub mod compositor;
pub mod manager;
pub mod output;
pub mod processing;
pub mod selection;

pub use compositor::{CompositeError, CompositeOutcome, CompositeRequest, GroupFailure, compose};
pub use manager::{
    CommandSetter, DesktopSetter, Job, JobReport, SetterError, TriggerPolicy, WallpaperManager,
    WallpaperManagerError, WallpaperSetter, setter_for,
};
pub use output::{CommittedOutput, OutputDir, Slot};
pub use processing::ProcessingError;
pub use selection::{ImageSelector, SelectionError, SortMode};
