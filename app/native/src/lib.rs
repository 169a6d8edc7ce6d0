//! paperspan - spans wallpapers across multiple monitors.
//!
//! Models the physical display set (sizes, pixel densities, bezels, angles),
//! lays the displays out in a shared pixel space and composites source images
//! so that a picture stays continuous across monitors.

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod logging;
pub mod platform;
pub mod wallpaper;
