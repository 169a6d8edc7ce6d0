//! Error types for paperspan.
//!
//! Every CLI command returns [`PaperspanError`]. Lower-level errors convert
//! into it, keeping their message and sorting them by kind.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::display::{GeometryError, StoreError};
use crate::wallpaper::{CompositeError, ProcessingError, SelectionError, WallpaperManagerError};

/// Errors that can occur during application execution.
///
/// Serializes as `{"kind": ..., "message": ...}` for `--json` output.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum PaperspanError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Display geometry could not be built.
    #[error("Geometry error: {0}")]
    GeometryError(String),
    /// Compositing or setting a wallpaper failed.
    #[error("Wallpaper error: {0}")]
    WallpaperError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for PaperspanError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for PaperspanError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<GeometryError> for PaperspanError {
    fn from(err: GeometryError) -> Self { Self::GeometryError(err.to_string()) }
}

impl From<StoreError> for PaperspanError {
    fn from(err: StoreError) -> Self { Self::GeometryError(err.to_string()) }
}

impl From<ConfigError> for PaperspanError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ProcessingError> for PaperspanError {
    fn from(err: ProcessingError) -> Self { Self::WallpaperError(err.to_string()) }
}

impl From<CompositeError> for PaperspanError {
    fn from(err: CompositeError) -> Self {
        match err {
            CompositeError::Geometry(err) => err.into(),
            other => Self::WallpaperError(other.to_string()),
        }
    }
}

impl From<SelectionError> for PaperspanError {
    fn from(err: SelectionError) -> Self { Self::WallpaperError(err.to_string()) }
}

impl From<WallpaperManagerError> for PaperspanError {
    fn from(err: WallpaperManagerError) -> Self {
        match err {
            WallpaperManagerError::Geometry(err) => err.into(),
            WallpaperManagerError::Composite(err) => err.into(),
            other => Self::WallpaperError(other.to_string()),
        }
    }
}

impl From<String> for PaperspanError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for PaperspanError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}
