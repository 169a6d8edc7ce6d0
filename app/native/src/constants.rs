//! Application-wide constants.

/// Name used for the configuration, cache and data directories.
pub const APP_NAME: &str = "paperspan";

/// Subdirectory of the cache directory that receives composites by default.
pub const WALLPAPER_CACHE_SUBDIR: &str = "wallpapers";
