//! Cache directory utilities.
//!
//! Composited wallpapers go to `{cache}/paperspan/wallpapers/` unless the
//! configuration names another output directory. The platform cache
//! directory comes from `dirs` (`~/.cache` on Linux, `~/Library/Caches` on
//! macOS), with a fallback to the system temp directory.

use std::path::{Path, PathBuf};

use crate::constants::{APP_NAME, WALLPAPER_CACHE_SUBDIR};

/// Returns the root cache directory for the application.
#[must_use]
pub fn get_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(|| std::env::temp_dir().join(APP_NAME), |cache| cache.join(APP_NAME))
}

/// Returns a cache subdirectory for the given component.
#[must_use]
pub fn get_cache_subdir(subdir: &str) -> PathBuf { get_cache_dir().join(subdir) }

/// Default directory for composited wallpapers.
#[must_use]
pub fn wallpaper_dir() -> PathBuf { get_cache_subdir(WALLPAPER_CACHE_SUBDIR) }

/// Clears the entire cache directory.
///
/// Removes all files and subdirectories from the application's cache directory.
///
/// # Returns
///
/// * `Ok(bytes_freed)` - The approximate number of bytes freed
/// * `Err(error)` - If the operation failed
///
/// # Errors
///
/// Returns an error if:
/// - The cache directory doesn't exist (not an error, returns Ok(0))
/// - Permission denied when removing files
/// - I/O errors during removal
pub fn clear_cache() -> std::io::Result<u64> { clear_dir(&get_cache_dir()) }

/// Removes `dir` and everything in it, returning the bytes freed.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub fn clear_dir(dir: &Path) -> std::io::Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let bytes_freed = calculate_dir_size(dir)?;
    std::fs::remove_dir_all(dir)?;

    Ok(bytes_freed)
}

/// Calculates the total size of a directory in bytes.
fn calculate_dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;

    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                total += calculate_dir_size(&path)?;
            } else {
                total += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }

    Ok(total)
}

/// Formats a byte count as a human-readable string.
///
/// # Arguments
///
/// * `bytes` - The number of bytes
///
/// # Returns
///
/// A human-readable string like "1.5 MB" or "256 KB"
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss is acceptable for human-readable output
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_get_cache_dir_ends_with_app_name() {
        assert!(get_cache_dir().ends_with(APP_NAME));
    }

    #[test]
    fn test_wallpaper_dir_is_inside_cache_dir() {
        let path = wallpaper_dir();
        assert!(path.starts_with(get_cache_dir()));
        assert!(path.ends_with(WALLPAPER_CACHE_SUBDIR));
    }

    #[test]
    fn test_clear_dir_reports_size() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("cache");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("a.png"), [0u8; 100]).unwrap();
        std::fs::write(dir.join("nested/b.png"), [0u8; 28]).unwrap();

        assert_eq!(clear_dir(&dir).unwrap(), 128);
        assert!(!dir.exists());
        assert_eq!(clear_dir(&dir).unwrap(), 0);
    }

    #[test]
    fn test_format_bytes_bytes() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(1023), "1023 bytes");
    }

    #[test]
    fn test_format_bytes_kb() {
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
    }

    #[test]
    fn test_format_bytes_mb() {
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 + 512 * 1024), "1.50 MB");
    }

    #[test]
    fn test_format_bytes_gb() {
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }
}
