//! Shell-like path expansion.
//!
//! Paths in the configuration may start with `~` and may be relative to the
//! directory holding the configuration file.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the home directory.
///
/// Absolute and relative paths are returned unchanged; surrounding
/// whitespace is trimmed and an empty input yields an empty path.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

/// Expands `~` and resolves relative paths against `base_dir`.
///
/// Used for wallpaper folders and the output directory, which are written
/// relative to the configuration file.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = expand(path);
    if expanded.is_absolute() {
        return expanded;
    }

    base_dir.join(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_empty() {
        let result = expand("");
        assert_eq!(result, PathBuf::new());
    }

    #[test]
    fn test_expand_whitespace() {
        let result = expand("   ");
        assert_eq!(result, PathBuf::new());
    }

    #[test]
    fn test_expand_absolute_path() {
        let result = expand("/absolute/path/to/file");
        assert_eq!(result, PathBuf::from("/absolute/path/to/file"));
    }

    #[test]
    fn test_expand_relative_path() {
        let result = expand("relative/path");
        assert_eq!(result, PathBuf::from("relative/path"));
    }

    #[test]
    fn test_expand_tilde_path() {
        let result = expand("~/Documents/file.txt");
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(result.to_string_lossy().ends_with("Documents/file.txt"));
    }

    #[test]
    fn test_expand_tilde_only() {
        let result = expand("~");
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(!result.to_string_lossy().is_empty());
    }

    #[test]
    fn test_expand_and_resolve_empty() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("", &base);
        assert_eq!(result, PathBuf::new());
    }

    #[test]
    fn test_expand_and_resolve_absolute() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("/absolute/path", &base);
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_and_resolve_relative() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("relative/path", &base);
        assert_eq!(result, PathBuf::from("/base/dir/relative/path"));
    }

    #[test]
    fn test_expand_and_resolve_wallpaper_folder() {
        let base = PathBuf::from("/home/user/.config/paperspan");
        let result = expand_and_resolve("walls/ultrawide", &base);
        assert_eq!(result, PathBuf::from("/home/user/.config/paperspan/walls/ultrawide"));
    }

    #[test]
    fn test_expand_and_resolve_tilde() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("~/some/path", &base);
        // Tilde should be expanded, not resolved against base
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(result.to_string_lossy().ends_with("some/path"));
        // Should NOT contain /base/dir
        assert!(!result.to_string_lossy().contains("/base/dir"));
    }

    #[test]
    fn test_expand_and_resolve_whitespace_trimmed() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("  relative/path  ", &base);
        assert_eq!(result, PathBuf::from("/base/dir/relative/path"));
    }
}
