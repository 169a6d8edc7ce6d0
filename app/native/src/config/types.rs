//! Configuration types for paperspan.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache;
use crate::display::{
    DisplayInfo, DisplayModel, GeometryResult, GeometrySettings, PerspectiveProfile, PerspectiveStore,
    SpanMode,
};
use crate::platform::path::expand_and_resolve;
use crate::wallpaper::compositor::DEFAULT_CANVAS_BUDGET;
use crate::wallpaper::{SortMode, TriggerPolicy};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PaperspanConfig {
    /// The displays to lay out, as reported by the system.
    ///
    /// Offsets may be negative; they are shifted so the top-left display
    /// starts at `[0, 0]`.
    pub displays: Vec<DisplayInfo>,

    /// Named wallpaper profiles.
    pub profiles: BTreeMap<String, ProfileConfig>,

    /// Named perspective profiles. `default` and `disabled` are reserved.
    pub perspectives: BTreeMap<String, PerspectiveProfile>,

    /// Settings shared by every profile.
    pub general: GeneralConfig,
}

impl PaperspanConfig {
    /// Looks up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] if no profile has that name.
    pub fn profile(&self, name: &str) -> Result<&ProfileConfig, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Sanitizes the configured displays.
    ///
    /// # Errors
    ///
    /// Returns an error if a display has a non-positive resolution.
    pub fn detect_displays(&self) -> GeometryResult<Vec<DisplayModel>> {
        DisplayModel::discover(&self.displays)
    }

    /// The configured perspectives, minus any using a reserved name.
    #[must_use]
    pub fn perspective_store(&self) -> PerspectiveStore {
        PerspectiveStore::from_profiles(&self.perspectives)
    }
}

/// One way of putting wallpapers on the desktop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileConfig {
    /// How images are spread: `single`, `advanced` or `multi`.
    pub span_mode: SpanMode,

    /// Files or directories of images, one list per span group (per display
    /// in `multi` mode). Relative paths are resolved against the
    /// configuration file's directory.
    pub paths: Vec<Vec<String>>,

    /// Order in which images are picked.
    pub sort_mode: SortMode,

    /// Display indices of each span group. Empty means one group for all
    /// displays.
    pub span_groups: Vec<Vec<usize>>,

    /// Scale displays to a common pixel density.
    /// Default: true
    pub ppi: bool,

    /// Per-display diagonal in inches; `null` keeps the detected size.
    pub diagonal_inches: Vec<Option<f64>>,

    /// Per-display `[right, bottom]` bezel thickness in millimeters.
    pub bezels: Vec<(f64, f64)>,

    /// Per-display `[x, y]` pixel nudges relative to the automatic layout.
    pub offsets: Vec<(i64, i64)>,

    /// Perspective profile name, or `default` / `disabled`.
    /// Default: "default"
    pub perspective: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            span_mode: SpanMode::default(),
            paths: Vec::new(),
            sort_mode: SortMode::default(),
            span_groups: Vec::new(),
            ppi: true,
            diagonal_inches: Vec::new(),
            bezels: Vec::new(),
            offsets: Vec::new(),
            perspective: crate::display::store::PERSPECTIVE_DEFAULT.to_string(),
        }
    }
}

impl ProfileConfig {
    /// Applies this profile's geometry on top of `base`.
    ///
    /// Lists left empty keep the base values. If anything changes, stored
    /// absolute offsets are dropped so the layout is recomputed.
    #[must_use]
    pub fn geometry(&self, base: &GeometrySettings) -> GeometrySettings {
        let mut settings = base.clone();
        settings.ppi_correction = self.ppi;
        if !self.diagonal_inches.is_empty() {
            settings.diagonal_inches.clone_from(&self.diagonal_inches);
        }
        if !self.bezels.is_empty() {
            settings.bezels_mm.clone_from(&self.bezels);
        }
        if !self.offsets.is_empty() {
            settings.manual_offsets.clone_from(&self.offsets);
        }

        if settings != *base {
            settings.ppi_norm_offsets.clear();
        }
        settings
    }

    /// Image paths with `~` expanded and relative paths resolved against
    /// `base_dir`.
    #[must_use]
    pub fn resolved_paths(&self, base_dir: &Path) -> Vec<Vec<String>> {
        self.paths
            .iter()
            .map(|group| {
                group.iter().map(|p| expand_and_resolve(p, base_dir).display().to_string()).collect()
            })
            .collect()
    }
}

/// Settings shared by every profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneralConfig {
    /// Where composites are written. Empty uses the cache directory.
    pub output_dir: String,

    /// Command that sets the wallpaper, with `{image}` replaced by the
    /// composite's path. Empty uses the desktop's own API.
    pub set_command: Option<String>,

    /// Largest working canvas side, in pixels, before a job needs
    /// confirmation.
    /// Default: 12000
    pub canvas_budget: u32,

    /// Also write one crop per display next to the composite.
    pub export_pieces: bool,

    /// What to do when a job is started while another one runs.
    pub trigger: TriggerPolicy,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: String::new(),
            set_command: None,
            canvas_budget: DEFAULT_CANVAS_BUDGET,
            export_pieces: false,
            trigger: TriggerPolicy::default(),
        }
    }
}

impl GeneralConfig {
    /// The output directory, resolved against `base_dir`.
    #[must_use]
    pub fn output_dir(&self, base_dir: &Path) -> PathBuf {
        if self.output_dir.trim().is_empty() {
            cache::wallpaper_dir()
        } else {
            expand_and_resolve(&self.output_dir, base_dir)
        }
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/paperspan/config.jsonc \
         or ~/.paperspan.jsonc"
    )]
    NotFound,

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A profile name that is not configured.
    #[error("Unknown profile '{0}'")]
    UnknownProfile(String),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Configuration file names in the home directory.
const HOME_CONFIG_FILE_NAMES: &[&str] = &[".paperspan.jsonc", ".paperspan.json"];

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/paperspan/config.jsonc`, if the variable is set
/// 2. `~/.config/paperspan/config.jsonc`
/// 3. the platform configuration directory (`~/Library/Application Support`
///    on macOS, `%APPDATA%` on Windows)
/// 4. `~/.paperspan.jsonc` or `~/.paperspan.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let app = crate::constants::APP_NAME;
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(&PathBuf::from(xdg_config).join(app), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(&home.join(".config").join(app), &mut paths);
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(&config_dir.join(app), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        for filename in HOME_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Adds the config file names inside `dir`, skipping duplicates (e.g. when
/// `$XDG_CONFIG_HOME` is `~/.config`).
fn push_dir(dir: &Path, paths: &mut Vec<PathBuf>) {
    for filename in CONFIG_FILE_NAMES {
        let path = dir.join(filename);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations.
/// Returns `ConfigError::IoError` if a configuration file exists but could not be read.
/// Returns `ConfigError::ParseError` if the configuration file contains invalid JSON.
pub fn load_config() -> Result<(PaperspanConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, and the
/// other variants for read and parse failures.
pub fn load_config_from_path(path: &Path) -> Result<(PaperspanConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: PaperspanConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
