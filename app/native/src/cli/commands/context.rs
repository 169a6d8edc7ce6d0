//! Shared setup for commands that need the display system.

use std::path::PathBuf;

use crate::config::{self, PaperspanConfig, ProfileConfig};
use crate::display::{
    DisplaySystem, GeometrySettings, GeometryStore, PerspectiveProfile, SharedDisplaySystem,
};
use crate::error::PaperspanError;
use crate::wallpaper::{OutputDir, WallpaperManager, setter_for};

/// Loaded configuration plus the stores derived from it.
pub struct Context {
    pub config: &'static PaperspanConfig,
    pub base_dir: PathBuf,
    pub store: GeometryStore,
}

impl Context {
    /// Loads the configuration and opens the geometry store.
    pub fn load() -> Self {
        Self {
            config: config::init(),
            base_dir: config::base_dir(),
            store: GeometryStore::new(config::geometry_store_path()),
        }
    }

    /// Builds the display system from the configured displays and any
    /// geometry stored for them.
    pub fn base_system(&self) -> Result<DisplaySystem, PaperspanError> {
        let detected = self.config.detect_displays()?;
        if detected.is_empty() {
            return Err(PaperspanError::ConfigError(
                "No displays configured. Add a \"displays\" list to the configuration file".into(),
            ));
        }
        self.store
            .restore(detected)
            .ok_or_else(|| PaperspanError::GeometryError("Display geometry could not be built".into()))
    }

    /// Builds the base system, then reconfigures it if `adjust` changes its settings.
    pub fn system_with(
        &self,
        adjust: impl FnOnce(&GeometrySettings) -> GeometrySettings,
    ) -> Result<DisplaySystem, PaperspanError> {
        let base = self.base_system()?;
        let settings = adjust(base.settings());
        if settings == *base.settings() {
            return Ok(base);
        }
        tracing::debug!(?settings, "reconfiguring display system");
        Ok(base.reconfigure(settings)?)
    }

    /// The display system as seen by `profile`.
    pub fn system_for(&self, profile: &ProfileConfig) -> Result<DisplaySystem, PaperspanError> {
        self.system_with(|base| profile.geometry(base))
    }

    /// Resolves a perspective selector for `system`.
    pub fn perspective(
        &self,
        selector: &str,
        system: &DisplaySystem,
    ) -> Result<Option<PerspectiveProfile>, PaperspanError> {
        Ok(self.config.perspective_store().resolve(selector, system)?.cloned())
    }

    /// A wallpaper manager for `system` using the configured output and setter.
    pub fn manager(&self, system: DisplaySystem) -> WallpaperManager {
        let general = &self.config.general;
        WallpaperManager::new(
            SharedDisplaySystem::new(system),
            OutputDir::new(general.output_dir(&self.base_dir)),
            setter_for(general.set_command.as_deref()),
        )
        .with_policy(general.trigger)
        .with_canvas_budget(general.canvas_budget)
    }
}
