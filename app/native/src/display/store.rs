//! Persistence for display geometry and perspective profiles.
//!
//! Geometry settings are stored per display set in a single JSON file, keyed
//! by a hash of each display's resolution, offset and physical size. A set
//! that has never been configured simply has no entry, and callers fall back
//! to the automatic layout.
//!
//! `serde_json` writes floats with the shortest representation that parses
//! back to the same value, so offsets and sizes round-trip exactly.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::model::DisplayModel;
use super::perspective::PerspectiveProfile;
use super::system::{DisplaySystem, GeometrySettings};

/// Perspective name meaning "use the display set's default perspective".
pub const PERSPECTIVE_DEFAULT: &str = "default";

/// Perspective name meaning "no perspective correction".
pub const PERSPECTIVE_DISABLED: &str = "disabled";

/// File name of the geometry store inside the configuration directory.
pub const GEOMETRY_FILE_NAME: &str = "display_systems.json";

/// Errors from reading or writing stored geometry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access geometry store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse geometry store: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to replace geometry store: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("'{0}' is a reserved perspective name")]
    ReservedName(String),

    #[error("Unknown perspective '{0}'")]
    UnknownPerspective(String),
}

/// Returns the key identifying a display set.
///
/// Two enumerations of the same physical setup produce the same key; any
/// change in resolution, offset or reported size produces a new one.
#[must_use]
pub fn display_set_key(displays: &[DisplayModel]) -> String {
    let mut hasher = Sha256::new();
    for display in displays {
        let resolution = display.resolution();
        let offset = display.digital_offset();
        let size = display.physical_size();
        hasher.update(format!(
            "{}x{}+{}+{}:{:.3}x{:.3};",
            resolution.width, resolution.height, offset.x, offset.y, size.width_mm, size.height_mm
        ));
    }
    format!("{:x}", hasher.finalize())
}

/// JSON file mapping display-set keys to their geometry settings.
#[derive(Debug, Clone)]
pub struct GeometryStore {
    path: PathBuf,
}

impl GeometryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn read_all(&self) -> Result<BTreeMap<String, GeometrySettings>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, GeometrySettings>) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let file = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file());
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }
        file.persist(&self.path)?;
        Ok(())
    }

    /// Returns the stored settings for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    pub fn load(&self, key: &str) -> Result<Option<GeometrySettings>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    /// Stores `settings` under `key`, replacing any previous entry.
    ///
    /// The file is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn save(&self, key: &str, settings: &GeometrySettings) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), settings.clone());
        self.write_all(&entries)
    }

    /// Removes the entry for `key`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.read_all()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_all(&entries)?;
        }
        Ok(existed)
    }

    /// Builds the display system for `displays`, using stored settings when present.
    ///
    /// A missing, unreadable or stale entry is never fatal: it is logged and
    /// the automatic layout is used instead.
    #[must_use]
    pub fn restore(&self, displays: Vec<DisplayModel>) -> Option<DisplaySystem> {
        let key = display_set_key(&displays);
        let stored = match self.load(&key) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "ignoring geometry store");
                None
            }
        };

        if let Some(settings) = stored {
            match DisplaySystem::configure(displays.clone(), settings) {
                Ok(system) => return Some(system),
                Err(err) => tracing::warn!(error = %err, %key, "stored geometry no longer fits"),
            }
        } else {
            tracing::debug!(%key, "no stored geometry for this display set");
        }

        match DisplaySystem::new(displays) {
            Ok(system) => Some(system),
            Err(err) => {
                tracing::warn!(error = %err, "cannot build display system");
                None
            }
        }
    }

    /// Persists a system's settings under its display-set key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn persist(&self, system: &DisplaySystem) -> Result<(), StoreError> {
        let mut settings = system.settings().clone();
        settings.ppi_norm_offsets = system.ppi_norm_offsets();
        self.save(&display_set_key(system.detected()), &settings)
    }
}

/// Named perspective profiles.
#[derive(Debug, Clone, Default)]
pub struct PerspectiveStore {
    profiles: BTreeMap<String, PerspectiveProfile>,
}

impl PerspectiveStore {
    /// Builds a store from configured profiles, skipping reserved names.
    #[must_use]
    pub fn from_profiles(profiles: &BTreeMap<String, PerspectiveProfile>) -> Self {
        let mut store = Self::default();
        for (name, profile) in profiles {
            if let Err(err) = store.insert(name, profile.clone()) {
                tracing::warn!(error = %err, "skipping perspective");
            }
        }
        store
    }

    /// Adds or replaces a named profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReservedName`] for `default` and `disabled`.
    pub fn insert(&mut self, name: &str, profile: PerspectiveProfile) -> Result<(), StoreError> {
        if is_reserved(name) {
            return Err(StoreError::ReservedName(name.to_string()));
        }
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PerspectiveProfile> { self.profiles.get(name) }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.profiles.keys().map(String::as_str) }

    /// Resolves a profile selector against a display system.
    ///
    /// `disabled` resolves to `None`. `default` resolves to the system's
    /// default perspective when perspective is enabled for it, otherwise `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownPerspective`] if a named profile (or the
    /// system's default) does not exist.
    pub fn resolve(
        &self,
        selector: &str,
        system: &DisplaySystem,
    ) -> Result<Option<&PerspectiveProfile>, StoreError> {
        let name = match selector {
            PERSPECTIVE_DISABLED => return Ok(None),
            PERSPECTIVE_DEFAULT | "" => {
                if !system.perspective_enabled() {
                    return Ok(None);
                }
                match system.default_perspective() {
                    Some(name) => name,
                    None => return Ok(None),
                }
            }
            name => name,
        };

        self.get(name).map(Some).ok_or_else(|| StoreError::UnknownPerspective(name.to_string()))
    }
}

fn is_reserved(name: &str) -> bool {
    name.eq_ignore_ascii_case(PERSPECTIVE_DEFAULT) || name.eq_ignore_ascii_case(PERSPECTIVE_DISABLED)
}
