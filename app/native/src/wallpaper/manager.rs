//! Runs compositing jobs and hands the result to the desktop.
//!
//! Only one job may run at a time across the whole process, since two jobs
//! writing the same A/B output files would race. A job either waits for the
//! running one or is skipped, depending on the [`TriggerPolicy`].

use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::{Mutex, MutexGuard};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::compositor::{self, CompositeError, CompositeRequest, DEFAULT_CANVAS_BUDGET};
use super::output::{CommittedOutput, OutputDir};
use super::processing::ProcessingError;
use super::selection::{ImageSelector, SelectionError};
use crate::display::layout::true_region;
use crate::display::{
    CropRegion, GeometryError, PerspectiveProfile, SharedDisplaySystem, SpanGroups, SpanMode,
};

/// Held for the whole LOAD to COMMIT sequence of a job.
static JOB_LOCK: Mutex<()> = Mutex::new(());

/// Placeholder replaced by the image path in a custom set command.
pub const IMAGE_PLACEHOLDER: &str = "{image}";

/// Environment variable holding the job's source images, one per line, for
/// custom set commands.
pub const SOURCES_ENV: &str = "PAPERSPAN_SOURCES";

/// What to do when a job is triggered while another one is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TriggerPolicy {
    /// Wait for the running job, then run.
    #[default]
    Serialize,
    /// Skip the new job.
    Coalesce,
}

/// Errors from handing a wallpaper to the desktop.
#[derive(Debug, Error)]
pub enum SetterError {
    #[error("Wallpaper file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to set wallpaper: {0}")]
    Desktop(String),

    #[error("Failed to run '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("'{command}' exited with {status}")]
    Status { command: String, status: String },
}

/// Sets the desktop background.
pub trait WallpaperSetter: Send + Sync {
    /// Sets `image` as the background. `sources` are the images it was made
    /// from.
    ///
    /// # Errors
    ///
    /// Returns an error if the background could not be set.
    fn set(&self, image: &Path, sources: &[PathBuf]) -> Result<(), SetterError>;
}

/// Uses the desktop environment's own wallpaper API.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopSetter;

impl WallpaperSetter for DesktopSetter {
    fn set(&self, image: &Path, _sources: &[PathBuf]) -> Result<(), SetterError> {
        if !image.exists() {
            return Err(SetterError::FileNotFound(image.display().to_string()));
        }

        let path_str = image.display().to_string();
        ::wallpaper::set_from_path(&path_str).map_err(|e| SetterError::Desktop(e.to_string()))
    }
}

/// Runs a user command through the shell, with [`IMAGE_PLACEHOLDER`]
/// replaced by the image path.
#[derive(Debug, Clone)]
pub struct CommandSetter {
    template: String,
}

impl CommandSetter {
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self { Self { template: template.into() } }

    /// The command line for `image`.
    #[must_use]
    pub fn command_line(&self, image: &Path) -> String {
        self.template.replace(IMAGE_PLACEHOLDER, &image.display().to_string())
    }
}

impl WallpaperSetter for CommandSetter {
    fn set(&self, image: &Path, sources: &[PathBuf]) -> Result<(), SetterError> {
        let command = self.command_line(image);
        let sources = sources.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join("\n");

        #[cfg(windows)]
        let mut shell = {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C");
            cmd
        };
        #[cfg(not(windows))]
        let mut shell = {
            let mut cmd = Command::new("sh");
            cmd.arg("-c");
            cmd
        };

        tracing::debug!(%command, "running set command");
        let status = shell
            .arg(&command)
            .env(SOURCES_ENV, sources)
            .status()
            .map_err(|e| SetterError::Spawn { command: command.clone(), reason: e.to_string() })?;

        if status.success() {
            Ok(())
        } else {
            Err(SetterError::Status { command, status: status.to_string() })
        }
    }
}

/// Picks the custom command setter when a command is configured.
#[must_use]
pub fn setter_for(command: Option<&str>) -> Box<dyn WallpaperSetter> {
    match command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => Box::new(CommandSetter::new(command)),
        None => Box::new(DesktopSetter),
    }
}

/// Errors that can occur in wallpaper management.
#[derive(Debug, Error)]
pub enum WallpaperManagerError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Setter(#[from] SetterError),

    #[error("No previous wallpaper for profile '{0}'")]
    NoLastOutput(String),

    #[error("Another wallpaper job is already running")]
    Busy,
}

/// One wallpaper change.
#[derive(Debug, Clone)]
pub struct Job {
    /// Names the output files.
    pub profile: String,
    pub mode: SpanMode,
    /// Span groups as display indices; empty means one group of all displays.
    pub groups: Vec<Vec<usize>>,
    pub sources: Vec<PathBuf>,
    pub perspective: Option<PerspectiveProfile>,
    pub allow_large_canvas: bool,
    /// Also write one crop per display.
    pub export_pieces: bool,
    /// Set the result as the background; otherwise only write it.
    pub apply: bool,
}

impl Job {
    /// A job that spans everything in `mode` and sets the result.
    #[must_use]
    pub fn new(profile: impl Into<String>, mode: SpanMode) -> Self {
        Self {
            profile: profile.into(),
            mode,
            groups: Vec::new(),
            sources: Vec::new(),
            perspective: None,
            allow_large_canvas: false,
            export_pieces: false,
            apply: true,
        }
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub profile: String,
    pub output: CommittedOutput,
    pub sources: Vec<PathBuf>,
    /// Span groups that failed and were left black.
    pub failures: Vec<String>,
    pub applied: bool,
}

/// Runs jobs against the current display system.
pub struct WallpaperManager {
    displays: SharedDisplaySystem,
    output: OutputDir,
    setter: Box<dyn WallpaperSetter>,
    policy: TriggerPolicy,
    canvas_budget: u32,
}

impl WallpaperManager {
    #[must_use]
    pub fn new(displays: SharedDisplaySystem, output: OutputDir, setter: Box<dyn WallpaperSetter>) -> Self {
        Self {
            displays,
            output,
            setter,
            policy: TriggerPolicy::default(),
            canvas_budget: DEFAULT_CANVAS_BUDGET,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_canvas_budget(mut self, budget: u32) -> Self {
        self.canvas_budget = budget;
        self
    }

    /// The display system jobs read from. Replacing it does not affect a
    /// running job.
    #[must_use]
    pub const fn displays(&self) -> &SharedDisplaySystem { &self.displays }

    #[must_use]
    pub const fn output(&self) -> &OutputDir { &self.output }

    fn acquire(&self) -> Result<MutexGuard<'static, ()>, WallpaperManagerError> {
        match self.policy {
            TriggerPolicy::Serialize => Ok(JOB_LOCK.lock()),
            TriggerPolicy::Coalesce => JOB_LOCK.try_lock().ok_or_else(|| {
                tracing::info!("wallpaper job already running, skipping");
                WallpaperManagerError::Busy
            }),
        }
    }

    /// Composites, writes and (optionally) sets one wallpaper.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is skipped under [`TriggerPolicy::Coalesce`],
    /// the span groups are invalid, compositing fails as a whole, the output
    /// cannot be written or the setter fails.
    pub fn run(&self, job: &Job) -> Result<JobReport, WallpaperManagerError> {
        let _guard = self.acquire()?;
        let system = self.displays.snapshot();

        let groups = if job.groups.is_empty() {
            SpanGroups::single(system.len())
        } else {
            SpanGroups::new(&job.groups, system.len())?
        };

        let mut request = CompositeRequest::new(&system, job.mode, job.sources.clone());
        request.groups = groups;
        request.perspective = job.perspective.as_ref();
        request.canvas_budget = self.canvas_budget;
        request.allow_large_canvas = job.allow_large_canvas;

        let outcome = compositor::compose(&request)?;

        let pieces: Option<Vec<CropRegion>> =
            job.export_pieces.then(|| system.displays().iter().map(true_region).collect());
        let output = self.output.commit(&job.profile, &outcome.image, pieces.as_deref())?;

        if job.apply {
            self.setter.set(&output.image, &outcome.sources)?;
        }

        Ok(JobReport {
            profile: job.profile.clone(),
            output,
            sources: outcome.sources,
            failures: outcome.failures.iter().map(ToString::to_string).collect(),
            applied: job.apply,
        })
    }

    /// Takes the next images from `selector` and runs the job with them.
    ///
    /// # Errors
    ///
    /// See [`WallpaperManager::run`]; also fails if no images can be selected.
    pub fn run_next(&self, mut job: Job, selector: &mut ImageSelector) -> Result<JobReport, WallpaperManagerError> {
        job.sources = selector.next_files()?;
        self.run(&job)
    }

    /// Sets the newest existing output of `profile` again without compositing.
    ///
    /// # Errors
    ///
    /// Returns [`WallpaperManagerError::NoLastOutput`] if the profile has no
    /// output yet, or the setter's error.
    pub fn apply_last(&self, profile: &str) -> Result<PathBuf, WallpaperManagerError> {
        let _guard = self.acquire()?;
        let (slot, path) = self
            .output
            .latest(profile)
            .ok_or_else(|| WallpaperManagerError::NoLastOutput(profile.to_string()))?;

        self.setter.set(&path, &[])?;
        tracing::info!(profile, %slot, path = %path.display(), "wallpaper re-applied");
        Ok(path)
    }
}
