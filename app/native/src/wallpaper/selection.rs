//! Picking source images for each span group.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use natord::compare;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::processing;
use crate::platform::path::expand;

/// Order in which a queue hands out images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    /// Random order, reshuffled after every full pass.
    #[default]
    Shuffle,
    /// Natural file-name order.
    Alphabetical,
    /// Random order that is the same for every process within one UTC hour.
    DateSeededShuffle,
}

/// Errors from building image queues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Invalid wallpaper path: {0}")]
    InvalidPath(String),

    #[error("No supported images in span group {0}")]
    NoImages(usize),
}

/// Collects the supported images named by `paths`, expanding directories.
///
/// Missing paths are skipped with a warning.
#[must_use]
pub fn collect_images(paths: &[String]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for raw in paths {
        let path = expand(raw);
        if path.is_dir() {
            images.extend(processing::list_images_in_directory(&path));
        } else if path.is_file() {
            if processing::is_supported_image(&path) {
                images.push(path);
            } else {
                tracing::debug!(path = %path.display(), "skipping unsupported file");
            }
        } else {
            tracing::warn!(path = %raw, "wallpaper path not found");
        }
    }
    images
}

/// An endless, re-arranging list of images.
#[derive(Debug, Clone)]
pub struct ImageQueue {
    images: Vec<PathBuf>,
    sort: SortMode,
    position: usize,
}

impl ImageQueue {
    /// Creates a queue and arranges it according to `sort`.
    #[must_use]
    pub fn new(images: Vec<PathBuf>, sort: SortMode) -> Self {
        let mut queue = Self { images, sort, position: 0 };
        queue.arrange();
        queue
    }

    #[must_use]
    pub fn len(&self) -> usize { self.images.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.images.is_empty() }

    /// The images in their current order.
    #[must_use]
    pub fn images(&self) -> &[PathBuf] { &self.images }

    /// Returns the next image and advances.
    ///
    /// After the last image the list is re-arranged and starts over.
    pub fn next_image(&mut self) -> Option<&Path> {
        self.wrap();
        let index = self.position;
        self.position += 1;
        self.images.get(index).map(PathBuf::as_path)
    }

    /// Returns the image [`next_image`](Self::next_image) would return, without advancing.
    pub fn peek(&mut self) -> Option<&Path> {
        self.wrap();
        self.images.get(self.position).map(PathBuf::as_path)
    }

    fn wrap(&mut self) {
        if self.position >= self.images.len() {
            self.position = 0;
            self.arrange();
        }
    }

    fn arrange(&mut self) {
        match self.sort {
            SortMode::Shuffle => self.images.shuffle(&mut rand::rng()),
            SortMode::Alphabetical => self
                .images
                .sort_by(|a, b| compare(a.to_string_lossy().as_ref(), b.to_string_lossy().as_ref())),
            SortMode::DateSeededShuffle => {
                seeded_shuffle(&mut self.images, hour_seed(&Local::now()));
            }
        }
    }
}

/// Shuffles deterministically for `seed`, independent of the incoming order.
fn seeded_shuffle(images: &mut [PathBuf], seed: u64) {
    images.sort();
    images.shuffle(&mut StdRng::seed_from_u64(seed));
}

/// The wall-clock hour of `now` as the decimal number `YYYYMMDDHH`.
fn hour_seed<Tz: TimeZone>(now: &DateTime<Tz>) -> u64 {
    let year = u64::try_from(now.year()).unwrap_or(0);
    year * 1_000_000
        + u64::from(now.month()) * 10_000
        + u64::from(now.day()) * 100
        + u64::from(now.hour())
}

/// One queue per span group.
#[derive(Debug, Clone)]
pub struct ImageSelector {
    paths: Vec<Vec<String>>,
    sort: SortMode,
    queues: Vec<ImageQueue>,
}

impl ImageSelector {
    /// Builds a queue for each group's list of files and directories.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NoImages`] if any group ends up empty.
    pub fn new(paths: Vec<Vec<String>>, sort: SortMode) -> Result<Self, SelectionError> {
        let queues = build_queues(&paths, sort)?;
        Ok(Self { paths, sort, queues })
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize { self.queues.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.queues.is_empty() }

    /// Returns the next image of every group.
    ///
    /// If a listed file has disappeared, the paths are scanned again once.
    ///
    /// # Errors
    ///
    /// Returns an error if rescanning leaves a group without images.
    pub fn next_files(&mut self) -> Result<Vec<PathBuf>, SelectionError> {
        if let Some(files) = Self::take_next(&mut self.queues) {
            return Ok(files);
        }

        tracing::info!("a wallpaper file disappeared, rescanning paths");
        self.queues = build_queues(&self.paths, self.sort)?;
        Self::take_next(&mut self.queues)
            .ok_or_else(|| SelectionError::InvalidPath("wallpaper files changed while rescanning".into()))
    }

    fn take_next(queues: &mut [ImageQueue]) -> Option<Vec<PathBuf>> {
        queues
            .iter_mut()
            .map(|queue| queue.next_image().filter(|path| path.is_file()).map(Path::to_path_buf))
            .collect()
    }
}

fn build_queues(paths: &[Vec<String>], sort: SortMode) -> Result<Vec<ImageQueue>, SelectionError> {
    paths
        .iter()
        .enumerate()
        .map(|(group, group_paths)| {
            let images = collect_images(group_paths);
            if images.is_empty() {
                return Err(SelectionError::NoImages(group));
            }
            Ok(ImageQueue::new(images, sort))
        })
        .collect()
}
