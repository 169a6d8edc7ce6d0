//! Where composited wallpapers are written.
//!
//! Each profile alternates between two files, `{profile}-a.png` and
//! `{profile}-b.png`, so the previous wallpaper stays on disk until the new
//! one has been written. Some desktop environments ignore a wallpaper change
//! when the file path stays the same, which the alternation also avoids.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::Serialize;

use super::compositor::{JobStage, enter_stage};
use super::processing::{self, ProcessingError};
use crate::display::CropRegion;

/// One of the two alternating output files of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// The other slot.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "a",
            Self::B => "b",
        })
    }
}

/// Files written by one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedOutput {
    pub slot: Slot,
    pub image: PathBuf,
    /// Per-display crops, in display order, when piece export is on.
    pub pieces: Vec<PathBuf>,
}

/// Directory holding the output slots of every profile.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    #[must_use]
    pub fn path(&self) -> &Path { &self.dir }

    /// Path of a profile's composite in `slot`.
    #[must_use]
    pub fn slot_path(&self, profile: &str, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}-{slot}.png", file_stem(profile)))
    }

    /// Path of the `index`-th display crop of a profile's `slot`.
    #[must_use]
    pub fn piece_path(&self, profile: &str, slot: Slot, index: usize) -> PathBuf {
        self.dir.join(format!("{}-{slot}-crop-{index}.png", file_stem(profile)))
    }

    /// The slot the next commit writes to: the first missing slot, or the
    /// older one when both exist.
    #[must_use]
    pub fn next_slot(&self, profile: &str) -> Slot {
        if let Some(missing) =
            [Slot::A, Slot::B].into_iter().find(|slot| !self.slot_path(profile, *slot).is_file())
        {
            return missing;
        }
        self.latest(profile).map_or(Slot::A, |(newest, _)| newest.other())
    }

    /// The most recently written slot of a profile, if any.
    #[must_use]
    pub fn latest(&self, profile: &str) -> Option<(Slot, PathBuf)> {
        [Slot::A, Slot::B]
            .into_iter()
            .filter_map(|slot| {
                let path = self.slot_path(profile, slot);
                let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok()?;
                Some((modified, slot, path))
            })
            .max_by_key(|(modified, _, _)| *modified)
            .map(|(_, slot, path)| (slot, path))
    }

    /// Writes a composite (and optionally its per-display crops) to the next
    /// slot, then removes the stale slot.
    ///
    /// `pieces` are the displays' true regions on the composite.
    ///
    /// # Errors
    ///
    /// Returns an error if the new files cannot be written. Failing to remove
    /// stale files is only logged.
    pub fn commit(
        &self,
        profile: &str,
        image: &RgbImage,
        pieces: Option<&[CropRegion]>,
    ) -> Result<CommittedOutput, ProcessingError> {
        enter_stage(JobStage::Commit, None);
        let slot = self.next_slot(profile);
        let path = self.slot_path(profile, slot);
        processing::save_png(image, &path)?;

        let mut piece_paths = Vec::new();
        for (index, region) in pieces.unwrap_or_default().iter().enumerate() {
            let piece_path = self.piece_path(profile, slot, index);
            processing::save_png(&processing::crop(image, region)?, &piece_path)?;
            piece_paths.push(piece_path);
        }

        self.remove_slot(profile, slot.other());
        tracing::info!(profile, %slot, path = %path.display(), "wallpaper written");

        Ok(CommittedOutput { slot, image: path, pieces: piece_paths })
    }

    /// Lists the crop pieces of a profile's slot, in display order.
    #[must_use]
    pub fn pieces(&self, profile: &str, slot: Slot) -> Vec<PathBuf> {
        (0..)
            .map(|index| self.piece_path(profile, slot, index))
            .take_while(|path| path.is_file())
            .collect()
    }

    /// Removes a slot's composite and its crop pieces.
    fn remove_slot(&self, profile: &str, slot: Slot) {
        let stale = self.slot_path(profile, slot);
        let piece_prefix = format!("{}-{slot}-crop-", file_stem(profile));

        let mut targets = vec![stale];
        if let Ok(entries) = fs::read_dir(&self.dir) {
            targets.extend(
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.file_name()
                            .and_then(|name| name.to_str())
                            .is_some_and(|name| is_piece_name(name, &piece_prefix))
                    }),
            );
        }

        for path in targets.into_iter().filter(|path| path.exists()) {
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!(error = %err, path = %path.display(), "failed to remove stale wallpaper");
            }
        }
    }
}

/// True for `{prefix}{index}.png`, where `index` is a decimal number.
fn is_piece_name(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Makes a profile name safe to use in a file name.
fn file_stem(profile: &str) -> String {
    let stem: String = profile
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "wallpaper".to_string() } else { stem }
}
