//! Image primitives for compositing.
//!
//! Everything here works on `RgbImage`: wallpapers have no transparency, so
//! uncovered areas are filled with black.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ImageReader, Rgb, RgbImage};
use natord::compare;
use rayon::prelude::*;
use thiserror::Error;

use crate::display::{CropRegion, Position, ProjectiveCoeffs, Resolution};

/// Supported image file extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// Filter used for every resize.
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Errors that can occur during image processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    #[error("Failed to read image {path}: {reason}")]
    ImageRead { path: String, reason: String },

    #[error("Failed to save image {path}: {reason}")]
    ImageSave { path: String, reason: String },

    #[error("Failed to create output directory: {0}")]
    OutputDirectory(String),

    #[error("Image {0} has no pixels")]
    EmptyImage(String),

    #[error("Cannot resize to an empty {0} target")]
    EmptyTarget(Resolution),

    #[error("Region {region} does not fit a {width}x{height} image")]
    OutOfBounds { region: CropRegion, width: u32, height: u32 },
}

/// Checks if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Lists supported images in a directory, naturally sorted.
#[must_use]
pub fn list_images_in_directory(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut images = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) {
                images.push(path);
            }
        }
    }

    images.sort_by(|a, b| compare(a.to_string_lossy().as_ref(), b.to_string_lossy().as_ref()));
    images
}

/// Decodes an image file into RGB.
///
/// # Errors
///
/// Returns [`ProcessingError::ImageRead`] if the file cannot be opened or
/// decoded, and [`ProcessingError::EmptyImage`] for a zero-sized image.
pub fn load_image(path: &Path) -> Result<RgbImage, ProcessingError> {
    let read_error = |reason: String| ProcessingError::ImageRead {
        path: path.display().to_string(),
        reason,
    };

    let image = ImageReader::open(path)
        .map_err(|err| read_error(err.to_string()))?
        .with_guessed_format()
        .map_err(|err| read_error(err.to_string()))?
        .decode()
        .map_err(|err| read_error(err.to_string()))?
        .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(ProcessingError::EmptyImage(path.display().to_string()));
    }
    Ok(image)
}

/// Writes an image as PNG, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_png(image: &RgbImage, path: &Path) -> Result<(), ProcessingError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|_| ProcessingError::OutputDirectory(parent.display().to_string()))?;
    }

    let save_error = |reason: String| ProcessingError::ImageSave {
        path: path.display().to_string(),
        reason,
    };
    let file = File::create(path).map_err(|err| save_error(err.to_string()))?;
    let writer = BufWriter::new(file);
    image
        .write_with_encoder(PngEncoder::new(writer))
        .map_err(|err| save_error(err.to_string()))
}

/// Scales an image to cover `target` and center-crops the excess.
///
/// The source is scaled along the constraining axis so it is at least as
/// large as the target on both axes, preserving its aspect ratio; the other
/// axis is then cropped symmetrically. The result is always exactly `target`.
///
/// # Errors
///
/// Returns [`ProcessingError::EmptyTarget`] for a zero-sized target and
/// [`ProcessingError::EmptyImage`] for a zero-sized source.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resize_to_fill(image: &RgbImage, target: Resolution) -> Result<RgbImage, ProcessingError> {
    if target.is_empty() {
        return Err(ProcessingError::EmptyTarget(target));
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessingError::EmptyImage(format!("{width}x{height}")));
    }
    if (width, height) == (target.width, target.height) {
        return Ok(image.clone());
    }

    let image_ratio = f64::from(width) / f64::from(height);
    let scale = if image_ratio < target.aspect_ratio() {
        f64::from(target.width) / f64::from(width)
    } else {
        f64::from(target.height) / f64::from(height)
    };

    let scaled_width = ((f64::from(width) * scale).round() as u32).max(target.width);
    let scaled_height = ((f64::from(height) * scale).round() as u32).max(target.height);
    let resized = imageops::resize(image, scaled_width, scaled_height, RESIZE_FILTER);

    let crop_x = (f64::from(scaled_width - target.width) / 2.0).round() as u32;
    let crop_y = (f64::from(scaled_height - target.height) / 2.0).round() as u32;

    Ok(imageops::crop_imm(&resized, crop_x, crop_y, target.width, target.height).to_image())
}

/// Resizes to exactly `target`, skipping the work when the size already matches.
///
/// # Errors
///
/// Returns [`ProcessingError::EmptyTarget`] for a zero-sized target.
pub fn resize_exact(image: &RgbImage, target: Resolution) -> Result<RgbImage, ProcessingError> {
    if target.is_empty() {
        return Err(ProcessingError::EmptyTarget(target));
    }
    if image.dimensions() == (target.width, target.height) {
        return Ok(image.clone());
    }
    Ok(imageops::resize(image, target.width, target.height, RESIZE_FILTER))
}

/// Copies `region` out of `image`.
///
/// # Errors
///
/// Returns [`ProcessingError::OutOfBounds`] if the region is empty or does
/// not fit inside the image.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn crop(image: &RgbImage, region: &CropRegion) -> Result<RgbImage, ProcessingError> {
    let canvas = Resolution::new(image.width(), image.height());
    if !region.is_valid() || !region.fits_within(canvas) {
        return Err(ProcessingError::OutOfBounds {
            region: *region,
            width: canvas.width,
            height: canvas.height,
        });
    }

    let size = region.size();
    Ok(imageops::crop_imm(image, region.left as u32, region.top as u32, size.width, size.height)
        .to_image())
}

/// Pastes `piece` onto `canvas` with its top-left corner at `at`.
///
/// # Errors
///
/// Returns [`ProcessingError::OutOfBounds`] if the piece would not fit.
pub fn paste(canvas: &mut RgbImage, piece: &RgbImage, at: Position) -> Result<(), ProcessingError> {
    let region = CropRegion::from_origin_size(at, Resolution::new(piece.width(), piece.height()));
    let bounds = Resolution::new(canvas.width(), canvas.height());
    if !region.fits_within(bounds) {
        return Err(ProcessingError::OutOfBounds {
            region,
            width: bounds.width,
            height: bounds.height,
        });
    }

    imageops::replace(canvas, piece, at.x, at.y);
    Ok(())
}

/// Renders `region` of a projectively warped image.
///
/// Each output pixel center `(x, y)` inside `region` is mapped through
/// `coeffs` to a point in the source's coordinate space; `source_origin` is
/// where the source image's top-left corner sits in that space. The source
/// is sampled bilinearly and points outside it come out black. Rows are
/// rendered in parallel.
///
/// # Errors
///
/// Returns [`ProcessingError::EmptyTarget`] for an empty region.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn warp_region(
    source: &RgbImage,
    coeffs: &ProjectiveCoeffs,
    region: &CropRegion,
    source_origin: Position,
) -> Result<RgbImage, ProcessingError> {
    let size = region.size();
    if size.is_empty() {
        return Err(ProcessingError::EmptyTarget(size));
    }

    let mut output = RgbImage::new(size.width, size.height);
    let row_len = size.width as usize * 3;
    let (origin_x, origin_y) = (source_origin.x as f64, source_origin.y as f64);

    output.par_chunks_mut(row_len).enumerate().for_each(|(row, pixels)| {
        let y = (region.top + row as i64) as f64 + 0.5;
        for (column, pixel) in pixels.chunks_exact_mut(3).enumerate() {
            let x = (region.left + column as i64) as f64 + 0.5;
            let color = coeffs
                .apply(x, y)
                .and_then(|(sx, sy)| sample_bilinear(source, sx - origin_x - 0.5, sy - origin_y - 0.5))
                .unwrap_or(BLACK);
            pixel.copy_from_slice(&color.0);
        }
    });

    Ok(output)
}

/// Samples `image` at a continuous pixel coordinate, where `(0.0, 0.0)` is the
/// center of the top-left pixel. Returns `None` outside the image.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Option<Rgb<u8>> {
    let (width, height) = image.dimensions();
    let (max_x, max_y) = (f64::from(width) - 1.0, f64::from(height) - 1.0);
    if !x.is_finite() || !y.is_finite() || x < -0.5 || y < -0.5 || x > max_x + 0.5 || y > max_y + 0.5 {
        return None;
    }

    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (fx, fy) = (x - f64::from(x0), y - f64::from(y0));

    let top_left = image.get_pixel(x0, y0).0;
    let top_right = image.get_pixel(x1, y0).0;
    let bottom_left = image.get_pixel(x0, y1).0;
    let bottom_right = image.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for (channel, value) in out.iter_mut().enumerate() {
        let top = f64::from(top_left[channel]).mul_add(1.0 - fx, f64::from(top_right[channel]) * fx);
        let bottom =
            f64::from(bottom_left[channel]).mul_add(1.0 - fx, f64::from(bottom_right[channel]) * fx);
        *value = top.mul_add(1.0 - fy, bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(out))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::display::solve_coefficients;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    // ========================================================================
    // File tests
    // ========================================================================

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.JPEG")));
        assert!(is_supported_image(Path::new("test.png")));
        assert!(is_supported_image(Path::new("test.webp")));
        assert!(is_supported_image(Path::new("test.tiff")));
        assert!(is_supported_image(Path::new("test.bmp")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test")));
        assert!(!is_supported_image(Path::new(".png.txt")));
    }

    #[test]
    fn test_supported_extensions_are_lowercase() {
        for ext in SUPPORTED_EXTENSIONS {
            assert_eq!(*ext, ext.to_lowercase());
        }
    }

    #[test]
    fn test_list_images_uses_natural_order() {
        let dir = TempDir::new().unwrap();
        for name in ["img10.png", "img2.png", "img1.jpg", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<_> = list_images_in_directory(dir.path())
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["img1.jpg", "img2.png", "img10.png"]);
    }

    #[test]
    fn test_list_images_missing_directory() {
        assert!(list_images_in_directory(Path::new("/nonexistent/paperspan")).is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let image = gradient(8, 4);
        save_png(&image, &path).unwrap();
        assert_eq!(load_image(&path).unwrap(), image);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_image(Path::new("/nonexistent/image.png")),
            Err(ProcessingError::ImageRead { .. })
        ));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_image(&path), Err(ProcessingError::ImageRead { .. })));
    }

    // ========================================================================
    // resize_to_fill tests
    // ========================================================================

    #[test]
    fn test_resize_to_fill_much_wider_source() {
        let resized = resize_to_fill(&gradient(1000, 50), Resolution::new(160, 90)).unwrap();
        assert_eq!(resized.dimensions(), (160, 90));
    }

    #[test]
    fn test_resize_to_fill_much_taller_source() {
        let resized = resize_to_fill(&gradient(40, 900), Resolution::new(160, 90)).unwrap();
        assert_eq!(resized.dimensions(), (160, 90));
    }

    #[test]
    fn test_resize_to_fill_odd_sizes() {
        for (source, target) in [((101, 77), (33, 61)), ((3, 3), (640, 7)), ((7, 640), (3, 3))] {
            let resized =
                resize_to_fill(&gradient(source.0, source.1), Resolution::new(target.0, target.1))
                    .unwrap();
            assert_eq!(resized.dimensions(), target);
        }
    }

    #[test]
    fn test_resize_to_fill_same_size_is_unchanged() {
        let image = gradient(32, 16);
        assert_eq!(resize_to_fill(&image, Resolution::new(32, 16)).unwrap(), image);
    }

    #[test]
    fn test_resize_to_fill_crops_symmetrically() {
        // Left and right thirds are red, the middle third green.
        let image = RgbImage::from_fn(300, 100, |x, _| {
            if (100..200).contains(&x) { Rgb([0, 255, 0]) } else { Rgb([255, 0, 0]) }
        });
        let resized = resize_to_fill(&image, Resolution::new(100, 100)).unwrap();
        assert_eq!(resized.get_pixel(50, 50), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_resize_to_fill_empty_target() {
        assert!(matches!(
            resize_to_fill(&gradient(4, 4), Resolution::new(0, 10)),
            Err(ProcessingError::EmptyTarget(_))
        ));
    }

    // ========================================================================
    // crop / paste tests
    // ========================================================================

    #[test]
    fn test_crop_region() {
        let image = gradient(20, 10);
        let piece = crop(&image, &CropRegion::new(5, 2, 15, 8)).unwrap();
        assert_eq!(piece.dimensions(), (10, 6));
        assert_eq!(piece.get_pixel(0, 0), image.get_pixel(5, 2));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let image = gradient(20, 10);
        assert!(matches!(
            crop(&image, &CropRegion::new(15, 0, 25, 10)),
            Err(ProcessingError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_paste_places_piece() {
        let mut canvas = RgbImage::new(10, 10);
        let piece = RgbImage::from_pixel(3, 2, Rgb([9, 9, 9]));
        paste(&mut canvas, &piece, Position::new(7, 8)).unwrap();
        assert_eq!(canvas.get_pixel(7, 8), &Rgb([9, 9, 9]));
        assert_eq!(canvas.get_pixel(9, 9), &Rgb([9, 9, 9]));
        assert_eq!(canvas.get_pixel(6, 8), &BLACK);
    }

    #[test]
    fn test_paste_rejects_overflow() {
        let mut canvas = RgbImage::new(10, 10);
        let piece = RgbImage::new(4, 4);
        assert!(paste(&mut canvas, &piece, Position::new(8, 0)).is_err());
    }

    // ========================================================================
    // warp_region tests
    // ========================================================================

    #[test]
    fn test_identity_warp_equals_crop() {
        let image = gradient(40, 30);
        let region = CropRegion::new(10, 5, 30, 25);
        let warped =
            warp_region(&image, &ProjectiveCoeffs::IDENTITY, &region, Position::default()).unwrap();
        assert_eq!(warped, crop(&image, &region).unwrap());
    }

    #[test]
    fn test_identity_warp_honors_source_origin() {
        let image = gradient(40, 30);
        let region = CropRegion::new(110, 205, 120, 215);
        let warped =
            warp_region(&image, &ProjectiveCoeffs::IDENTITY, &region, Position::new(100, 200)).unwrap();
        assert_eq!(warped, crop(&image, &CropRegion::new(10, 5, 20, 15)).unwrap());
    }

    #[test]
    fn test_warp_outside_source_is_black() {
        let image = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let shift = ProjectiveCoeffs([1.0, 0.0, 50.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let warped = warp_region(&image, &shift, &CropRegion::new(0, 0, 10, 10), Position::default())
            .unwrap();
        assert!(warped.pixels().all(|pixel| *pixel == BLACK));
    }

    #[test]
    fn test_warp_scaling_samples_the_whole_source() {
        // Output is half the size of the source in both axes.
        let target = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let source = [(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
        let coeffs = solve_coefficients(target, source).unwrap();

        let image = RgbImage::from_fn(20, 20, |x, _| if x < 10 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let warped = warp_region(&image, &coeffs, &CropRegion::new(0, 0, 10, 10), Position::default())
            .unwrap();
        assert_eq!(warped.get_pixel(1, 5), &Rgb([0, 0, 0]));
        assert_eq!(warped.get_pixel(8, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_warp_empty_region() {
        let image = gradient(4, 4);
        assert!(
            warp_region(&image, &ProjectiveCoeffs::IDENTITY, &CropRegion::new(2, 2, 2, 4), Position::default())
                .is_err()
        );
    }
}
