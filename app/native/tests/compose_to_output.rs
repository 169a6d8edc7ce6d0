//! End-to-end tests: configuration to display system to written wallpaper.
//!
//! ```bash
//! cargo test -p paperspan --test compose_to_output
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use paperspan_lib::config::load_config_from_path;
use paperspan_lib::display::{
    DisplayId, DisplayModel, DisplaySystem, GeometrySettings, GeometryStore, PhysicalSize, Position,
    Resolution, SharedDisplaySystem, SpanMode,
};
use paperspan_lib::wallpaper::{
    CompositeRequest, Job, OutputDir, SetterError, WallpaperManager, WallpaperSetter, compose,
};
use parking_lot::Mutex;
use tempfile::TempDir;

const RED: Rgb<u8> = Rgb([220, 30, 30]);
const BLUE: Rgb<u8> = Rgb([30, 30, 220]);

// ============================================================================
// Helpers
// ============================================================================

#[derive(Default)]
struct RecordingSetter {
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl WallpaperSetter for RecordingSetter {
    fn set(&self, image: &Path, _sources: &[PathBuf]) -> Result<(), SetterError> {
        self.calls.lock().push(image.to_path_buf());
        Ok(())
    }
}

/// Two 192x108 panels side by side; the second one has a 12" diagonal
/// against the first one's 24", so it is twice as dense.
fn mixed_density_displays() -> Vec<DisplayModel> {
    let resolution = Resolution::new(192, 108);
    vec![
        DisplayModel::new(
            DisplayId(0),
            "left",
            resolution,
            Position::new(0, 0),
            Some(PhysicalSize::from_diagonal_inches(24.0, resolution)),
        ),
        DisplayModel::new(
            DisplayId(1),
            "right",
            resolution,
            Position::new(192, 0),
            Some(PhysicalSize::from_diagonal_inches(12.0, resolution)),
        ),
    ]
}

fn write_source(dir: &TempDir, name: &str, width: u32, height: u32, color: Rgb<u8>) -> PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(width, height, color).save(&path).unwrap();
    path
}

fn assert_close(actual: Rgb<u8>, expected: Rgb<u8>) {
    for (a, e) in actual.0.iter().zip(expected.0) {
        assert!(a.abs_diff(e) <= 3, "pixel {actual:?} is not close to {expected:?}");
    }
}

// ============================================================================
// Compositing
// ============================================================================

#[test]
fn test_mixed_density_span_fills_true_desktop() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "wide.png", 800, 200, RED);
    let system = DisplaySystem::new(mixed_density_displays()).unwrap();

    // The denser display keeps its resolution, the other one doubles.
    assert_eq!(system.normalized()[0].ppi_norm_resolution, Resolution::new(384, 216));
    assert_eq!(system.normalized()[1].ppi_norm_resolution, Resolution::new(192, 108));

    let request = CompositeRequest::new(&system, SpanMode::Advanced, vec![source]);
    let outcome = compose(&request).unwrap();

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.image.dimensions(), (384, 108));
    assert_close(*outcome.image.get_pixel(96, 54), RED);
    assert_close(*outcome.image.get_pixel(288, 54), RED);
}

#[test]
fn test_multi_mode_gives_each_display_its_own_image() {
    let dir = TempDir::new().unwrap();
    let left = write_source(&dir, "left.png", 320, 180, RED);
    let right = write_source(&dir, "right.png", 320, 180, BLUE);
    let system = DisplaySystem::new(mixed_density_displays()).unwrap();

    let request = CompositeRequest::new(&system, SpanMode::Multi, vec![left, right]);
    let outcome = compose(&request).unwrap();

    assert_eq!(outcome.image.dimensions(), (384, 108));
    assert_close(*outcome.image.get_pixel(10, 10), RED);
    assert_close(*outcome.image.get_pixel(380, 100), BLUE);
}

// ============================================================================
// Manager and output slots
// ============================================================================

#[test]
fn test_manager_alternates_slots_and_exports_pieces() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "wide.png", 800, 200, BLUE);
    let setter = RecordingSetter::default();
    let calls = Arc::clone(&setter.calls);
    let output = dir.path().join("out");

    let manager = WallpaperManager::new(
        SharedDisplaySystem::new(DisplaySystem::new(mixed_density_displays()).unwrap()),
        OutputDir::new(&output),
        Box::new(setter),
    );

    let mut job = Job::new("desk", SpanMode::Advanced);
    job.sources = vec![source];
    job.export_pieces = true;

    let first = manager.run(&job).unwrap();
    let second = manager.run(&job).unwrap();

    assert_ne!(first.output.slot, second.output.slot);
    assert!(!first.output.image.exists(), "stale slot should be removed");
    assert!(second.output.image.is_file());
    assert_eq!(second.output.pieces.len(), 2);
    for piece in &second.output.pieces {
        assert_eq!(image::image_dimensions(piece).unwrap(), (192, 108));
    }
    assert_eq!(calls.lock().as_slice(), [first.output.image.clone(), second.output.image.clone()]);

    let reapplied = manager.apply_last("desk").unwrap();
    assert_eq!(reapplied, second.output.image);
    assert_eq!(calls.lock().len(), 3);
}

// ============================================================================
// Configuration and stored geometry
// ============================================================================

#[test]
fn test_config_profile_and_stored_geometry() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("paperspan.jsonc");
    fs::write(
        &config_path,
        r#"{
            // Laptop on the right, slightly lower than the monitor
            "displays": [
                { "name": "eDP-1", "resolution": [192, 108], "offset": [192, 20] },
                { "name": "HDMI-1", "resolution": [192, 108], "offset": [0, 0] }
            ],
            "profiles": {
                "desk": { "spanMode": "advanced", "bezels": [[10, 0], [10, 0]], "diagonalInches": [24, 24] }
            },
            "perspectives": {
                "flat": { "centralDisplay": 0, "viewer": { "depth": 500 },
                          "swivels": [{}, {}], "tilts": [{}, {}] }
            }
        }"#,
    )
    .unwrap();

    let (config, _) = load_config_from_path(&config_path).unwrap();
    let detected = config.detect_displays().unwrap();

    // Sorted by offset: the monitor at x = 0 comes first.
    assert_eq!(detected[0].name(), "HDMI-1");
    assert_eq!(detected[1].digital_offset(), Position::new(192, 20));

    let store = GeometryStore::new(dir.path().join("geometry.json"));
    let system = store.restore(detected.clone()).unwrap();
    let profile = config.profile("desk").unwrap();
    let mut settings = profile.geometry(system.settings());
    settings.perspective_enabled = true;
    settings.default_perspective = Some("flat".to_string());
    let system = system.reconfigure(settings).unwrap();

    // Bezels push the second display right by at least the bezel width.
    let crops = system.normalized_crops();
    assert!(crops[1].region.left > crops[0].region.right);

    store.persist(&system).unwrap();
    let restored = store.restore(detected).unwrap();
    assert_eq!(restored.settings().default_perspective.as_deref(), Some("flat"));
    assert_eq!(restored.normalized_crops(), crops);

    let perspectives = config.perspective_store();
    let perspective = perspectives.resolve("default", &restored).unwrap().unwrap();
    assert!(perspective.is_flat());
    assert_ne!(*restored.settings(), GeometrySettings::default());
}
