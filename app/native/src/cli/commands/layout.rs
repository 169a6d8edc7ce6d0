//! Display layout CLI command.

use clap::Args;
use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::context::Context;
use crate::cli::output;
use crate::display::store::{PERSPECTIVE_DEFAULT, PERSPECTIVE_DISABLED};
use crate::display::{DisplaySystem, StoreError, display_set_key};
use crate::error::PaperspanError;

/// Show the display layout.
#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Show the layout as seen by this profile.
    #[arg(long, short)]
    pub profile: Option<String>,

    /// Make NAME the display set's default perspective, or `disabled`.
    #[arg(long, value_name = "NAME")]
    pub default_perspective: Option<String>,

    /// Store the resulting geometry for this display set.
    #[arg(long)]
    pub save: bool,

    /// Output as JSON.
    #[arg(long, short)]
    pub json: bool,
}

/// Execute `paperspan layout`.
pub fn execute(args: &LayoutArgs) -> Result<(), PaperspanError> {
    let ctx = Context::load();
    let profile = args.profile.as_deref().map(|name| ctx.config.profile(name)).transpose()?;
    let perspectives = ctx.config.perspective_store();

    if let Some(name) = args.default_perspective.as_deref() {
        let known = name == PERSPECTIVE_DISABLED
            || (name != PERSPECTIVE_DEFAULT && perspectives.get(name).is_some());
        if !known {
            return Err(StoreError::UnknownPerspective(name.to_string()).into());
        }
    }

    let system = ctx.system_with(|base| {
        let mut settings = profile.map_or_else(|| base.clone(), |profile| profile.geometry(base));
        match args.default_perspective.as_deref() {
            Some(PERSPECTIVE_DISABLED) => settings.perspective_enabled = false,
            Some(name) => {
                settings.perspective_enabled = true;
                settings.default_perspective = Some(name.to_string());
            }
            None => {}
        }
        settings
    })?;

    if args.save {
        ctx.store.persist(&system)?;
        tracing::info!(path = %ctx.store.path().display(), "geometry saved");
    }

    if args.json {
        output::print_json(&layout_json(&system));
    } else {
        print_layout(&system);
        if args.save {
            println!("{} {}", "Saved to".green(), ctx.store.path().display());
        }
    }
    Ok(())
}

fn layout_json(system: &DisplaySystem) -> serde_json::Value {
    let crops = system.normalized_crops();
    let displays: Vec<_> = system
        .displays()
        .iter()
        .zip(system.normalized())
        .zip(&crops)
        .map(|((display, normalized), crop)| {
            serde_json::json!({
                "id": display.id(),
                "name": display.name(),
                "resolution": display.resolution(),
                "offset": display.digital_offset(),
                "diagonalInches": display.physical_size().diagonal_inches(),
                "sizeDetected": !display.physical_size_detection_failed(),
                "ppi": display.ppi(),
                "normalizedResolution": normalized.ppi_norm_resolution,
                "normalizedOffset": normalized.ppi_norm_offset,
                "crop": crop.region,
            })
        })
        .collect();

    serde_json::json!({
        "key": display_set_key(system.detected()),
        "maxPpi": system.max_ppi(),
        "ppiCorrected": system.ppi_corrected(),
        "perspectiveEnabled": system.perspective_enabled(),
        "defaultPerspective": system.default_perspective(),
        "trueCanvas": system.true_canvas(),
        "displays": displays,
    })
}

fn print_layout(system: &DisplaySystem) {
    #[derive(Tabled)]
    struct DisplayRow {
        #[tabled(rename = "ID")]
        id: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Resolution")]
        resolution: String,
        #[tabled(rename = "Offset")]
        offset: String,
        #[tabled(rename = "Diagonal")]
        diagonal: String,
        #[tabled(rename = "PPI")]
        ppi: String,
        #[tabled(rename = "Normalized")]
        normalized: String,
        #[tabled(rename = "Crop")]
        crop: String,
        #[tabled(rename = "Size")]
        detected: String,
    }

    let crops = system.normalized_crops();
    let rows: Vec<DisplayRow> = system
        .displays()
        .iter()
        .zip(system.normalized())
        .zip(&crops)
        .map(|((display, normalized), crop)| DisplayRow {
            id: display.id().index(),
            name: output::fit(display.name(), 24),
            resolution: display.resolution().to_string(),
            offset: display.digital_offset().to_string(),
            diagonal: format!("{:.1}\"", display.physical_size().diagonal_inches()),
            ppi: format!("{:.1}", display.ppi()),
            normalized: normalized.ppi_norm_resolution.to_string(),
            crop: crop.region.to_string(),
            detected: output::size_source(!display.physical_size_detection_failed()),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .with(Modify::new(Columns::new(2..8)).with(Alignment::right()))
        .with(Modify::new(Columns::last()).with(Alignment::center()))
        .to_string();

    println!("{}", format!("Displays ({})", system.len()).bold());
    println!("{table}");

    let correction = if system.ppi_corrected() {
        format!("normalized to {:.1} PPI", system.max_ppi())
    } else {
        "off".to_string()
    };
    println!("{} {correction}", "Density correction:".dimmed());
    println!("{} {}", "True canvas:".dimmed(), system.true_canvas());
    let perspective = match (system.perspective_enabled(), system.default_perspective()) {
        (true, Some(name)) => name.to_string(),
        _ => PERSPECTIVE_DISABLED.to_string(),
    };
    println!("{} {perspective}", "Perspective:".dimmed());
}
