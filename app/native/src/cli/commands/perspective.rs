//! Perspective inspection CLI command.

use clap::Args;
use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::context::Context;
use crate::cli::output;
use crate::display::{Projection, project};
use crate::error::PaperspanError;

/// Show how a perspective profile projects the displays.
#[derive(Args, Debug)]
pub struct PerspectiveArgs {
    /// Perspective profile name, or `default` for the display set's default.
    #[arg(value_name = "NAME", default_value = crate::display::store::PERSPECTIVE_DEFAULT)]
    pub name: String,

    /// Output as JSON.
    #[arg(long, short)]
    pub json: bool,
}

/// Execute `paperspan perspective`: projects every display with the profile.
pub fn execute(args: &PerspectiveArgs) -> Result<(), PaperspanError> {
    let ctx = Context::load();
    let system = ctx.base_system()?;
    let profile = ctx.perspective(&args.name, &system)?.ok_or_else(|| {
        PaperspanError::InvalidArguments(format!(
            "Perspective '{}' is disabled for this display set",
            args.name
        ))
    })?;

    profile.validate(system.len())?;
    let projection = project(&system.normalized_crops(), &profile)?;

    if args.json {
        output::print_json(&serde_json::to_value(&projection)?);
    } else {
        print_projection(&projection);
    }
    Ok(())
}

fn print_projection(projection: &Projection) {
    #[derive(Tabled)]
    struct QuadRow {
        #[tabled(rename = "ID")]
        id: usize,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Crop")]
        crop: String,
        #[tabled(rename = "Corners")]
        corners: String,
        #[tabled(rename = "Coefficients")]
        coeffs: String,
    }

    let rows: Vec<QuadRow> = projection
        .displays
        .iter()
        .map(|display| QuadRow {
            id: display.id.index(),
            target: display.target.to_string(),
            crop: display.crop.to_string(),
            corners: display
                .quad
                .corners
                .iter()
                .map(|(x, y)| format!("({x:.1}, {y:.1})"))
                .collect::<Vec<_>>()
                .join("\n"),
            coeffs: display.coeffs.0.iter().map(|c| format!("{c:.5}")).collect::<Vec<_>>().join("\n"),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
        .to_string();

    println!("{}", format!("Projected displays ({})", projection.displays.len()).bold());
    println!("{table}");
    println!("{} {}", "Working canvas:".dimmed(), projection.working_canvas);
}
