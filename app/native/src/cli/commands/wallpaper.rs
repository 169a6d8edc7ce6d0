//! Wallpaper CLI commands.
//!
//! `set` composites the given images once; `apply` runs a configured profile.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use super::context::Context;
use super::types::{CliSpanMode, Diagonals, FloatPairs, IndexGroups, IntPairs};
use crate::cli::output;
use crate::config::ProfileConfig;
use crate::constants::APP_NAME;
use crate::display::store::PERSPECTIVE_DEFAULT;
use crate::error::PaperspanError;
use crate::wallpaper::{ImageSelector, Job, JobReport, WallpaperManager};

/// Composite images into a spanned wallpaper and set it.
#[derive(Args, Debug)]
#[command(
    verbatim_doc_comment,
    after_long_help = r#"Examples:
  paperspan set wide.jpg                                  # One image over the whole desktop
  paperspan set --mode multi left.jpg right.jpg           # One image per display
  paperspan set --mode advanced --span-groups "0,1;2" a.jpg b.jpg
  paperspan set --mode advanced --perspective desk wide.jpg"#
)]
pub struct SetArgs {
    /// Source images, one per span group (or per display in multi mode).
    #[arg(value_name = "IMAGES", required = true)]
    pub images: Vec<PathBuf>,

    /// How images are spread across the displays.
    #[arg(long, short, value_enum, default_value_t = CliSpanMode::Single)]
    pub mode: CliSpanMode,

    /// Span groups as display indices, e.g. "0,1;2".
    #[arg(long, value_name = "GROUPS")]
    pub span_groups: Option<IndexGroups>,

    /// Perspective profile name, `default` or `disabled`.
    #[arg(long, short, default_value = PERSPECTIVE_DEFAULT)]
    pub perspective: String,

    /// Manual offsets in normalized pixels, e.g. "0,0;-12,40".
    #[arg(long, value_name = "X,Y;...")]
    pub offsets: Option<IntPairs>,

    /// Right and bottom bezels in millimetres, e.g. "9.5,0;9.5,0".
    #[arg(long, value_name = "R,B;...")]
    pub bezels: Option<FloatPairs>,

    /// Diagonal sizes in inches, `auto` keeps the reported size, e.g. "27;auto".
    #[arg(long, value_name = "INCHES;...")]
    pub inches: Option<Diagonals>,

    /// Skip pixel density correction.
    #[arg(long)]
    pub no_ppi: bool,

    /// Allow a composite canvas larger than the configured budget.
    #[arg(long)]
    pub allow_large_canvas: bool,

    /// Also write one cropped piece per display.
    #[arg(long)]
    pub pieces: bool,

    /// Write the wallpaper without setting it.
    #[arg(long)]
    pub no_apply: bool,

    /// Output the report as JSON.
    #[arg(long, short)]
    pub json: bool,
}

impl SetArgs {
    /// The profile these arguments describe.
    fn profile(&self) -> ProfileConfig {
        ProfileConfig {
            span_mode: self.mode.into(),
            span_groups: self.span_groups.clone().map(|groups| groups.0).unwrap_or_default(),
            ppi: !self.no_ppi,
            diagonal_inches: self.inches.clone().map(|inches| inches.0).unwrap_or_default(),
            bezels: self.bezels.clone().map(|bezels| bezels.0).unwrap_or_default(),
            offsets: self.offsets.clone().map(|offsets| offsets.0).unwrap_or_default(),
            perspective: self.perspective.clone(),
            ..ProfileConfig::default()
        }
    }
}

/// Run a wallpaper profile from the configuration file.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Name of a profile from the configuration file.
    #[arg(value_name = "PROFILE")]
    pub profile: String,

    /// Set the profile's newest wallpaper again instead of making a new one.
    #[arg(long)]
    pub last: bool,

    /// Write the wallpaper without setting it.
    #[arg(long, conflicts_with = "last")]
    pub no_apply: bool,

    /// Output the report as JSON.
    #[arg(long, short)]
    pub json: bool,
}

/// Builds a job for `profile` and the manager that runs it.
fn prepare(
    ctx: &Context,
    name: &str,
    profile: &ProfileConfig,
) -> Result<(WallpaperManager, Job), PaperspanError> {
    let system = ctx.system_for(profile)?;
    let perspective = ctx.perspective(&profile.perspective, &system)?;

    let mut job = Job::new(name, profile.span_mode);
    job.groups.clone_from(&profile.span_groups);
    job.perspective = perspective;
    job.export_pieces = ctx.config.general.export_pieces;
    Ok((ctx.manager(system), job))
}

/// Execute `paperspan set`.
pub fn execute_set(args: &SetArgs) -> Result<(), PaperspanError> {
    let ctx = Context::load();
    let (manager, mut job) = prepare(&ctx, APP_NAME, &args.profile())?;
    job.sources.clone_from(&args.images);
    job.allow_large_canvas = args.allow_large_canvas;
    job.export_pieces |= args.pieces;
    job.apply = !args.no_apply;

    let report = manager.run(&job)?;
    print_report(&report, args.json)
}

/// Execute `paperspan apply`.
pub fn execute_apply(args: &ApplyArgs) -> Result<(), PaperspanError> {
    let ctx = Context::load();
    let profile = ctx.config.profile(&args.profile)?;

    if args.last {
        let manager = ctx.manager(ctx.system_for(profile)?);
        let path = manager.apply_last(&args.profile)?;
        if args.json {
            output::print_json(&serde_json::json!({
                "profile": args.profile,
                "image": path,
                "applied": true,
            }));
        } else {
            println!("{} {}", "Applied".green().bold(), path.display());
        }
        return Ok(());
    }

    let mut selector = ImageSelector::new(profile.resolved_paths(&ctx.base_dir), profile.sort_mode)?;
    let (manager, mut job) = prepare(&ctx, &args.profile, profile)?;
    job.apply = !args.no_apply;

    let report = manager.run_next(job, &mut selector)?;
    print_report(&report, args.json)
}

fn print_report(report: &JobReport, json: bool) -> Result<(), PaperspanError> {
    if json {
        output::print_json(&serde_json::to_value(report)?);
        return Ok(());
    }

    let verb = if report.applied { "Applied" } else { "Written" };
    println!(
        "{} {} {}",
        verb.green().bold(),
        report.output.image.display(),
        format!("(slot {})", report.output.slot).dimmed()
    );
    for source in &report.sources {
        println!("  {} {}", "source".dimmed(), source.display());
    }
    for piece in &report.output.pieces {
        println!("  {} {}", "piece".dimmed(), piece.display());
    }
    for failure in &report.failures {
        println!("  {} {failure}", "skipped".yellow());
    }
    Ok(())
}
