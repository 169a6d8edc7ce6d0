//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `cache` - Cache management commands
//! - `context` - Configuration and display system setup shared by commands
//! - `layout` - Display layout inspection
//! - `perspective` - Perspective projection inspection
//! - `types` - Shared types used across commands
//! - `wallpaper` - Compositing and setting wallpapers

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config;
use crate::constants::APP_NAME;
use crate::error::PaperspanError;

pub mod cache;
mod context;
pub mod layout;
pub mod perspective;
pub mod types;
pub mod wallpaper;

pub use cache::CacheCommands;
pub use layout::LayoutArgs;
pub use perspective::PerspectiveArgs;
pub use wallpaper::{ApplyArgs, SetArgs};

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// paperspan - spans wallpapers across monitors of different sizes,
/// densities and angles.
#[derive(Parser, Debug)]
#[command(name = "paperspan")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH", env = "PAPERSPAN_CONFIG")]
    pub config: Option<String>,

    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Composite images into a spanned wallpaper and set it.
    Set(SetArgs),

    /// Run a wallpaper profile from the configuration file.
    ///
    /// Picks the next image of every span group, composites them and sets
    /// the result.
    #[command(after_long_help = r#"Examples:
  paperspan apply desk           # New wallpaper from the "desk" profile
  paperspan apply desk --last    # Set the newest "desk" wallpaper again"#)]
    Apply(ApplyArgs),

    /// Show the display layout.
    ///
    /// Lists every display with its density, normalized size and crop region.
    /// With --save, the geometry is stored for this display set and used by
    /// later runs.
    Layout(LayoutArgs),

    /// Show how a perspective profile projects the displays.
    Perspective(PerspectiveArgs),

    /// Cache management commands.
    ///
    /// Manage the application's cache directory.
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Output paperspan configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// paperspan configuration file. Can be redirected to a file for use with
    /// editors that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    /// Can be used with eval or redirected to a file.
    ///
    /// Usage:
    ///   eval "$(paperspan completions --shell zsh)"
    ///   paperspan completions --shell bash > ~/.local/share/bash-completion/completions/paperspan
    ///   paperspan completions --shell fish > ~/.config/fish/completions/paperspan.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), PaperspanError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(PaperspanError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        match &self.command {
            Commands::Set(args) => wallpaper::execute_set(args),
            Commands::Apply(args) => wallpaper::execute_apply(args),
            Commands::Layout(args) => layout::execute(args),
            Commands::Perspective(args) => perspective::execute(args),
            Commands::Cache(cmd) => cache::execute(cmd),

            Commands::Schema => {
                println!("{}", config::schema::generate_schema_json()?);
                Ok(())
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, APP_NAME, &mut io::stdout());
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::types::CliSpanMode;
    use super::*;

    // ========================================================================
    // CLI parsing tests
    // ========================================================================

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_schema() {
        let cli = Cli::try_parse_from(["paperspan", "schema"]).unwrap();
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn test_cli_parses_completions_zsh() {
        let cli = Cli::try_parse_from(["paperspan", "completions", "--shell", "zsh"]).unwrap();
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Zsh),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_cli_parses_cache_clear() {
        let cli = Cli::try_parse_from(["paperspan", "cache", "clear"]).unwrap();
        assert!(matches!(cli.command, Commands::Cache(CacheCommands::Clear)));
    }

    #[test]
    fn test_cli_parses_cache_path() {
        let cli = Cli::try_parse_from(["paperspan", "cache", "path"]).unwrap();
        assert!(matches!(cli.command, Commands::Cache(CacheCommands::Path)));
    }

    // ========================================================================
    // set / apply tests
    // ========================================================================

    #[test]
    fn test_cli_parses_set_defaults() {
        let cli = Cli::try_parse_from(["paperspan", "set", "wide.jpg"]).unwrap();
        match cli.command {
            Commands::Set(args) => {
                assert_eq!(args.images, vec![PathBuf::from("wide.jpg")]);
                assert_eq!(args.mode, CliSpanMode::Single);
                assert_eq!(args.perspective, "default");
                assert!(args.span_groups.is_none());
                assert!(!args.no_apply);
            }
            _ => panic!("Expected Set command"),
        }
    }

    #[test]
    fn test_cli_parses_set_advanced() {
        let cli = Cli::try_parse_from([
            "paperspan",
            "set",
            "--mode",
            "advanced",
            "--span-groups",
            "0,1;2",
            "--bezels",
            "9.5,0;9.5,0;0,0",
            "--inches",
            "27;auto;24",
            "--perspective",
            "desk",
            "a.jpg",
            "b.jpg",
        ])
        .unwrap();
        match cli.command {
            Commands::Set(args) => {
                assert_eq!(args.mode, CliSpanMode::Advanced);
                assert_eq!(args.span_groups.unwrap().0, vec![vec![0, 1], vec![2]]);
                assert_eq!(args.bezels.unwrap().0.len(), 3);
                assert_eq!(args.inches.unwrap().0, vec![Some(27.0), None, Some(24.0)]);
                assert_eq!(args.perspective, "desk");
                assert_eq!(args.images.len(), 2);
            }
            _ => panic!("Expected Set command"),
        }
    }

    #[test]
    fn test_cli_set_requires_images() {
        assert!(Cli::try_parse_from(["paperspan", "set"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_span_groups() {
        assert!(Cli::try_parse_from(["paperspan", "set", "--span-groups", "0,x", "a.jpg"]).is_err());
    }

    #[test]
    fn test_cli_parses_apply_last() {
        let cli = Cli::try_parse_from(["paperspan", "apply", "desk", "--last"]).unwrap();
        match cli.command {
            Commands::Apply(args) => {
                assert_eq!(args.profile, "desk");
                assert!(args.last);
            }
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_cli_apply_last_conflicts_with_no_apply() {
        assert!(Cli::try_parse_from(["paperspan", "apply", "desk", "--last", "--no-apply"]).is_err());
    }

    // ========================================================================
    // layout / perspective tests
    // ========================================================================

    #[test]
    fn test_cli_parses_layout() {
        let cli =
            Cli::try_parse_from(["paperspan", "layout", "--profile", "desk", "--save", "--json"]).unwrap();
        match cli.command {
            Commands::Layout(args) => {
                assert_eq!(args.profile.as_deref(), Some("desk"));
                assert!(args.save);
                assert!(args.json);
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn test_cli_parses_perspective_default_name() {
        let cli = Cli::try_parse_from(["paperspan", "perspective"]).unwrap();
        match cli.command {
            Commands::Perspective(args) => assert_eq!(args.name, "default"),
            _ => panic!("Expected Perspective command"),
        }
    }

    // ========================================================================
    // APP_VERSION constant test
    // ========================================================================

    #[test]
    fn test_app_version_format() {
        assert!(APP_VERSION.split('.').count() >= 2, "Version should have at least major.minor");
    }

    // ========================================================================
    // Global flag tests
    // ========================================================================

    #[test]
    fn test_cli_parses_config_flag() {
        let cli =
            Cli::try_parse_from(["paperspan", "--config", "/path/to/config.json", "schema"]).unwrap();
        assert_eq!(cli.config_path().as_deref(), Some(Path::new("/path/to/config.json")));
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn test_cli_parses_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["paperspan", "layout", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["paperspan", "--config", "/nonexistent/paperspan.jsonc", "schema"])
            .unwrap();
        let err = cli.execute().unwrap_err();
        assert!(matches!(err, PaperspanError::ConfigError(_)));
    }
}
