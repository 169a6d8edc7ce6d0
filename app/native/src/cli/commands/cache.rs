//! Cache CLI commands.

use clap::Subcommand;

use crate::cache;
use crate::error::PaperspanError;

/// Cache subcommands for managing the application's cache.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum CacheCommands {
    /// Clear the application's cache directory.
    ///
    /// Removes every composited wallpaper and exported piece stored in the
    /// cache. Wallpapers written to a configured `outputDir` are kept.
    #[command(after_long_help = r#"Examples:
  paperspan cache clear   # Clear all cached data"#)]
    Clear,

    /// Show the cache directory location.
    #[command(after_long_help = r#"Examples:
  paperspan cache path    # Print the cache directory path"#)]
    Path,
}

/// Execute cache subcommands.
pub fn execute(cmd: &CacheCommands) -> Result<(), PaperspanError> {
    match cmd {
        CacheCommands::Clear => {
            let cache_dir = cache::get_cache_dir();
            if !cache_dir.exists() {
                println!("Cache directory does not exist. Nothing to clear.");
                return Ok(());
            }

            let bytes_freed = cache::clear_cache()
                .map_err(|err| PaperspanError::CacheError(format!("Failed to clear cache: {err}")))?;
            println!("Cache cleared successfully. Freed {}.", cache::format_bytes(bytes_freed));
        }
        CacheCommands::Path => println!("{}", cache::get_cache_dir().display()),
    }
    Ok(())
}
