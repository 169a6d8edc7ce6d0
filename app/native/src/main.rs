#![allow(clippy::multiple_crate_versions)]

//! paperspan - multi-monitor wallpaper compositor.
//!
//! Every invocation runs one CLI command, e.g. `paperspan set wide.jpg` or
//! `paperspan apply desk`.

fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    if let Err(err) = paperspan_lib::cli::run() {
        eprintln!("paperspan: {err}");
        std::process::exit(1);
    }
}
