use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "make-appstore-screens",
    version,
    about = "Draw localized caption panels onto App Store screenshots"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    appstore_screens::logging::init(cli.verbose)?;

    let settings = appstore_screens::load_settings(cli.read_settings.as_deref())?;
    let fonts = settings.font_resolver();
    let report = appstore_screens::compose_screens(&settings.compose_config(), &fonts)?;

    println!("{}", report.manifest_path.display());
    Ok(())
}
