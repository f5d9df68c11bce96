use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "upscale-appstore-screens",
    version,
    about = "Resize captioned screenshots to the App Store upload size"
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
    let report = appstore_screens::resize_screens(&settings.resize_config())?;

    println!("{}", report.output_dir.display());
    Ok(())
}
