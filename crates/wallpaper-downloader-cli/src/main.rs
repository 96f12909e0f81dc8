use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use wallpaper_downloader_core::logging::init_logger;
use wallpaper_downloader_core::{Config, Error, WallpaperDownloader};

#[derive(Parser)]
#[command(name = "wallpaper-downloader")]
#[command(about = "Download the daily wallpapers of every market and prune resolution duplicates")]
#[command(version)]
struct Cli {
    /// Directory to save images into (defaults to the executable's directory)
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,
}

/// Exit status used when no market endpoint could be enumerated
const NOT_INITIALIZED_EXIT: u8 = 255;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    if let Err(e) = init_logger() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<Error>() {
            Some(Error::NotInitialized) => {
                error!("{}", e);
                info!("Bye bye");
                ExitCode::from(NOT_INITIALIZED_EXIT)
            }
            _ => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<(), anyhow::Error> {
    // Set up configuration
    let mut config = Config::from_env()?;
    if let Some(directory) = cli.directory {
        config = config.with_output_dir(directory);
    }

    let downloader = WallpaperDownloader::new(config);

    info!("Starting wallpaper download...");
    let report = downloader.run()?;

    info!(
        "Endpoints: {} ok, {} failed",
        report.batch.endpoints_ok, report.batch.endpoints_failed
    );
    info!(
        "Images: {} saved, {} already present, {} unresolved, {} empty, {} failed",
        report.batch.saved,
        report.batch.already_present,
        report.batch.unresolved,
        report.batch.empty,
        report.batch.failed_images
    );
    info!(
        "Removed {} of {} higher-resolution duplicates",
        report.removed,
        report.duplicates.len()
    );

    Ok(())
}
