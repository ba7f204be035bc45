//! `aerial` - download building-centered aerial images and prepare the
//! building tables they are keyed by.

use aerial_dataset::{read_building_records, read_table, split_file, undersample, write_table};
use aerial_runner::{Driver, Result};
use aerial_tiles::{AerialConfig, HttpTileSource, ViewExtractor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aerial")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download one aerial image per building.
    Download(DownloadArgs),
    /// Split a building table into a training and a test part.
    Split(SplitArgs),
    /// Balance a building table over cities and classes.
    Undersample(UndersampleArgs),
}

#[derive(Parser, Debug)]
struct DownloadArgs {
    /// Buildings CSV file (optionally bzip2-compressed)
    #[arg(short, long, default_value = "./part1/buildings.csv.bz2")]
    input: PathBuf,

    /// Cache directory for downloaded tiles
    #[arg(short, long, default_value = "/tmp/tile_cache")]
    cache: PathBuf,

    /// Output directory for the images
    #[arg(short, long, default_value = "./aerial-images")]
    output: PathBuf,

    /// Side length of the output images in pixels [default: 256]
    #[arg(short, long)]
    size: Option<u32>,

    /// Zoom level [default: 18]
    #[arg(short, long)]
    zoom: Option<u8>,

    /// YAML file with extraction and tile server settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct SplitArgs {
    /// Share of rows that go into the training set
    #[arg(short = 's', long, default_value_t = aerial_dataset::DEFAULT_SPLIT_RATIO)]
    split_ratio: f64,

    /// Directory for the `_train` and `_test` files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Buildings CSV file (optionally bzip2-compressed)
    input: PathBuf,
}

#[derive(Parser, Debug)]
struct UndersampleArgs {
    /// Imbalanced buildings CSV file
    input: PathBuf,

    /// Balanced buildings CSV file to write
    output: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Command::Download(args) if args.verbose);
    init_logging(verbose);

    let result = match cli.command {
        Command::Download(args) => run_download(args),
        Command::Split(args) => run_split(args),
        Command::Undersample(args) => run_undersample(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_download(args: DownloadArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AerialConfig::from_yaml_file(path)?,
        None => AerialConfig::default(),
    };
    if let Some(size) = args.size {
        config.extract.out_img_size = size;
    }
    if let Some(zoom) = args.zoom {
        config.extract.zoom_level = zoom;
    }

    info!(
        "Extracting {}px images at zoom {} from {}",
        config.extract.out_img_size,
        config.extract.zoom_level,
        args.input.display()
    );

    let source = HttpTileSource::new(config.server)?;
    let extractor = ViewExtractor::new(&args.cache, source, config.extract)?;
    let driver = Driver::new(extractor, &args.output);

    let summary = driver.process_records(read_building_records(&args.input)?);
    info!("{}", summary);
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<()> {
    let (train, test) = split_file(
        &args.input,
        args.split_ratio,
        aerial_dataset::DEFAULT_SEED,
        &args.output_dir,
    )?;
    info!("Wrote {} and {}", train.display(), test.display());
    Ok(())
}

fn run_undersample(args: UndersampleArgs) -> Result<()> {
    let table = read_table(&args.input)?;
    info!("Read {} buildings from {}", table.len(), args.input.display());

    let (balanced, report) = undersample(&table, aerial_dataset::DEFAULT_SEED)?;
    info!(
        "Kept {} of {} unique buildings ({} per city and class)",
        balanced.len(),
        report.unique_rows,
        report.per_city
    );

    write_table(&args.output, &balanced)?;
    Ok(())
}

/// Initialize the logging subscriber.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "aerial=debug" } else { "aerial=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
