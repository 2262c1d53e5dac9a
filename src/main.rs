use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use spot_text::config::{DEFAULT_MIN_IOA, DEFAULT_OVERLAP_FRACTION, DEFAULT_PATCH_SIZE};
use spot_text::detection::ocr::default_model_dir;
use spot_text::output::{save_json, write_json};
use spot_text::{InputError, OcrsDetector, Pipeline, PipelineConfig, SourceImage};

#[derive(Parser)]
#[command(name = "spot-text")]
#[command(version)]
#[command(about = "Spot text on large scanned images by tiled detection")]
struct Cli {
    /// Path to the image
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Output path (defaults to stdout)
    #[arg(value_name = "OUTPUT")]
    output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Tile edge length in pixels
    #[arg(long, default_value_t = DEFAULT_PATCH_SIZE)]
    patch_size: u32,

    /// Fraction of the tile size shared by neighbouring tiles
    #[arg(long, default_value_t = DEFAULT_OVERLAP_FRACTION)]
    overlap: f32,

    /// Intersection-over-area at which overlapping detections are merged
    #[arg(long, default_value_t = DEFAULT_MIN_IOA)]
    min_ioa: f32,

    /// Skip tiles whose inference fails instead of aborting
    #[arg(long)]
    best_effort: bool,

    /// Maximum number of tiles inferred at once
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Directory holding the ocrs models (defaults to ~/.cache/ocrs)
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    // Model runtimes are noisy below WARN.
    let runtime_directives = if quiet { "" } else { "ocrs=warn,rten=warn" };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(runtime_directives);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    if !args.image_path.exists() {
        error!(path = %args.image_path.display(), "Image does not exist");
        return Err(InputError::NotFound(args.image_path).into());
    }

    let config = PipelineConfig {
        patch_size: args.patch_size,
        overlap_fraction: args.overlap,
        min_ioa: args.min_ioa,
        best_effort: args.best_effort,
        max_concurrency: args.jobs,
    };
    config.validate()?;

    info!("Loading weights...");
    let model_dir = match args.model_dir {
        Some(dir) => dir,
        None => default_model_dir()?,
    };
    let detector = OcrsDetector::from_model_dir(&model_dir)?;

    info!(path = %args.image_path.display(), "Loading image...");
    let image = SourceImage::open(&args.image_path)?;
    info!("Image loaded: {}x{}", image.width(), image.height());

    let mut pipeline = Pipeline::new(Arc::new(detector)).with_config(config);
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let detections = pipeline.run(&image).await?;

    match args.output_path {
        Some(path) => {
            info!(path = %path.display(), "Saving output...");
            save_json(&detections, &path)?;
        }
        None => write_json(&detections, io::stdout().lock())?,
    }

    info!("...done!");
    Ok(())
}
