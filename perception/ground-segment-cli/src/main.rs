//! Ground segmentation of recorded point clouds.
//!
//! # Commands
//!
//! - `ground-segment segment <INPUTS>...` - Split XYZ frames into ground and
//!   obstacle files
//! - `ground-segment config` - Print the effective configuration as JSON
//!
//! Logging follows `RUST_LOG` (default `info`).

mod segment;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ground_segment::{SegmentationConfig, Strategy};
use nalgebra::Vector3;
use sensor_fusion::RigidTransform;
use tracing::info;
use tracing_subscriber::EnvFilter;

use segment::SegmentOptions;

/// Ground and obstacle segmentation
#[derive(Parser)]
#[command(name = "ground-segment")]
#[command(about = "Split point clouds into ground and obstacles", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment XYZ point files
    Segment(SegmentArgs),

    /// Print the effective configuration as JSON
    Config {
        /// JSON configuration file to validate and print
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SegmentArgs {
    /// XYZ files or directories of XYZ files, processed in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = "segmented")]
    out: PathBuf,

    /// Frame the input points are expressed in
    #[arg(long, default_value = "camera")]
    source_frame: String,

    /// Robot frame (overrides the configuration)
    #[arg(long)]
    target_frame: Option<String>,

    /// Sensor pose in the robot frame: x y z roll pitch yaw (meters, radians)
    #[arg(
        long,
        num_args = 6,
        value_names = ["X", "Y", "Z", "ROLL", "PITCH", "YAW"],
        allow_negative_numbers = true
    )]
    transform: Option<Vec<f64>>,

    /// Segmentation strategy (overrides the configuration)
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Frame rate used to stamp the inputs
    #[arg(long, default_value_t = 10.0)]
    rate: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Height bands only
    Simple,
    /// One normal-based pass over the ground band
    SingleZone,
    /// Separate near and far passes
    DualZone,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment(args) => run_segment(args),
        Commands::Config { config } => {
            let config = segment::load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_segment(args: SegmentArgs) -> Result<()> {
    let config = segment::load_config(args.config.as_deref())?;
    let config = apply_overrides(config, args.target_frame, args.strategy)?;

    let transform = match args.transform.as_deref() {
        None => RigidTransform::identity(),
        Some(&[x, y, z, roll, pitch, yaw]) => RigidTransform::from_xyz_rpy(Vector3::new(x, y, z), roll, pitch, yaw),
        Some(values) => bail!("--transform takes 6 values, got {}", values.len()),
    };

    let options = SegmentOptions {
        inputs: args.inputs,
        out_dir: args.out,
        source_frame: args.source_frame,
        transform,
        rate_hz: args.rate,
    };
    let stats = segment::run(config, &options)?;
    info!(
        "done: {} published, {} skipped, {} dropped",
        stats.published, stats.skipped, stats.dropped
    );
    Ok(())
}

/// Applies command-line overrides and revalidates.
fn apply_overrides(
    mut config: SegmentationConfig,
    target_frame: Option<String>,
    strategy: Option<StrategyArg>,
) -> Result<SegmentationConfig> {
    if let Some(frame) = target_frame {
        config = config.with_frame_id(frame);
    }
    if let Some(arg) = strategy {
        let strategy = resolve_strategy(arg, &config);
        config = config.with_strategy(strategy);
    }
    config.validate()?;
    Ok(config)
}

const fn resolve_strategy(arg: StrategyArg, config: &SegmentationConfig) -> Strategy {
    match arg {
        StrategyArg::Simple => Strategy::Simple,
        StrategyArg::SingleZone => Strategy::SingleZone,
        StrategyArg::DualZone => Strategy::DualZone(config.dual_zone),
    }
}
