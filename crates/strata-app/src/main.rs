//! The `strata` command-line host.
//!
//! Configuration is loaded from `config.ron` (created on first run) and can
//! be overridden via global CLI flags.
//! Run with `cargo run -p strata-app -- preview --out map.png` for a single chunk,
//! or `cargo run -p strata-app -- walk --ticks 600 --speed 200` to stream a walk.

mod error;
mod preview;
mod walk;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use glam::Vec2;
use strata_config::{CliArgs, Config, default_config_dir};
use strata_terrain::{MapSynthesizer, WorldProfile};
use tracing::info;

use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Procedural terrain synthesis and chunk streaming")]
struct Cli {
    #[command(flatten)]
    overrides: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize the origin chunk and write it as a PNG.
    Preview {
        /// Output file (defaults to the configured preview path).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Walk an observer through the world and stream chunks around it.
    Walk {
        /// Number of fixed-timestep ticks to simulate.
        #[arg(long, default_value_t = 600)]
        ticks: u32,
        /// Observer speed in world units per second.
        #[arg(long, default_value_t = 200.0)]
        speed: f32,
        /// Heading in degrees, counter-clockwise from +x.
        #[arg(long, default_value_t = 0.0)]
        heading: f32,
        /// Log progress every this many ticks (0 disables).
        #[arg(long, default_value_t = 60)]
        report_every: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("strata: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config_dir = match cli.overrides.config.clone() {
        Some(dir) => dir,
        None => default_config_dir()?,
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&cli.overrides);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let profile = load_profile(&config)?;
    let synthesizer = MapSynthesizer::new(config.world.settings(), profile);
    info!(
        seed = config.world.seed,
        chunk_size = synthesizer.settings().chunk_size,
        "world ready"
    );

    match cli.command {
        Command::Preview { out } => {
            let out = out.unwrap_or_else(|| config.preview.output.clone());
            preview::run(&synthesizer, config.preview.draw_mode, &out)?;
        }
        Command::Walk {
            ticks,
            speed,
            heading,
            report_every,
        } => {
            let mut streamer = walk::build_streamer(&config.streaming, Arc::new(synthesizer))?;
            let plan = walk::WalkPlan {
                ticks,
                speed,
                heading: Vec2::from_angle(heading.to_radians()),
                report_every,
            };
            let summary = walk::run(&mut streamer, &plan);
            println!(
                "walked {} ticks to ({:.1}, {:.1}): {} chunks tracked, {} ready, {} visible, {} evicted",
                summary.ticks,
                summary.final_position.x,
                summary.final_position.y,
                summary.tracked,
                summary.ready,
                summary.visible,
                summary.evicted,
            );
        }
    }
    Ok(())
}

fn load_profile(config: &Config) -> Result<WorldProfile, AppError> {
    match &config.world.profile_path {
        Some(path) => Ok(WorldProfile::load(path)?),
        None => {
            info!("no world profile configured; using the temperate preset");
            Ok(WorldProfile::temperate())
        }
    }
}
