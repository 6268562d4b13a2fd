//! Command-line overrides for the persisted configuration.

use std::path::PathBuf;

use clap::Args;
use strata_terrain::DrawMode;

use crate::Config;

/// Options shared by every `strata` subcommand.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct CliArgs {
    /// World seed.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Chunk side length in cells.
    #[arg(long, global = true)]
    pub chunk_size: Option<u32>,

    /// Maximum view distance in world units.
    #[arg(long, global = true)]
    pub view_distance: Option<f32>,

    /// Generation worker threads (0 = automatic).
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Cap on cached chunks.
    #[arg(long, global = true)]
    pub max_chunks: Option<usize>,

    /// World profile RON file.
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    /// Preview field: `noise` or `color`.
    #[arg(long, global = true, value_parser = parse_draw_mode)]
    pub draw_mode: Option<DrawMode>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Parses a draw mode name as accepted on the command line.
pub fn parse_draw_mode(value: &str) -> Result<DrawMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "noise" | "noise-map" | "height" => Ok(DrawMode::NoiseMap),
        "color" | "colour" | "color-map" | "biome" => Ok(DrawMode::ColorMap),
        other => Err(format!("unknown draw mode `{other}` (expected noise or color)")),
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(size) = args.chunk_size {
            self.world.chunk_size = size;
        }
        if let Some(distance) = args.view_distance {
            self.streaming.max_view_distance = distance;
        }
        if let Some(workers) = args.workers {
            self.streaming.worker_threads = workers;
        }
        if let Some(max) = args.max_chunks {
            self.streaming.max_resident_chunks = Some(max);
        }
        if let Some(ref path) = args.profile {
            self.world.profile_path = Some(path.clone());
        }
        if let Some(mode) = args.draw_mode {
            self.preview.draw_mode = mode;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
