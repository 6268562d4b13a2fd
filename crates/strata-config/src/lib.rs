//! Configuration for the terrain streamer.
//!
//! Settings persist to disk as a RON file, tolerate missing or unknown
//! fields, and can be overridden from the command line.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, parse_draw_mode};
pub use config::{
    CONFIG_FILE, Config, DebugConfig, PreviewConfig, StreamingConfig, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;
