//! Errors surfaced by the `strata` binary.

use strata_config::ConfigError;
use strata_stream::StreamError;
use strata_terrain::ProfileError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load world profile: {0}")]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("texture buffer does not match {width}x{height}")]
    TextureSize { width: u32, height: u32 },
}
