//! `strata preview`: synthesizes the origin chunk and writes it as a PNG.

use std::path::Path;

use strata_terrain::{DrawMode, MapSynthesizer, TextureData, texture_for};
use tracing::info;

use crate::error::AppError;

/// Generates the preview chunk and saves it to `out`. Returns the texture
/// that was written.
pub fn run(synthesizer: &MapSynthesizer, mode: DrawMode, out: &Path) -> Result<TextureData, AppError> {
    let started = std::time::Instant::now();
    let map = synthesizer.preview();
    let texture = texture_for(&map, mode);
    info!(
        size = map.width(),
        ?mode,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated preview chunk"
    );

    save_png(&texture, out)?;
    info!(path = %out.display(), colors = texture.unique_color_count(), "wrote preview");
    Ok(texture)
}

fn save_png(texture: &TextureData, out: &Path) -> Result<(), AppError> {
    let (width, height) = (texture.width, texture.height);
    let image = image::RgbaImage::from_raw(width, height, texture.pixels.clone())
        .ok_or(AppError::TextureSize { width, height })?;

    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    image.save(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_terrain::{WorldProfile, WorldSettings};

    fn synthesizer() -> MapSynthesizer {
        let settings = WorldSettings {
            seed: 42,
            chunk_size: 24,
            ..Default::default()
        };
        MapSynthesizer::new(settings, WorldProfile::temperate())
    }

    #[test]
    fn test_preview_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("maps").join("preview.png");

        let texture = run(&synthesizer(), DrawMode::ColorMap, &out).unwrap();

        let written = image::open(&out).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (24, 24));
        assert_eq!(written.as_raw(), &texture.pixels);
    }

    #[test]
    fn test_noise_preview_is_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("height.png");

        run(&synthesizer(), DrawMode::NoiseMap, &out).unwrap();

        let written = image::open(&out).unwrap().to_rgba8();
        assert!(written.pixels().all(|p| p[0] == p[1] && p[1] == p[2] && p[3] == 255));
    }
}
