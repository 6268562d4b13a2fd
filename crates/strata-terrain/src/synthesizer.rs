//! Map synthesis: combines the noise layers, remap curves, and biome table
//! into one chunk's [`MapData`].

use glam::Vec2;

use crate::async_generation::MapSource;
use crate::biome::classify;
use crate::map::{ChunkCoord, MapData, Rgba};
use crate::noise_field::sample_field;
use crate::profile::WorldProfile;

/// World-wide parameters shared by every chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSettings {
    /// Seed for the per-octave offset stream.
    pub seed: u64,
    /// Side length of a chunk, in cells and world units.
    pub chunk_size: u32,
    /// Global shift added to every chunk's sampling center.
    pub noise_offset: Vec2,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: 128,
            noise_offset: Vec2::ZERO,
        }
    }
}

/// Produces [`MapData`] for chunk centers. Holds only immutable state, so a
/// single instance can be shared across worker threads.
#[derive(Clone, Debug)]
pub struct MapSynthesizer {
    settings: WorldSettings,
    profile: WorldProfile,
}

impl MapSynthesizer {
    pub fn new(settings: WorldSettings, profile: WorldProfile) -> Self {
        Self { settings, profile }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn profile(&self) -> &WorldProfile {
        &self.profile
    }

    /// Synthesizes the chunk whose center sits at `center` in world space.
    ///
    /// Steps, in order: primary height, continentalness and erosion,
    /// temperature and moisture, then per cell the two curve multipliers
    /// followed by biome classification.
    pub fn generate(&self, center: Vec2) -> MapData {
        let size = self.settings.chunk_size.max(1) as usize;
        let seed = self.settings.seed;
        let offset = self.settings.noise_offset + center;
        let profile = &self.profile;

        let mut height = sample_field(size, size, seed, offset, &profile.primary);

        let [continental_settings, erosion_settings] = &profile.terrain;
        let continentalness = sample_field(size, size, seed, offset, continental_settings);
        let continental_curve = &continental_settings.remap_curve;
        let erosion = sample_field(size, size, seed, offset, erosion_settings);
        let erosion_curve = &erosion_settings.remap_curve;

        let [temperature_settings, moisture_settings] = &profile.climate;
        let temperature = sample_field(size, size, seed, offset, temperature_settings);
        let moisture = sample_field(size, size, seed, offset, moisture_settings);

        let mut colors = vec![Rgba::ZERO; size * size];
        for x in 0..size {
            for y in 0..size {
                let mut h = height.get(x, y);
                h *= continental_curve.evaluate(continentalness.get(x, y));
                h *= erosion_curve.evaluate(erosion.get(x, y));
                height.set(x, y, h);

                colors[y * size + x] =
                    classify(h, temperature.get(x, y), moisture.get(x, y), &profile.biomes);
            }
        }

        MapData::new(height, colors)
    }

    /// Synthesizes the chunk at a grid coordinate.
    pub fn generate_chunk(&self, coord: ChunkCoord) -> MapData {
        self.generate(coord.world_position(self.settings.chunk_size))
    }

    /// Synchronous single-chunk preview at the world origin.
    pub fn preview(&self) -> MapData {
        self.generate(Vec2::ZERO)
    }
}

impl MapSource for MapSynthesizer {
    fn generate(&self, center: Vec2) -> MapData {
        MapSynthesizer::generate(self, center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;
    use crate::curve::Curve;
    use crate::noise_field::{NoiseKind, NoiseSettings};

    fn flat_curve(value: f32) -> NoiseSettings {
        NoiseSettings {
            octaves: 1,
            normalize: true,
            remap_curve: Curve::constant(value),
            ..NoiseSettings::default()
        }
    }

    fn settings(chunk_size: u32) -> WorldSettings {
        WorldSettings {
            seed: 42,
            chunk_size,
            noise_offset: Vec2::new(3.0, -7.0),
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let synth = MapSynthesizer::new(settings(32), WorldProfile::temperate());
        let a = synth.generate(Vec2::new(64.0, -32.0));
        let b = synth.generate(Vec2::new(64.0, -32.0));
        assert_eq!(a.height_field().values(), b.height_field().values());
        assert_eq!(a.color_field(), b.color_field());
    }

    #[test]
    fn test_output_dimensions_follow_chunk_size() {
        let synth = MapSynthesizer::new(settings(16), WorldProfile::temperate());
        let map = synth.preview();
        assert_eq!((map.width(), map.height()), (16, 16));
        assert_eq!(map.color_field().len(), 256);
    }

    #[test]
    fn test_neighbouring_chunks_differ() {
        let synth = MapSynthesizer::new(settings(16), WorldProfile::temperate());
        let a = synth.generate_chunk(ChunkCoord::new(0, 0));
        let b = synth.generate_chunk(ChunkCoord::new(1, 0));
        assert_ne!(a.height_field(), b.height_field());
    }

    #[test]
    fn test_curves_multiply_primary_height() {
        let mut profile = WorldProfile::temperate();
        profile.terrain = [flat_curve(1.0), flat_curve(1.0)];
        let synth = MapSynthesizer::new(settings(16), profile.clone());
        let unscaled = synth.preview();

        profile.terrain = [flat_curve(0.5), flat_curve(0.25)];
        let synth = MapSynthesizer::new(settings(16), profile);
        let scaled = synth.preview();

        for (u, s) in unscaled
            .height_field()
            .values()
            .iter()
            .zip(scaled.height_field().values())
        {
            assert!((u * 0.125 - s).abs() < 1e-6, "{u} * 0.125 != {s}");
        }
    }

    #[test]
    fn test_empty_biome_table_gives_zero_colors() {
        let mut profile = WorldProfile::temperate();
        profile.biomes.clear();
        let synth = MapSynthesizer::new(settings(8), profile);
        assert!(synth.preview().color_field().iter().all(|&c| c == Rgba::ZERO));
    }

    #[test]
    fn test_color_uses_adjusted_height() {
        let mut profile = WorldProfile::temperate();
        profile.primary = NoiseSettings {
            kind: NoiseKind::PerlinSigned,
            ..flat_curve(1.0)
        };
        profile.terrain = [flat_curve(1.0), flat_curve(0.5)];
        profile.biomes = vec![Biome {
            name: "all".into(),
            max_altitude: 10.0,
            max_temperature: 10.0,
            max_moisture: 10.0,
            color: Rgba::rgb(0.0, 0.0, 0.0),
        }];
        let synth = MapSynthesizer::new(settings(8), profile);
        let map = synth.preview();
        for y in 0..8 {
            for x in 0..8 {
                let h = map.height_field().get(x, y);
                assert!(h <= 0.5 + 1e-6);
                assert!((map.color(x, y).r - h * 0.3).abs() < 1e-6);
            }
        }
    }
}
