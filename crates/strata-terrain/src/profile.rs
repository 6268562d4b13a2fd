//! World profile: the authored noise layers and biome table for one world.
//!
//! Profiles are plain RON documents. They are loaded once at startup and
//! shared read-only with every synthesis call.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::biome::Biome;
use crate::curve::{Curve, Keyframe};
use crate::map::Rgba;
use crate::noise_field::{NoiseKind, NoiseSettings};

/// Errors that can occur when loading or saving a [`WorldProfile`].
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Failed to read the profile file.
    #[error("failed to read profile: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the profile file.
    #[error("failed to write profile: {0}")]
    WriteError(#[source] std::io::Error),

    /// The file is not valid profile RON.
    #[error("failed to parse profile: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize the profile.
    #[error("failed to serialize profile: {0}")]
    SerializeError(#[source] ron::Error),

    /// A biome threshold is NaN, so no sample could ever match it.
    #[error("biome {0:?} has a NaN threshold")]
    InvalidBiome(String),

    /// A noise layer has a non-finite parameter or curve value.
    #[error("noise layer {0:?} has a non-finite parameter")]
    InvalidNoise(String),
}

/// The full set of authoring inputs consumed by the map synthesizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldProfile {
    /// Base height field.
    pub primary: NoiseSettings,
    /// Continentalness (`[0]`) and erosion (`[1]`); their curves scale the height.
    pub terrain: [NoiseSettings; 2],
    /// Temperature (`[0]`) and moisture (`[1]`).
    pub climate: [NoiseSettings; 2],
    /// Ordered biome table; the first match wins.
    pub biomes: Vec<Biome>,
}

impl WorldProfile {
    /// Reads a profile from a RON file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let contents = std::fs::read_to_string(path).map_err(ProfileError::ReadError)?;
        let profile: WorldProfile = ron::from_str(&contents).map_err(ProfileError::ParseError)?;
        profile.check()?;
        tracing::info!(
            path = %path.display(),
            biomes = profile.biomes.len(),
            "loaded world profile"
        );
        Ok(profile)
    }

    /// Writes the profile as pretty RON.
    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ProfileError::WriteError)?;
        }
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ProfileError::SerializeError)?;
        std::fs::write(path, serialized).map_err(ProfileError::WriteError)
    }

    /// Rejects tables that can never classify anything meaningful.
    ///
    /// An empty biome list is allowed: every cell then gets the zero color.
    pub fn check(&self) -> Result<(), ProfileError> {
        for layer in self.layers() {
            if !layer.is_finite() {
                return Err(ProfileError::InvalidNoise(layer.name.clone()));
            }
        }
        for biome in &self.biomes {
            if biome.max_altitude.is_nan()
                || biome.max_temperature.is_nan()
                || biome.max_moisture.is_nan()
            {
                return Err(ProfileError::InvalidBiome(biome.name.clone()));
            }
        }
        Ok(())
    }

    /// Every noise layer: primary, then terrain, then climate.
    pub fn layers(&self) -> impl Iterator<Item = &NoiseSettings> {
        std::iter::once(&self.primary)
            .chain(self.terrain.iter())
            .chain(self.climate.iter())
    }

    /// The built-in temperate preset.
    pub fn temperate() -> Self {
        let primary = NoiseSettings {
            name: "height".into(),
            scale: 0.9,
            octaves: 5,
            persistence: 0.45,
            lacunarity: 2.1,
            kind: NoiseKind::PerlinSigned,
            normalize: true,
            remap_curve: Curve::default(),
        };

        let continentalness = NoiseSettings {
            name: "continentalness".into(),
            scale: 0.25,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
            kind: NoiseKind::OpenSimplex,
            normalize: true,
            remap_curve: Curve::new(vec![
                Keyframe::new(0.0, 0.15),
                Keyframe::new(0.35, 0.3),
                Keyframe::with_tangents(0.5, 0.8, 2.0, 2.0),
                Keyframe::new(1.0, 1.0),
            ]),
        };

        let erosion = NoiseSettings {
            name: "erosion".into(),
            scale: 0.4,
            octaves: 2,
            persistence: 0.5,
            lacunarity: 2.0,
            kind: NoiseKind::Perlin,
            normalize: true,
            remap_curve: Curve::linear(&[(0.0, 1.0), (0.6, 0.85), (1.0, 0.5)]),
        };

        let temperature = NoiseSettings {
            name: "temperature".into(),
            scale: 0.15,
            octaves: 2,
            persistence: 0.5,
            lacunarity: 2.0,
            kind: NoiseKind::Value,
            normalize: true,
            remap_curve: Curve::default(),
        };

        let moisture = NoiseSettings {
            name: "moisture".into(),
            scale: 0.2,
            octaves: 2,
            persistence: 0.5,
            lacunarity: 2.0,
            kind: NoiseKind::Perlin,
            normalize: true,
            remap_curve: Curve::default(),
        };

        let biome = |name: &str, alt: f32, temp: f32, moist: f32, color: Rgba| Biome {
            name: name.into(),
            max_altitude: alt,
            max_temperature: temp,
            max_moisture: moist,
            color,
        };

        let biomes = vec![
            biome("deep_water", 0.12, 1.0, 1.0, Rgba::rgb(0.05, 0.12, 0.45)),
            biome("shallow_water", 0.2, 1.0, 1.0, Rgba::rgb(0.1, 0.3, 0.7)),
            biome("beach", 0.25, 1.0, 1.0, Rgba::rgb(0.76, 0.7, 0.5)),
            biome("tundra", 0.6, 0.25, 1.0, Rgba::rgb(0.6, 0.65, 0.6)),
            biome("desert", 0.6, 1.0, 0.3, Rgba::rgb(0.8, 0.65, 0.35)),
            biome("forest", 0.6, 1.0, 1.0, Rgba::rgb(0.1, 0.4, 0.12)),
            biome("mountain", 0.85, 1.0, 1.0, Rgba::rgb(0.4, 0.36, 0.33)),
            biome("snow", 1.0, 1.0, 1.0, Rgba::rgb(0.7, 0.7, 0.72)),
        ];

        Self {
            primary,
            terrain: [continentalness, erosion],
            climate: [temperature, moisture],
            biomes,
        }
    }
}

impl Default for WorldProfile {
    fn default() -> Self {
        Self::temperate()
    }
}
