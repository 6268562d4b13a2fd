//! Biome classification: ordered upper-bound thresholds mapped to base colors.

use serde::{Deserialize, Serialize};

use crate::map::Rgba;

/// How strongly a cell's height brightens its biome color, per channel.
pub const HEIGHT_TINT: f32 = 0.3;

/// A named region of (altitude, temperature, moisture) space.
///
/// A sample belongs to the biome when every value is at or below the
/// corresponding upper bound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub name: String,
    pub max_altitude: f32,
    pub max_temperature: f32,
    pub max_moisture: f32,
    /// Base color before height tinting.
    pub color: Rgba,
}

impl Biome {
    /// `true` if all three samples fall under this biome's upper bounds.
    #[inline]
    pub fn contains(&self, height: f32, temperature: f32, moisture: f32) -> bool {
        height <= self.max_altitude
            && temperature <= self.max_temperature
            && moisture <= self.max_moisture
    }

    /// The biome color brightened by `height * HEIGHT_TINT` on r, g and b.
    pub fn tinted_color(&self, height: f32) -> Rgba {
        let boost = height * HEIGHT_TINT;
        Rgba {
            r: self.color.r + boost,
            g: self.color.g + boost,
            b: self.color.b + boost,
            a: self.color.a,
        }
    }
}

/// Index of the first biome, in authoring order, that contains the sample.
pub fn find_biome(biomes: &[Biome], height: f32, temperature: f32, moisture: f32) -> Option<usize> {
    biomes
        .iter()
        .position(|b| b.contains(height, temperature, moisture))
}

/// Color for one cell. Returns [`Rgba::ZERO`] if no biome claims the sample.
pub fn classify(height: f32, temperature: f32, moisture: f32, biomes: &[Biome]) -> Rgba {
    find_biome(biomes, height, temperature, moisture)
        .map(|i| biomes[i].tinted_color(height))
        .unwrap_or(Rgba::ZERO)
}
