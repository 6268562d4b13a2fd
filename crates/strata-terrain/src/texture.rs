//! RGBA8 texture conversion for handing [`MapData`] to a render layer.

use serde::{Deserialize, Serialize};

use crate::map::{MapData, Rgba};

/// Which field of a [`MapData`] becomes the chunk texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawMode {
    /// Grayscale height field.
    NoiseMap,
    /// Biome color field.
    #[default]
    ColorMap,
}

/// A 2D texture stored as row-major RGBA8 pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data in row-major RGBA format. Length = `width * height * 4`.
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Create a new black (all-zero) texture.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    /// Set a single pixel.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = ((y * self.width + x) * 4) as usize;
        self.pixels[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Get a pixel's RGBA value.
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Count the number of unique colors (ignoring alpha).
    pub fn unique_color_count(&self) -> usize {
        let mut colors = rustc_hash::FxHashSet::default();
        for px in self.pixels.chunks_exact(4) {
            colors.insert((px[0], px[1], px[2]));
        }
        colors.len()
    }
}

/// Grayscale texture: every cell becomes `(h, h, h, 1)`.
pub fn height_texture(map: &MapData) -> TextureData {
    let mut texture = TextureData::new(map.width() as u32, map.height() as u32);
    let field = map.height_field();
    for y in 0..map.height() {
        for x in 0..map.width() {
            let h = field.get(x, y);
            texture.set_pixel(x as u32, y as u32, Rgba::rgb(h, h, h).to_rgba8());
        }
    }
    texture
}

/// Color texture straight from the biome color field.
pub fn color_texture(map: &MapData) -> TextureData {
    let mut texture = TextureData::new(map.width() as u32, map.height() as u32);
    for y in 0..map.height() {
        for x in 0..map.width() {
            texture.set_pixel(x as u32, y as u32, map.color(x, y).to_rgba8());
        }
    }
    texture
}

/// Texture for the given draw mode.
pub fn texture_for(map: &MapData, mode: DrawMode) -> TextureData {
    match mode {
        DrawMode::NoiseMap => height_texture(map),
        DrawMode::ColorMap => color_texture(map),
    }
}
