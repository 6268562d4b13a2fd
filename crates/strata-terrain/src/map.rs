//! Per-chunk payload types: scalar fields, colors, and the assembled [`MapData`].

use serde::{Deserialize, Serialize};

/// Identifies a chunk on the 2D chunk grid.
///
/// Ordering is by `x` first, then `y`, which gives a deterministic iteration
/// order when coordinates are sorted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Y coordinate.
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate offset by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// World-space position of the chunk center for the given chunk size.
    pub fn world_position(self, chunk_size: u32) -> glam::Vec2 {
        glam::Vec2::new(self.x as f32, self.y as f32) * chunk_size as f32
    }

    /// Squared Euclidean distance to another coordinate, in chunk units.
    pub fn distance_sq(self, other: ChunkCoord) -> u64 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        dx * dx + dy * dy
    }
}

/// A `width x height` grid of `f32` samples, stored row-major (`y * width + x`).
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl ScalarField {
    /// Creates a zero-filled field. Dimensions below 1 are clamped to 1.
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    /// Returns the sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the field.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.index(x, y)]
    }

    /// Overwrites the sample at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.values[idx] = value;
    }

    /// Raw row-major samples.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable row-major samples.
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Smallest and largest sample in the field.
    pub fn min_max(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Linear RGBA color with unclamped `f32` channels.
///
/// Channels may exceed `1.0` after biome height boosting; clamping happens
/// only when converting to 8-bit texels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    /// Fully transparent black, used for cells no biome claims.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from three channels.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Quantizes to 8-bit RGBA, clamping each channel to `[0, 1]`.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// The synthesized payload for one chunk: a height field and a matching color field.
///
/// Built once on a worker and moved into the chunk that requested it.
#[derive(Clone, Debug, PartialEq)]
pub struct MapData {
    height_field: ScalarField,
    color_field: Vec<Rgba>,
}

impl MapData {
    /// Assembles a payload.
    ///
    /// # Panics
    ///
    /// Panics if the color field does not have one entry per height sample.
    pub fn new(height_field: ScalarField, color_field: Vec<Rgba>) -> Self {
        assert_eq!(
            height_field.values().len(),
            color_field.len(),
            "color field must match height field dimensions"
        );
        Self {
            height_field,
            color_field,
        }
    }

    pub fn height_field(&self) -> &ScalarField {
        &self.height_field
    }

    /// Row-major colors (`y * width + x`).
    pub fn color_field(&self) -> &[Rgba] {
        &self.color_field
    }

    pub fn width(&self) -> usize {
        self.height_field.width()
    }

    pub fn height(&self) -> usize {
        self.height_field.height()
    }

    /// Color at `(x, y)`.
    pub fn color(&self, x: usize, y: usize) -> Rgba {
        self.color_field[y * self.width() + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_dimensions_clamp_to_one() {
        let field = ScalarField::new(0, 0);
        assert_eq!(field.width(), 1);
        assert_eq!(field.height(), 1);
        assert_eq!(field.values().len(), 1);
    }

    #[test]
    fn test_field_is_row_major() {
        let mut field = ScalarField::new(4, 3);
        field.set(3, 1, 7.0);
        assert_eq!(field.values()[4 + 3], 7.0);
        assert_eq!(field.get(3, 1), 7.0);
    }

    #[test]
    fn test_min_max() {
        let mut field = ScalarField::new(2, 2);
        field.set(0, 0, -1.5);
        field.set(1, 1, 2.5);
        assert_eq!(field.min_max(), (-1.5, 2.5));
    }

    #[test]
    fn test_rgba8_clamps_boosted_channels() {
        let c = Rgba::new(1.3, 0.5, -0.2, 1.0);
        assert_eq!(c.to_rgba8(), [255, 128, 0, 255]);
    }

    #[test]
    fn test_chunk_coord_ordering_is_x_then_y() {
        let mut coords = vec![
            ChunkCoord::new(1, -1),
            ChunkCoord::new(-1, 1),
            ChunkCoord::new(-1, -1),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                ChunkCoord::new(-1, -1),
                ChunkCoord::new(-1, 1),
                ChunkCoord::new(1, -1)
            ]
        );
    }

    #[test]
    fn test_world_position_scales_by_chunk_size() {
        let pos = ChunkCoord::new(-2, 3).world_position(16);
        assert_eq!(pos, glam::Vec2::new(-32.0, 48.0));
        assert_eq!(ChunkCoord::new(0, 0).distance_sq(ChunkCoord::new(3, -4)), 25);
    }

    #[test]
    #[should_panic]
    fn test_map_data_rejects_mismatched_fields() {
        let _ = MapData::new(ScalarField::new(2, 2), vec![Rgba::ZERO; 3]);
    }
}
