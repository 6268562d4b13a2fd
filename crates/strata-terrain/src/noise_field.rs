//! Seeded multi-octave noise fields.
//!
//! Each field layers `octaves` samples of a single noise kind, with amplitude
//! decaying by `persistence` and frequency growing by `lacunarity` per octave.
//! Per-octave offsets come from a seeded ChaCha stream, so the same seed and
//! settings always reproduce the same field.

use glam::Vec2;
use noise::core::worley::ReturnType;
use noise::{NoiseFn, OpenSimplex, Perlin, Value, Worley};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::map::ScalarField;

/// Seed shared by every underlying noise generator. World variation comes
/// from the seeded octave offsets, not from the generator permutation.
pub const GENERATOR_SEED: u32 = 1337;

/// Coordinate multiplier applied before every raw noise lookup.
pub const BASE_FREQUENCY: f64 = 0.01;

/// Octave offsets are drawn from `[-OCTAVE_OFFSET_RANGE, OCTAVE_OFFSET_RANGE)`.
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;

const MIN_SCALE: f32 = 0.0001;

/// Which single-sample noise function a field is built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseKind {
    /// Gradient noise remapped to `[0, 1]` per sample.
    #[default]
    Perlin,
    /// Gradient noise left in `[-1, 1]`; the whole field is normalized afterwards.
    PerlinSigned,
    /// OpenSimplex noise remapped to `[0, 1]` per sample.
    OpenSimplex,
    /// Worley (cellular) distance noise remapped to `[0, 1]` per sample.
    Cellular,
    /// Value noise remapped to `[0, 1]` per sample.
    Value,
}

/// Authoring parameters for one noise field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Label shown in tooling and logs.
    pub name: String,
    /// Coordinate scale of the first octave. Must be positive.
    pub scale: f32,
    /// Number of layered octaves; values below 1 behave as 1.
    pub octaves: u32,
    /// Amplitude multiplier between octaves, in `[0, 1]`.
    pub persistence: f32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f32,
    pub kind: NoiseKind,
    /// Rescale the finished field to `[0, 1]` by its own min and max.
    pub normalize: bool,
    /// Remap applied by callers that use this field as a height multiplier.
    pub remap_curve: Curve,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            scale: 1.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            kind: NoiseKind::Perlin,
            normalize: false,
            remap_curve: Curve::default(),
        }
    }
}

impl NoiseSettings {
    /// Returns a copy with authoring-time clamps applied: at least one octave,
    /// persistence in `[0, 1]`, and a strictly positive scale. Non-finite
    /// scale, persistence or lacunarity fall back to the defaults.
    pub fn validated(&self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| {
            if value.is_finite() { value } else { fallback }
        };
        Self {
            octaves: self.octaves.max(1),
            persistence: finite_or(self.persistence, defaults.persistence).clamp(0.0, 1.0),
            lacunarity: finite_or(self.lacunarity, defaults.lacunarity),
            scale: finite_or(self.scale, defaults.scale).max(MIN_SCALE),
            ..self.clone()
        }
    }

    /// `true` if every numeric parameter and the remap curve are finite.
    pub fn is_finite(&self) -> bool {
        self.scale.is_finite()
            && self.persistence.is_finite()
            && self.lacunarity.is_finite()
            && self.remap_curve.is_finite()
    }

    /// `true` if the finished field gets min/max normalized.
    pub fn rescales_field(&self) -> bool {
        self.normalize || self.kind == NoiseKind::PerlinSigned
    }
}

/// Clamped inverse linear interpolation. Returns `0.0` for an empty range.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        0.0
    } else {
        ((value - a) / (b - a)).clamp(0.0, 1.0)
    }
}

/// The per-kind noise generator, chosen once per field.
enum KindSampler {
    Perlin(Perlin),
    PerlinSigned(Perlin),
    OpenSimplex(OpenSimplex),
    Cellular(Worley),
    Value(Value),
}

impl KindSampler {
    fn new(kind: NoiseKind) -> Self {
        match kind {
            NoiseKind::Perlin => Self::Perlin(Perlin::new(GENERATOR_SEED)),
            NoiseKind::PerlinSigned => Self::PerlinSigned(Perlin::new(GENERATOR_SEED)),
            NoiseKind::OpenSimplex => Self::OpenSimplex(OpenSimplex::new(GENERATOR_SEED)),
            NoiseKind::Cellular => Self::Cellular(
                Worley::new(GENERATOR_SEED).set_return_type(ReturnType::Distance),
            ),
            NoiseKind::Value => Self::Value(Value::new(GENERATOR_SEED)),
        }
    }

    #[inline]
    fn sample(&self, x: f32, y: f32) -> f32 {
        let point = [x as f64 * BASE_FREQUENCY, y as f64 * BASE_FREQUENCY];
        let raw = match self {
            Self::PerlinSigned(n) => return n.get(point) as f32,
            Self::Perlin(n) => n.get(point),
            Self::OpenSimplex(n) => n.get(point),
            Self::Cellular(n) => n.get(point),
            Self::Value(n) => n.get(point),
        };
        inverse_lerp(-1.0, 1.0, raw as f32)
    }
}

/// Derives one offset per octave from `seed`, each shifted by `offset`.
///
/// Draw order is x then y for octave 0, then octave 1, and so on.
pub fn octave_offsets(seed: u64, octaves: u32, offset: Vec2) -> Vec<Vec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..octaves.max(1))
        .map(|_| {
            let x = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            let y = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            Vec2::new(x + offset.x, y + offset.y)
        })
        .collect()
}

/// Samples a `width x height` fractal noise field.
///
/// Cells are visited x-outer, y-inner. Sample coordinates are centered on the
/// field: `((x - width/2 - ox) * scale * freq, (y - height/2 + oy) * scale * freq)`
/// for octave offset `(ox, oy)`. If the settings ask for it (see
/// [`NoiseSettings::rescales_field`]) the result is rescaled from its own
/// `[min, max]` to `[0, 1]`.
pub fn sample_field(
    width: usize,
    height: usize,
    seed: u64,
    offset: Vec2,
    settings: &NoiseSettings,
) -> ScalarField {
    let settings = settings.validated();
    let mut field = ScalarField::new(width, height);
    let (width, height) = (field.width(), field.height());

    let sampler = KindSampler::new(settings.kind);
    let offsets = octave_offsets(seed, settings.octaves, offset);

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;

    let mut min = f32::MAX;
    let mut max = f32::MIN;

    for x in 0..width {
        for y in 0..height {
            let mut amplitude = 1.0_f32;
            let mut frequency = 1.0_f32;
            let mut value = 0.0_f32;

            for octave in &offsets {
                let sx = (x as f32 - half_width - octave.x) * settings.scale * frequency;
                let sy = (y as f32 - half_height + octave.y) * settings.scale * frequency;
                value += sampler.sample(sx, sy) * amplitude;

                amplitude *= settings.persistence;
                frequency *= settings.lacunarity;
            }

            min = min.min(value);
            max = max.max(value);
            field.set(x, y, value);
        }
    }

    if settings.rescales_field() {
        for v in field.values_mut() {
            *v = inverse_lerp(min, max, *v);
        }
    }

    field
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn settings(kind: NoiseKind, octaves: u32) -> NoiseSettings {
        NoiseSettings {
            name: "test".into(),
            scale: 0.8,
            octaves,
            persistence: 0.5,
            lacunarity: 2.0,
            kind,
            normalize: false,
            remap_curve: Curve::default(),
        }
    }

    const ALL_KINDS: [NoiseKind; 5] = [
        NoiseKind::Perlin,
        NoiseKind::PerlinSigned,
        NoiseKind::OpenSimplex,
        NoiseKind::Cellular,
        NoiseKind::Value,
    ];

    #[test]
    fn test_same_inputs_give_bit_identical_fields() {
        for kind in ALL_KINDS {
            let s = settings(kind, 4);
            let a = sample_field(24, 24, 42, Vec2::new(16.0, -32.0), &s);
            let b = sample_field(24, 24, 42, Vec2::new(16.0, -32.0), &s);
            assert_eq!(a, b, "{kind:?} field is not deterministic");
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let s = settings(NoiseKind::Perlin, 3);
        let a = sample_field(16, 16, 1, Vec2::ZERO, &s);
        let b = sample_field(16, 16, 999, Vec2::ZERO, &s);
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalized_field_spans_unit_range() {
        for kind in ALL_KINDS {
            let mut s = settings(kind, 3);
            s.normalize = true;
            let field = sample_field(32, 32, 7, Vec2::new(100.0, 50.0), &s);
            let (min, max) = field.min_max();
            assert!(min.abs() < EPSILON, "{kind:?}: min {min}");
            assert!((max - 1.0).abs() < EPSILON, "{kind:?}: max {max}");
        }
    }

    #[test]
    fn test_signed_perlin_is_always_normalized() {
        let s = settings(NoiseKind::PerlinSigned, 1);
        assert!(!s.normalize);
        let field = sample_field(32, 32, 3, Vec2::ZERO, &s);
        let (min, max) = field.min_max();
        assert!(min.abs() < EPSILON);
        assert!((max - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_unsigned_kinds_stay_within_amplitude_sum() {
        let s = settings(NoiseKind::Perlin, 4);
        let amplitude_sum = 1.0 + 0.5 + 0.25 + 0.125;
        let field = sample_field(32, 32, 11, Vec2::ZERO, &s);
        for &v in field.values() {
            assert!((0.0..=amplitude_sum + EPSILON).contains(&v), "sample {v}");
        }
    }

    #[test]
    fn test_zero_octaves_match_one_octave() {
        for kind in ALL_KINDS {
            let zero = sample_field(16, 16, 42, Vec2::ZERO, &settings(kind, 0));
            let one = sample_field(16, 16, 42, Vec2::ZERO, &settings(kind, 1));
            assert_eq!(zero, one, "{kind:?}");
        }
    }

    #[test]
    fn test_zero_size_clamps_to_single_cell() {
        let field = sample_field(0, 0, 1, Vec2::ZERO, &settings(NoiseKind::Value, 2));
        assert_eq!((field.width(), field.height()), (1, 1));
    }

    #[test]
    fn test_single_cell_normalizes_to_zero() {
        let mut s = settings(NoiseKind::Perlin, 2);
        s.normalize = true;
        let field = sample_field(1, 1, 5, Vec2::ZERO, &s);
        assert_eq!(field.get(0, 0), 0.0);
    }

    #[test]
    fn test_octave_offsets_reproducible_and_shifted() {
        let a = octave_offsets(42, 3, Vec2::ZERO);
        let b = octave_offsets(42, 3, Vec2::new(10.0, -5.0));
        assert_eq!(a.len(), 3);
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pb.x - pa.x, 10.0);
            assert_eq!(pb.y - pa.y, -5.0);
            assert!(pa.x.abs() <= OCTAVE_OFFSET_RANGE as f32);
        }
        assert_eq!(octave_offsets(42, 0, Vec2::ZERO), octave_offsets(42, 1, Vec2::ZERO));
    }

    #[test]
    fn test_validated_clamps_authoring_values() {
        let raw = NoiseSettings {
            octaves: 0,
            persistence: 1.5,
            scale: -2.0,
            ..NoiseSettings::default()
        };
        let v = raw.validated();
        assert_eq!(v.octaves, 1);
        assert_eq!(v.persistence, 1.0);
        assert!(v.scale > 0.0);
    }

    #[test]
    fn test_validated_replaces_non_finite_values() {
        let raw = NoiseSettings {
            persistence: f32::NAN,
            lacunarity: f32::INFINITY,
            scale: f32::NAN,
            ..NoiseSettings::default()
        };
        assert!(!raw.is_finite());
        let v = raw.validated();
        assert_eq!(v.persistence, 0.5);
        assert_eq!(v.lacunarity, 2.0);
        assert_eq!(v.scale, 1.0);
        assert!(v.is_finite());
    }

    #[test]
    fn test_nan_persistence_still_samples_finite_field() {
        let mut s = settings(NoiseKind::Perlin, 3);
        s.persistence = f32::NAN;
        s.normalize = true;
        let field = sample_field(8, 8, 1, Vec2::ZERO, &s);
        assert!(field.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_inverse_lerp_degenerate_range() {
        assert_eq!(inverse_lerp(2.0, 2.0, 2.0), 0.0);
        assert_eq!(inverse_lerp(-1.0, 1.0, 0.0), 0.5);
        assert_eq!(inverse_lerp(-1.0, 1.0, 3.0), 1.0);
    }
}
