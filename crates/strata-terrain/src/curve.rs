//! Keyframed remapping curves used to shape continentalness and erosion influence.

use serde::{Deserialize, Serialize};

/// One control point of a [`Curve`].
///
/// Tangents are slopes (`d output / d input`). A missing tangent falls back
/// to the slope of the segment it borders.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub input: f32,
    pub output: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_tangent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_tangent: Option<f32>,
}

impl Keyframe {
    /// A keyframe with no explicit tangents.
    pub const fn new(input: f32, output: f32) -> Self {
        Self {
            input,
            output,
            in_tangent: None,
            out_tangent: None,
        }
    }

    /// A keyframe with explicit incoming and outgoing slopes.
    pub const fn with_tangents(input: f32, output: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            input,
            output,
            in_tangent: Some(in_tangent),
            out_tangent: Some(out_tangent),
        }
    }
}

/// Piecewise curve over non-uniformly spaced keyframes.
///
/// Evaluation clamps to the first/last output outside the key range. A
/// segment is linear when neither of its facing tangents is set, and a cubic
/// Hermite segment otherwise. An empty curve evaluates to `0.0`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    /// Builds a curve, sorting keys by input. Keys with a non-finite input
    /// are dropped.
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.retain(|k| k.input.is_finite());
        keys.sort_by(|a, b| a.input.total_cmp(&b.input));
        Self { keys }
    }

    /// Piecewise-linear curve through `(input, output)` points.
    pub fn linear(points: &[(f32, f32)]) -> Self {
        Self::new(points.iter().map(|&(i, o)| Keyframe::new(i, o)).collect())
    }

    /// A curve that returns `value` everywhere.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value)])
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `true` if every output and tangent is finite.
    pub fn is_finite(&self) -> bool {
        self.keys.iter().all(|k| {
            k.output.is_finite()
                && k.in_tangent.is_none_or(f32::is_finite)
                && k.out_tangent.is_none_or(f32::is_finite)
        })
    }

    /// Evaluates the curve at `x`. A NaN input yields the first output.
    pub fn evaluate(&self, x: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if x.is_nan() || x <= first.input {
            return first.output;
        }
        if x >= last.input {
            return last.output;
        }

        // First key strictly greater than x; bounds above guarantee 1..len.
        let upper = self.keys.partition_point(|k| k.input <= x);
        let k0 = &self.keys[upper - 1];
        let k1 = &self.keys[upper];

        let dt = k1.input - k0.input;
        if dt <= 0.0 {
            return k1.output;
        }
        let s = (x - k0.input) / dt;

        if k0.out_tangent.is_none() && k1.in_tangent.is_none() {
            return k0.output + (k1.output - k0.output) * s;
        }

        let secant = (k1.output - k0.output) / dt;
        let m0 = k0.out_tangent.unwrap_or(secant) * dt;
        let m1 = k1.in_tangent.unwrap_or(secant) * dt;

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * k0.output + h10 * m0 + h01 * k1.output + h11 * m1
    }
}

impl From<Vec<Keyframe>> for Curve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::new(keys)
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}
