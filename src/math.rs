//! Scalar easing helpers shared by terrain, atmosphere and shading.

/// Hermite smoothstep: 0 below `min`, 1 above `max`, `t²(3 - 2t)` between
pub fn smoothstep(min: f32, max: f32, value: f32) -> f32 {
    let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Fraction of the remaining distance covered in `delta_s` seconds when
/// chasing a target at `rate_per_s`.
///
/// Exponential form, so one long step equals many short ones and the result
/// never overshoots. Zero, negative or NaN deltas cover nothing.
pub fn relax_factor(rate_per_s: f32, delta_s: f32) -> f32 {
    if !(delta_s > 0.0) {
        return 0.0;
    }
    1.0 - (-rate_per_s * delta_s).exp()
}
