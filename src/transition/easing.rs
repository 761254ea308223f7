//! Easing curves and the interpolation trait used by every tween.

use glam::Vec3;

/// Easing functions for timed transitions.
///
/// These control the acceleration curve of an animation. Camera moves, overlay fades
/// and the planet spin all use [`Easing::QuadraticInOut`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    Linear,
    /// Start slow, accelerate.
    QuadraticIn,
    /// Start fast, decelerate.
    QuadraticOut,
    /// Start slow, speed up, then slow down.
    #[default]
    QuadraticInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    ///
    /// Input is clamped, so `apply(0.0) == 0.0` and `apply(1.0) == 1.0` for every curve.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Values that can be linearly interpolated by a tween.
///
/// Implementations use the `a * (1 - t) + b * t` form so both endpoints are reproduced
/// bit-for-bit: `lerp(a, b, 0.0) == a` and `lerp(a, b, 1.0) == b`.
pub trait Lerp: Clone {
    fn lerp(&self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        self * (1.0 - t) + to * t
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        *self * (1.0 - t) + *to * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_in_out_is_symmetric() {
        let ease = Easing::QuadraticInOut;
        for i in 0..=100 {
            let t = i as f32 / 100.0;
            let sum = ease.apply(t) + ease.apply(1.0 - t);
            assert!((sum - 1.0).abs() < 1e-6, "t = {t}, sum = {sum}");
        }
    }

    #[test]
    fn easing_endpoints_are_fixed() {
        for ease in [
            Easing::Linear,
            Easing::QuadraticIn,
            Easing::QuadraticOut,
            Easing::QuadraticInOut,
        ] {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
            assert_eq!(ease.apply(-3.0), 0.0);
            assert_eq!(ease.apply(7.0), 1.0);
        }
        assert_eq!(Easing::QuadraticInOut.apply(0.5), 0.5);
    }

    #[test]
    fn lerp_endpoints_are_exact() {
        let samples = [
            (0.1_f32, 0.7_f32),
            (-3.3, 12.9),
            (35.0, 28.5),
            (1e-3, 1e6),
        ];
        for (a, b) in samples {
            assert_eq!(Lerp::lerp(&a, &b, 0.0), a);
            assert_eq!(Lerp::lerp(&a, &b, 1.0), b);
        }

        let a = Vec3::new(0.1, -2.7, 6.3);
        let b = Vec3::new(1.9, 2.0, 2.0);
        assert_eq!(Lerp::lerp(&a, &b, 0.0), a);
        assert_eq!(Lerp::lerp(&a, &b, 1.0), b);
    }

    #[test]
    fn lerp_midpoint() {
        let a = Vec3::new(0.0, 0.0, 6.0);
        let b = Vec3::new(4.0, 2.0, 2.0);
        assert_eq!(Lerp::lerp(&a, &b, 0.5), Vec3::new(2.0, 1.0, 4.0));
    }
}
