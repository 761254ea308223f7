//! Explicit tween state advanced by the frame loop.

use super::easing::{Easing, Lerp};

/// Result of advancing a [`Tween`] by one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum TweenStep<T> {
    /// No tween is running.
    Idle,
    /// The tween is mid-flight; apply this value.
    Active(T),
    /// The tween reached its end this frame; apply this value and run completion.
    ///
    /// Returned exactly once per tween, after which the tween is [`Tween::Idle`].
    Finished(T),
}

/// An interpolation between two values over a fixed duration.
///
/// Tweens are plain state: the owner calls [`Tween::advance`] every frame with the
/// current clock time and reacts to [`TweenStep::Finished`] itself.
#[derive(Clone, Debug)]
pub enum Tween<T> {
    Idle,
    Running {
        /// Clock time (seconds) when the tween started.
        start: f64,
        /// Duration in seconds.
        duration: f32,
        from: T,
        to: T,
        easing: Easing,
    },
}

impl<T> Default for Tween<T> {
    fn default() -> Self {
        Tween::Idle
    }
}

impl<T: Lerp> Tween<T> {
    /// Start a tween at `start`. Non-positive durations finish on the first advance.
    pub fn start(from: T, to: T, start: f64, duration: f32, easing: Easing) -> Self {
        Tween::Running {
            start,
            duration: duration.max(0.0),
            from,
            to,
            easing,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Tween::Running { .. })
    }

    /// Advance to clock time `now`.
    ///
    /// At `t = 0` this yields exactly `from`; once `elapsed >= duration` it yields
    /// exactly `to` and the tween returns to idle.
    pub fn advance(&mut self, now: f64) -> TweenStep<T> {
        let Tween::Running {
            start,
            duration,
            from,
            to,
            easing,
        } = self
        else {
            return TweenStep::Idle;
        };

        // Subtract in f64 so a long-running clock keeps sub-millisecond steps.
        let elapsed = (now - *start).max(0.0) as f32;
        if *duration <= 0.0 || elapsed >= *duration {
            let end = to.clone();
            *self = Tween::Idle;
            return TweenStep::Finished(end);
        }

        let t = easing.apply(elapsed / *duration);
        TweenStep::Active(from.lerp(to, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_from_and_ends_at_to() {
        let mut tween = Tween::start(1.0_f32, 0.0, 10.0, 3.0, Easing::QuadraticInOut);

        assert_eq!(tween.advance(10.0), TweenStep::Active(1.0));
        match tween.advance(11.5) {
            TweenStep::Active(v) => assert!((v - 0.5).abs() < 1e-6),
            other => panic!("expected active tween, got {other:?}"),
        }
        assert_eq!(tween.advance(13.0), TweenStep::Finished(0.0));
        assert!(!tween.is_running());
        assert_eq!(tween.advance(14.0), TweenStep::Idle);
    }

    #[test]
    fn overshooting_frame_still_lands_exactly() {
        let mut tween = Tween::start(0.25_f32, 0.75, 0.0, 1.0, Easing::Linear);
        assert_eq!(tween.advance(5.0), TweenStep::Finished(0.75));
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let mut tween = Tween::start(2.0_f32, 4.0, 1.0, 0.0, Easing::Linear);
        assert_eq!(tween.advance(1.0), TweenStep::Finished(4.0));
    }

    #[test]
    fn late_clock_keeps_millisecond_steps() {
        let day = 86_400.0;
        let mut tween = Tween::start(0.0_f32, 1.0, day, 1.0, Easing::Linear);
        match tween.advance(day + 0.001) {
            TweenStep::Active(v) => assert!((v - 0.001).abs() < 1e-5),
            other => panic!("expected active tween, got {other:?}"),
        }
    }

    #[test]
    fn clock_before_start_holds_from() {
        let mut tween = Tween::start(2.0_f32, 4.0, 5.0, 1.0, Easing::Linear);
        assert_eq!(tween.advance(4.0), TweenStep::Active(2.0));
    }
}
