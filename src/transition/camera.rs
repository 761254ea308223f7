//! Eased camera moves between presets.

use glam::Vec3;
use serde::Deserialize;

use super::easing::{Easing, Lerp};
use super::tween::{Tween, TweenStep};
use crate::camera::Camera;

/// The interpolated part of the camera: where it is, what it looks at, and its zoom.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
}

impl CameraPose {
    pub fn new(position: Vec3, look_at: Vec3, fov: f32) -> Self {
        Self {
            position,
            look_at,
            fov,
        }
    }

    /// Capture the current pose of a camera.
    pub fn of(camera: &Camera) -> Self {
        Self::new(camera.position, camera.target, camera.fov)
    }

    /// Write this pose into a camera. Orientation follows from the new look-at point.
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position;
        camera.target = self.look_at;
        camera.fov = self.fov;
    }
}

// Each component is lerped on its own; the view direction is recomputed from
// `look_at`, so the rotation itself is not linear in t.
impl Lerp for CameraPose {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Self {
            position: Lerp::lerp(&self.position, &to.position, t),
            look_at: Lerp::lerp(&self.look_at, &to.look_at, t),
            fov: Lerp::lerp(&self.fov, &to.fov, t),
        }
    }
}

/// Progress report from [`CameraTransitionEngine::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraStep {
    /// No transition running; the camera was left untouched.
    Idle,
    /// The camera was moved along the active transition.
    Moving,
    /// The camera reached the destination pose this frame.
    Arrived,
}

type CompletionFn = Box<dyn FnOnce(&CameraPose)>;

/// Drives the camera between two poses with quadratic ease-in-out timing.
///
/// The engine does not gate requests itself; callers that must not overlap
/// transitions (the interaction state machine) check their lock before calling
/// [`transition`](Self::transition).
#[derive(Default)]
pub struct CameraTransitionEngine {
    tween: Tween<CameraPose>,
    on_complete: Option<CompletionFn>,
}

impl std::fmt::Debug for CameraTransitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraTransitionEngine")
            .field("tween", &self.tween)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

impl CameraTransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin moving from `from` to `to` over `duration` seconds, starting at clock `now`.
    ///
    /// A transition already in flight is replaced; its callback is dropped uncalled.
    pub fn transition(&mut self, from: CameraPose, to: CameraPose, duration: f32, now: f64) {
        tracing::debug!(
            from = ?from.position,
            to = ?to.position,
            duration,
            "camera transition started"
        );
        self.tween = Tween::start(from, to, now, duration, Easing::QuadraticInOut);
        self.on_complete = None;
    }

    /// Like [`transition`](Self::transition), running `callback` once on arrival.
    pub fn transition_with<F>(
        &mut self,
        from: CameraPose,
        to: CameraPose,
        duration: f32,
        now: f64,
        callback: F,
    ) where
        F: FnOnce(&CameraPose) + 'static,
    {
        self.transition(from, to, duration, now);
        self.on_complete = Some(Box::new(callback));
    }

    pub fn is_active(&self) -> bool {
        self.tween.is_running()
    }

    /// Advance to clock `now` and write the interpolated pose into `camera`.
    pub fn update(&mut self, now: f64, camera: &mut Camera) -> CameraStep {
        match self.tween.advance(now) {
            TweenStep::Idle => CameraStep::Idle,
            TweenStep::Active(pose) => {
                pose.apply(camera);
                CameraStep::Moving
            }
            TweenStep::Finished(pose) => {
                pose.apply(camera);
                if let Some(callback) = self.on_complete.take() {
                    callback(&pose);
                }
                tracing::debug!(position = ?pose.position, "camera transition arrived");
                CameraStep::Arrived
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn home() -> CameraPose {
        CameraPose::new(Vec3::new(0.0, 0.5, 6.0), Vec3::ZERO, 35.0)
    }

    fn about() -> CameraPose {
        CameraPose::new(Vec3::new(3.0, 1.5, 3.5), Vec3::new(0.0, 0.3, 0.0), 30.0)
    }

    #[test]
    fn applies_exact_endpoints() {
        let mut camera = Camera::new();
        let mut engine = CameraTransitionEngine::new();
        engine.transition(home(), about(), 3.0, 0.0);

        assert_eq!(engine.update(0.0, &mut camera), CameraStep::Moving);
        assert_eq!(CameraPose::of(&camera), home());

        assert_eq!(engine.update(3.0, &mut camera), CameraStep::Arrived);
        assert_eq!(CameraPose::of(&camera), about());
        assert!(!engine.is_active());
        assert_eq!(engine.update(4.0, &mut camera), CameraStep::Idle);
    }

    #[test]
    fn midpoint_is_linear_in_eased_time() {
        let mut camera = Camera::new();
        let mut engine = CameraTransitionEngine::new();
        engine.transition(home(), about(), 2.0, 10.0);
        engine.update(11.0, &mut camera);

        // ease(0.5) == 0.5, so the midpoint is the plain average of both presets.
        let expected = (home().position + about().position) * 0.5;
        assert!(camera.position.abs_diff_eq(expected, 1e-5));
        assert!((camera.fov - 32.5).abs() < 1e-5);
    }

    #[test]
    fn completion_callback_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);

        let mut camera = Camera::new();
        let mut engine = CameraTransitionEngine::new();
        engine.transition_with(home(), about(), 1.0, 0.0, move |pose| {
            assert_eq!(pose.position, Vec3::new(3.0, 1.5, 3.5));
            seen.set(seen.get() + 1);
        });

        engine.update(0.5, &mut camera);
        assert_eq!(calls.get(), 0);
        engine.update(1.5, &mut camera);
        engine.update(2.5, &mut camera);
        assert_eq!(calls.get(), 1);
    }
}
