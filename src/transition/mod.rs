//! Timed transitions: easing curves, tween state, and the camera transition engine.
//!
//! Every animation in the viewer is an explicit [`Tween`] owned by whoever needs it and
//! advanced once per frame with the frame clock. Nothing is scheduled behind the
//! caller's back: completion shows up as [`TweenStep::Finished`] and the owner reacts.
//!
//! # Example
//!
//! ```
//! use planetfolio::transition::{Easing, Tween, TweenStep};
//!
//! let mut fade = Tween::start(1.0_f32, 0.0, 0.0, 3.0, Easing::QuadraticInOut);
//! assert_eq!(fade.advance(0.0), TweenStep::Active(1.0));
//! assert_eq!(fade.advance(3.0), TweenStep::Finished(0.0));
//! ```

mod camera;
mod easing;
mod tween;

pub use camera::{CameraPose, CameraStep, CameraTransitionEngine};
pub use easing::{Easing, Lerp};
pub use tween::{Tween, TweenStep};
