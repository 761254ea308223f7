//! # Planetfolio
//!
//! **An interactive 3D planet that doubles as a portfolio.**
//!
//! A procedurally shaped planet spins under the pointer. Content items are pinned to its
//! surface as labels; picking one flies the camera in, turns the planet to face it and
//! opens a popup. Water and grass are drawn after an opaque depth pre-pass so they can
//! fade softly where they meet the ground.
//!
//! ## Quick Start
//!
//! ```no_run
//! use planetfolio::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!     run(AppConfig::new().title("My Planet").size(1280, 720))
//! }
//! ```
//!
//! ## Layout
//!
//! - [`SceneContext`] owns all per-frame state and runs the update order once per redraw.
//! - [`DragController`] turns drags and touches into damped planet rotation.
//! - [`InteractionStateMachine`] serializes state changes and item focus behind one lock.
//! - [`CameraTransitionEngine`] eases the camera between presets.
//! - [`LabelProjector`] places content labels on screen each frame.
//! - [`DepthPrepassRenderer`] draws the two-pass frame.
//!
//! Everything except the renderer and overlay runs without a GPU, so the frame loop can
//! be driven directly in tests.

mod app;
mod camera;
mod config;
mod content;
mod controls;
mod error;
mod frame;
pub mod geometry;
mod gpu;
mod input;
mod interaction;
mod labels;
mod logging;
mod mesh;
pub mod overlay;
pub mod render;
pub mod scene;
mod texture;
pub mod transition;

pub use app::run;
pub use camera::Camera;
pub use config::{
    AppConfig, AssetConfig, CONFIG_ENV, CameraConfig, ControlsConfig, LabelConfig,
    ShadingConfig, StatePreset, StatesConfig, TransitionConfig, WindowConfig,
};
pub use content::{ContentRecord, load_content, parse_content, strip_markup};
pub use controls::{CLICK_SLOP, DragController};
pub use error::{Error, Result};
pub use frame::{FrameClock, FrameReport, MAX_FRAME_DT, SceneContext};
pub use geometry::{PendingGeometry, PlanetShape, RawGeometry};
pub use gpu::{DEPTH_FORMAT, GpuContext};
pub use input::{Input, InputAction, action_for_key};
pub use interaction::{
    InteractionEvent, InteractionStateMachine, OverlayState, Stage, StateId, Visibility,
};
pub use labels::{Facing, LabelAnchor, LabelPlacement, LabelProjector, hit_test};
pub use logging::init_logging;
pub use mesh::{GrassInstance, InstanceBuffer, Mesh, Vertex3d};
pub use render::{DepthPrepassRenderer, FrameInput};
pub use texture::{Texture, grass_atlas, load_grass_atlas};
pub use transition::{CameraPose, CameraStep, CameraTransitionEngine, Easing, Tween, TweenStep};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
