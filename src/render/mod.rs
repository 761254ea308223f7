//! Two-pass depth-aware rendering.
//!
//! Pass 1 draws the opaque planet into an off-screen colour and depth pair. Pass 2 draws
//! the whole scene to the surface; water and grass read pass 1's depth to fade where they
//! meet the ground, and water also reads its colour to show what lies beneath.
//!
//! Pass selection ([`plan_frame`]), the blend curves ([`depth`]) and the per-material
//! uniform bookkeeping ([`MaterialSet`]) are plain CPU code; [`DepthPrepassRenderer`]
//! executes the plans on the GPU.

pub mod depth;
mod pipelines;
mod plan;
mod prepass;
mod target;
mod uniforms;

pub use depth::{depth_blend_factor, grass_alpha, linearize_depth, water_depth_factor};
pub use plan::{PassPlan, PassTarget, plan_frame, plan_opaque_only};
pub use prepass::{DepthPrepassRenderer, FrameInput};
pub use target::PrepassTarget;
pub use uniforms::{FrameUniforms, MaterialSet, MaterialUniforms, ModelUniforms, screen_size};
