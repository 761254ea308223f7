//! Per-frame scene state and the fixed update order.
//!
//! [`SceneContext`] owns everything the frame loop mutates: the scene graph, the
//! camera, the drag controller, the interaction state machine, label projection and the
//! blend-material uniforms. The window layer feeds it input and calls
//! [`SceneContext::tick`] once per redraw; the renderer and overlay read the returned
//! [`FrameReport`].

use glam::Vec2;

use crate::camera::Camera;
use crate::config::AppConfig;
use crate::content::ContentRecord;
use crate::controls::DragController;
use crate::input::InputAction;
use crate::interaction::{InteractionEvent, InteractionStateMachine, OverlayState, Stage, StateId};
use crate::labels::{LabelPlacement, LabelProjector, hit_test};
use crate::render::{MaterialSet, MaterialUniforms};
use crate::scene::{BlendMaterial, LoadedScene, SceneGraph, SceneHandles};

/// Longest step the clock reports, so a stalled window doesn't fling the planet.
pub const MAX_FRAME_DT: f32 = 0.25;

/// Seconds between ticks.
///
/// Timestamps are `f64` seconds since startup; only the per-frame delta is narrowed
/// to `f32`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    now: Option<f64>,
}

impl FrameClock {
    /// Record a new frame at `now` and return the clamped delta. The first tick is 0.
    pub fn tick(&mut self, now: f64) -> f32 {
        let dt = self.now.map_or(0.0, |last| {
            (now - last).clamp(0.0, f64::from(MAX_FRAME_DT)) as f32
        });
        self.now = Some(now);
        dt
    }

    /// Time of the latest tick.
    pub fn now(&self) -> f64 {
        self.now.unwrap_or(0.0)
    }
}

/// What one tick produced.
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    /// The scene has been installed; before that only the clock runs.
    pub loaded: bool,
    pub dt: f32,
    pub placements: Vec<LabelPlacement>,
    pub overlays: Vec<(StateId, OverlayState)>,
    /// Item whose popup is open.
    pub popup: Option<usize>,
    pub hovered: Option<usize>,
    /// Opacity of the content labels; zero while they are hidden.
    pub label_opacity: f32,
    /// Materials updated by a resize applied at the start of this tick.
    pub resized: Option<usize>,
    pub events: Vec<InteractionEvent>,
}

pub struct SceneContext {
    config: AppConfig,
    graph: Option<SceneGraph>,
    handles: Option<SceneHandles>,
    camera: Camera,
    drag: DragController,
    interaction: InteractionStateMachine,
    labels: LabelProjector,
    materials: MaterialSet,
    records: Vec<ContentRecord>,
    clock: FrameClock,
    viewport: (u32, u32),
    pending_resize: Option<(u32, u32)>,
    placements: Vec<LabelPlacement>,
}

impl SceneContext {
    pub fn new(config: AppConfig, records: Vec<ContentRecord>) -> Self {
        let interaction = InteractionStateMachine::new(config.states.clone(), &config.transitions);

        let mut camera = Camera::new()
            .with_fov(config.camera.fov)
            .with_clip(config.camera.near, config.camera.far);
        if let Some(pose) = interaction.current_pose() {
            pose.apply(&mut camera);
        }
        let viewport = (config.window.width, config.window.height);
        camera.set_viewport(viewport.0, viewport.1);

        let mut materials = MaterialSet::new();
        materials.set_screen_size(viewport.0, viewport.1);

        let labels = LabelProjector::from_content(&records)
            .with_threshold(config.labels.facing_threshold);

        Self {
            drag: DragController::from_config(&config.controls),
            graph: None,
            handles: None,
            camera,
            interaction,
            labels,
            materials,
            records,
            clock: FrameClock::default(),
            viewport,
            pending_resize: None,
            placements: Vec::new(),
            config,
        }
    }

    /// Take ownership of a finished scene and register its blend materials.
    pub fn install_scene(&mut self, scene: LoadedScene) {
        let shading = &self.config.shading;
        self.materials
            .register(BlendMaterial::Water, MaterialUniforms::water(shading, &self.camera));
        self.materials
            .register(BlendMaterial::Grass, MaterialUniforms::grass(shading, &self.camera));
        self.materials.set_screen_size(self.viewport.0, self.viewport.1);

        tracing::info!(nodes = scene.graph.len(), "scene installed");
        self.graph = Some(scene.graph);
        self.handles = Some(scene.handles);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn graph(&self) -> Option<&SceneGraph> {
        self.graph.as_ref()
    }

    pub fn handles(&self) -> Option<SceneHandles> {
        self.handles
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn interaction(&self) -> &InteractionStateMachine {
        &self.interaction
    }

    pub fn materials(&self) -> &MaterialSet {
        &self.materials
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Label placements from the latest tick.
    pub fn placements(&self) -> &[LabelPlacement] {
        &self.placements
    }

    /// Queue a viewport change for the next frame boundary. Zero-area sizes (a
    /// minimized window) are ignored.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring zero-area resize");
            return;
        }
        self.pending_resize = Some((width, height));
    }

    fn apply_pending_resize(&mut self) -> Option<usize> {
        let (width, height) = self.pending_resize.take()?;
        self.viewport = (width, height);
        self.camera.set_viewport(width, height);
        let updated = self.materials.set_screen_size(width, height);
        tracing::debug!(width, height, materials = updated, "viewport resized");
        Some(updated)
    }

    /// Advance one frame at clock time `now` (seconds).
    pub fn tick(&mut self, now: f64) -> FrameReport {
        let resized = self.apply_pending_resize();
        let dt = self.clock.tick(now);

        let mut report = FrameReport {
            dt,
            resized,
            ..Default::default()
        };
        let (Some(graph), Some(handles)) = (self.graph.as_mut(), self.handles) else {
            return report;
        };
        let planet_id = handles.planet.0;

        // Animation first, then input, so a drag always lands on top of the tweens.
        {
            let planet = match graph.transform_mut(planet_id) {
                Ok(planet) => planet,
                Err(e) => {
                    tracing::error!(error = %e, "planet node missing, skipping frame");
                    return report;
                }
            };
            let mut stage = Stage {
                camera: &mut self.camera,
                drag: &mut self.drag,
                planet,
            };
            self.interaction.update(now, &mut stage);

            if stage.drag.horizontal_enabled() && !self.interaction.is_spinning() {
                stage.planet.rotation.y += self.config.shading.idle_spin * dt;
            }
            stage.drag.update(&mut stage.planet.rotation);
        }

        self.materials
            .advance_time(dt * self.config.shading.time_rate);

        let rotation = match graph.world_rotation(planet_id) {
            Ok(rotation) => rotation,
            Err(e) => {
                tracing::error!(error = %e, "cannot resolve planet rotation");
                return report;
            }
        };
        self.placements = self
            .labels
            .project(&self.camera, rotation, self.viewport.0, self.viewport.1);

        report.loaded = true;
        report.placements = self.placements.clone();
        report.overlays = self
            .interaction
            .overlays()
            .map(|(id, overlay)| (id.clone(), overlay))
            .collect();
        report.popup = self.interaction.focused_item();
        report.hovered = self.interaction.hovered_item();
        report.label_opacity = self.interaction.label_opacity();
        report.events = self.interaction.drain_events();
        report
    }

    /// Run `f` with the interaction machine and a stage built from the scene. `None`
    /// until the scene is installed.
    fn with_stage<R>(
        &mut self,
        f: impl FnOnce(&mut InteractionStateMachine, &[ContentRecord], &mut Stage<'_>) -> R,
    ) -> Option<R> {
        let handles = self.handles?;
        let graph = self.graph.as_mut()?;
        let planet = match graph.transform_mut(handles.planet.0) {
            Ok(planet) => planet,
            Err(e) => {
                tracing::error!(error = %e, "planet node missing");
                return None;
            }
        };
        let mut stage = Stage {
            camera: &mut self.camera,
            drag: &mut self.drag,
            planet,
        };
        Some(f(&mut self.interaction, &self.records, &mut stage))
    }

    /// Request a named state. Returns `false` when the request was dropped.
    pub fn select_state(&mut self, state: &StateId) -> bool {
        let now = self.clock.now();
        self.with_stage(|sm, _, stage| sm.select_state(state, now, stage))
            .unwrap_or(false)
    }

    /// Open the popup for a content item.
    pub fn show_item(&mut self, item: usize) -> bool {
        let now = self.clock.now();
        self.with_stage(|sm, records, stage| match records.get(item) {
            Some(record) => sm.show_item(item, record, now, stage),
            None => {
                tracing::warn!(item, "no content record for item");
                false
            }
        })
        .unwrap_or(false)
    }

    pub fn dismiss_item(&mut self) -> bool {
        let now = self.clock.now();
        self.with_stage(|sm, _, stage| sm.dismiss_item(now, stage))
            .unwrap_or(false)
    }

    /// Route one input action. Returns `true` when it started a transition.
    pub fn apply_input(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::PointerDown(position) => {
                self.drag.pointer_down(position);
                false
            }
            InputAction::PointerMove(position) => {
                self.drag.pointer_move(position);
                false
            }
            InputAction::PointerUp(position) => self.drag.pointer_up() && self.click(position),
            InputAction::TouchStart { id, position } => {
                self.drag.touch_start(id, position);
                false
            }
            InputAction::TouchMove { id, position } => {
                self.drag.touch_move(id, position);
                false
            }
            InputAction::TouchEnd { id, position } => {
                self.drag.touch_end(id) && self.tap(position)
            }
            InputAction::SelectState(state) => self.select_state(&state),
            InputAction::Dismiss => self.dismiss_item(),
        }
    }

    /// The camera-facing label under `point`, if any. Labels hidden along with the Home
    /// overlay are never hit.
    pub fn label_at(&self, point: Vec2) -> Option<usize> {
        if self.interaction.label_opacity() <= 0.0 {
            return None;
        }
        hit_test(&self.placements, point, self.config.labels.pick_radius)
    }

    /// A mouse click: a label under the pointer opens straight away.
    pub fn click(&mut self, point: Vec2) -> bool {
        match self.label_at(point) {
            Some(item) => self.show_item(item),
            None => false,
        }
    }

    /// A tap: the first tap on a label highlights it, a second opens it. A tap on empty
    /// space clears the highlight.
    pub fn tap(&mut self, point: Vec2) -> bool {
        let now = self.clock.now();
        match self.label_at(point) {
            Some(item) => self
                .with_stage(|sm, records, stage| {
                    records
                        .get(item)
                        .is_some_and(|record| sm.touch_label(item, record, now, stage))
                })
                .unwrap_or(false),
            None => {
                self.interaction.clear_hover();
                false
            }
        }
    }
}
