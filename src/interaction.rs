//! Interaction state machine: named states, overlays, item focus and the interaction lock.
//!
//! User requests (pick a state, open an item) start timed transitions. While a
//! transition holds the lock, further requests are dropped rather than queued. All
//! progress happens in [`InteractionStateMachine::update`], driven by the frame clock.

use std::cell::Cell;
use std::f32::consts::TAU;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::camera::Camera;
use crate::config::{StatesConfig, TransitionConfig};
use crate::content::ContentRecord;
use crate::controls::DragController;
use crate::scene::Transform;
use crate::transition::{
    CameraPose, CameraStep, CameraTransitionEngine, Easing, Tween, TweenStep,
};

/// Name of a top-level viewer state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn home() -> Self {
        Self::new("Home")
    }

    pub fn about() -> Self {
        Self::new("About")
    }

    pub fn work() -> Self {
        Self::new("Work")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Display state of one state's overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayState {
    pub opacity: f32,
    pub visibility: Visibility,
}

impl OverlayState {
    const SHOWN: Self = Self {
        opacity: 1.0,
        visibility: Visibility::Visible,
    };
    const HIDDEN: Self = Self {
        opacity: 0.0,
        visibility: Visibility::Hidden,
    };

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }
}

/// Things that happened during a request or an update, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    StateSelected { from: StateId, to: StateId },
    FadeOutStarted(StateId),
    OverlayHidden(StateId),
    FadeInStarted(StateId),
    OverlayShown(StateId),
    CameraArrived,
    LabelHovered(usize),
    HoverCleared,
    ItemFocused(usize),
    ItemDismissed(usize),
}

/// The parts of the scene that interaction transitions move.
pub struct Stage<'a> {
    pub camera: &'a mut Camera,
    pub drag: &'a mut DragController,
    /// Transform of the rotating planet.
    pub planet: &'a mut Transform,
}

#[derive(Clone, Debug)]
struct Fade {
    state: StateId,
    tween: Tween<f32>,
}

/// The interaction lock. Clones share one flag, so a camera completion callback can
/// release it.
#[derive(Clone, Debug, Default)]
struct InteractionLock(Rc<Cell<bool>>);

impl InteractionLock {
    fn acquire(&self) {
        self.0.set(true);
    }

    fn release(&self) {
        self.0.set(false);
    }

    fn is_held(&self) -> bool {
        self.0.get()
    }
}

/// Gates state changes and item focus behind a single interaction lock.
#[derive(Debug)]
pub struct InteractionStateMachine {
    presets: StatesConfig,
    state: StateId,
    overlays: Vec<(StateId, OverlayState)>,
    lock: InteractionLock,
    fade_out: Option<Fade>,
    fade_in: Option<Fade>,
    camera: CameraTransitionEngine,
    planet_spin: Tween<f32>,
    focused: Option<usize>,
    hovering: Option<usize>,
    camera_duration: f32,
    fade_duration: f32,
    events: Vec<InteractionEvent>,
}

impl InteractionStateMachine {
    /// Start in the first configured state with its overlay fully shown.
    pub fn new(presets: StatesConfig, transitions: &TransitionConfig) -> Self {
        let state = presets
            .presets
            .first()
            .map(|p| p.id.clone())
            .unwrap_or_else(StateId::home);
        let overlays = presets
            .presets
            .iter()
            .map(|p| {
                let overlay = if p.id == state {
                    OverlayState::SHOWN
                } else {
                    OverlayState::HIDDEN
                };
                (p.id.clone(), overlay)
            })
            .collect();

        Self {
            presets,
            state,
            overlays,
            lock: InteractionLock::default(),
            fade_out: None,
            fade_in: None,
            camera: CameraTransitionEngine::new(),
            planet_spin: Tween::Idle,
            focused: None,
            hovering: None,
            camera_duration: transitions.camera_secs(),
            fade_duration: transitions.fade_secs(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &StateId {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }

    /// Camera pose of the current state.
    pub fn current_pose(&self) -> Option<CameraPose> {
        self.presets.get(&self.state).map(|p| p.camera)
    }

    pub fn overlay(&self, id: &StateId) -> Option<OverlayState> {
        self.overlays
            .iter()
            .find(|(state, _)| state == id)
            .map(|(_, overlay)| *overlay)
    }

    pub fn overlays(&self) -> impl Iterator<Item = (&StateId, OverlayState)> {
        self.overlays.iter().map(|(id, overlay)| (id, *overlay))
    }

    pub fn focused_item(&self) -> Option<usize> {
        self.focused
    }

    pub fn hovered_item(&self) -> Option<usize> {
        self.hovering
    }

    /// Content labels belong to the Home overlay: they fade with it and disappear while
    /// an item is focused. Zero means labels are neither drawn nor pickable.
    pub fn label_opacity(&self) -> f32 {
        if self.focused.is_some() {
            return 0.0;
        }
        self.overlay(&StateId::home())
            .filter(OverlayState::is_visible)
            .map_or(0.0, |overlay| overlay.opacity)
    }

    /// Whether the planet is being turned to a focused item.
    pub fn is_spinning(&self) -> bool {
        self.planet_spin.is_running()
    }

    /// Take the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_overlay(&mut self, id: &StateId, overlay: OverlayState) {
        match self.overlays.iter_mut().find(|(state, _)| state == id) {
            Some((_, slot)) => *slot = overlay,
            None => self.overlays.push((id.clone(), overlay)),
        }
    }

    fn opacity_of(&self, id: &StateId) -> f32 {
        self.overlay(id).map_or(0.0, |o| o.opacity)
    }

    /// Move to another named state.
    ///
    /// Dropped while the lock is held, when `new` is already current and no item is
    /// open, or when `new` has no preset. Otherwise the old overlay fades out while the
    /// camera moves; the lock is released when the fade-out ends.
    pub fn select_state(&mut self, new: &StateId, now: f64, stage: &mut Stage) -> bool {
        if self.is_locked() {
            tracing::debug!(requested = %new, "state change dropped, interaction locked");
            return false;
        }
        if *new == self.state && self.focused.is_none() {
            return false;
        }
        let Some(target) = self.presets.get(new).map(|p| p.camera) else {
            tracing::warn!(requested = %new, "no preset for state");
            return false;
        };

        self.lock.acquire();
        let old = std::mem::replace(&mut self.state, new.clone());
        tracing::info!(from = %old, to = %new, "changing state");
        self.events.push(InteractionEvent::StateSelected {
            from: old.clone(),
            to: new.clone(),
        });

        if let Some(item) = self.focused.take() {
            self.hovering = None;
            stage.drag.set_horizontal_enabled(true);
            self.events.push(InteractionEvent::ItemDismissed(item));
        }

        // A fade-in still running belongs to the state being left.
        self.fade_in = None;
        let from = self.opacity_of(&old);
        self.fade_out = Some(Fade {
            state: old.clone(),
            tween: Tween::start(from, 0.0, now, self.fade_duration, Easing::QuadraticInOut),
        });
        self.events.push(InteractionEvent::FadeOutStarted(old));

        self.camera.transition(
            CameraPose::of(stage.camera),
            target,
            self.camera_duration,
            now,
        );
        true
    }

    /// Focus a content item: hide the state overlay, fly to the item and turn the
    /// planet to its rotation. Horizontal drag stays off until the item is dismissed.
    pub fn show_item(
        &mut self,
        item: usize,
        record: &ContentRecord,
        now: f64,
        stage: &mut Stage,
    ) -> bool {
        if self.is_locked() {
            tracing::debug!(item, "item request dropped, interaction locked");
            return false;
        }
        if self.focused == Some(item) {
            return false;
        }

        self.lock.acquire();
        stage.drag.set_horizontal_enabled(false);
        self.hovering = Some(item);
        self.focused = Some(item);

        let state = self.state.clone();
        self.fade_in = None;
        self.set_overlay(&state, OverlayState::HIDDEN);
        self.events.push(InteractionEvent::OverlayHidden(state));
        self.events.push(InteractionEvent::ItemFocused(item));
        tracing::info!(item, name = %record.name, "showing item");

        let target = CameraPose::new(record.camera, record.look_at, stage.camera.fov);
        self.fly_and_release(CameraPose::of(stage.camera), target, now);

        // Lerp straight from the normalized start to the raw target, which may take
        // the long way round.
        let start = stage.planet.rotation.y.rem_euclid(TAU);
        stage.planet.rotation.y = start;
        self.planet_spin = Tween::start(
            start,
            record.planet_rotation,
            now,
            self.camera_duration,
            Easing::QuadraticInOut,
        );
        true
    }

    /// Close the focused item and return to the current state's preset.
    pub fn dismiss_item(&mut self, now: f64, stage: &mut Stage) -> bool {
        if self.is_locked() {
            return false;
        }
        let Some(item) = self.focused.take() else {
            return false;
        };
        let Some(target) = self.current_pose() else {
            return false;
        };

        self.lock.acquire();
        self.hovering = None;
        stage.drag.set_horizontal_enabled(true);
        self.events.push(InteractionEvent::ItemDismissed(item));

        let state = self.state.clone();
        self.set_overlay(
            &state,
            OverlayState {
                opacity: 0.0,
                visibility: Visibility::Visible,
            },
        );
        self.fade_in = Some(Fade {
            state: state.clone(),
            tween: Tween::start(0.0, 1.0, now, self.fade_duration, Easing::QuadraticInOut),
        });
        self.events.push(InteractionEvent::FadeInStarted(state));

        self.fly_and_release(CameraPose::of(stage.camera), target, now);
        true
    }

    /// Move the camera and release the lock from the completion callback.
    fn fly_and_release(&mut self, from: CameraPose, to: CameraPose, now: f64) {
        let lock = self.lock.clone();
        self.camera
            .transition_with(from, to, self.camera_duration, now, move |_| lock.release());
    }

    /// Touch handling for labels: the first tap highlights, a second tap on the same
    /// label opens it. Returns `true` when the item was opened.
    pub fn touch_label(
        &mut self,
        item: usize,
        record: &ContentRecord,
        now: f64,
        stage: &mut Stage,
    ) -> bool {
        if self.hovering == Some(item) {
            return self.show_item(item, record, now, stage);
        }
        if self.focused.is_none() {
            self.hovering = Some(item);
            self.events.push(InteractionEvent::LabelHovered(item));
        }
        false
    }

    /// A tap that missed every label clears the highlight.
    pub fn clear_hover(&mut self) {
        if self.focused.is_none() && self.hovering.take().is_some() {
            self.events.push(InteractionEvent::HoverCleared);
        }
    }

    /// Advance every running transition to clock `now`.
    pub fn update(&mut self, now: f64, stage: &mut Stage) {
        if self.camera.update(now, stage.camera) == CameraStep::Arrived {
            self.events.push(InteractionEvent::CameraArrived);
        }

        if let Some(mut fade) = self.fade_out.take() {
            match fade.tween.advance(now) {
                TweenStep::Active(opacity) => {
                    self.set_overlay(
                        &fade.state,
                        OverlayState {
                            opacity,
                            visibility: Visibility::Visible,
                        },
                    );
                    self.fade_out = Some(fade);
                }
                TweenStep::Finished(_) | TweenStep::Idle => {
                    self.set_overlay(&fade.state, OverlayState::HIDDEN);
                    self.events.push(InteractionEvent::OverlayHidden(fade.state));
                    self.lock.release();
                    self.begin_fade_in(now);
                }
            }
        }

        if let Some(mut fade) = self.fade_in.take() {
            match fade.tween.advance(now) {
                TweenStep::Active(opacity) => {
                    self.set_overlay(
                        &fade.state,
                        OverlayState {
                            opacity,
                            visibility: Visibility::Visible,
                        },
                    );
                    self.fade_in = Some(fade);
                }
                TweenStep::Finished(_) | TweenStep::Idle => {
                    self.set_overlay(&fade.state, OverlayState::SHOWN);
                    self.events.push(InteractionEvent::OverlayShown(fade.state));
                }
            }
        }

        match self.planet_spin.advance(now) {
            TweenStep::Active(y) | TweenStep::Finished(y) => stage.planet.rotation.y = y,
            TweenStep::Idle => {}
        }
    }

    fn begin_fade_in(&mut self, now: f64) {
        let state = self.state.clone();
        self.set_overlay(
            &state,
            OverlayState {
                opacity: 0.0,
                visibility: Visibility::Visible,
            },
        );
        self.fade_in = Some(Fade {
            state: state.clone(),
            tween: Tween::start(0.0, 1.0, now, self.fade_duration, Easing::QuadraticInOut),
        });
        self.events.push(InteractionEvent::FadeInStarted(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    struct Rig {
        camera: Camera,
        drag: DragController,
        planet: Transform,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                camera: Camera::new().at(Vec3::new(0.0, 0.5, 6.0)),
                drag: DragController::new(),
                planet: Transform::new(),
            }
        }

        fn stage(&mut self) -> Stage<'_> {
            Stage {
                camera: &mut self.camera,
                drag: &mut self.drag,
                planet: &mut self.planet,
            }
        }
    }

    fn machine() -> InteractionStateMachine {
        InteractionStateMachine::new(StatesConfig::default(), &TransitionConfig::default())
    }

    fn coral() -> ContentRecord {
        ContentRecord {
            name: "Coral".into(),
            position: Vec3::new(0.63, 0.26, 0.65),
            camera: Vec3::new(1.0, 0.0, 4.0),
            look_at: Vec3::ZERO,
            planet_rotation: -0.4,
            body: "<p>Coral!</p>".into(),
        }
    }

    #[test]
    fn starts_home_with_overlay_shown() {
        let sm = machine();
        assert_eq!(sm.state(), &StateId::home());
        assert_eq!(sm.overlay(&StateId::home()), Some(OverlayState::SHOWN));
        assert_eq!(sm.overlay(&StateId::about()), Some(OverlayState::HIDDEN));
        assert!(!sm.is_locked());
    }

    #[test]
    fn lock_drops_second_request() {
        let mut rig = Rig::new();
        let mut sm = machine();
        assert!(sm.select_state(&StateId::about(), 0.0, &mut rig.stage()));
        assert!(!sm.select_state(&StateId::work(), 0.0, &mut rig.stage()));
        assert_eq!(sm.state(), &StateId::about());

        for step in 0..=40 {
            sm.update(step as f64 * 0.25, &mut rig.stage());
        }
        let events = sm.drain_events();
        let count = |f: fn(&InteractionEvent) -> bool| events.iter().filter(|e| f(e)).count();
        assert_eq!(count(|e| matches!(e, InteractionEvent::FadeOutStarted(_))), 1);
        assert_eq!(count(|e| matches!(e, InteractionEvent::OverlayHidden(_))), 1);
        assert_eq!(count(|e| matches!(e, InteractionEvent::FadeInStarted(_))), 1);
        assert_eq!(count(|e| matches!(e, InteractionEvent::OverlayShown(_))), 1);
        assert!(!sm.is_locked());
    }

    #[test]
    fn reselecting_current_state_is_a_no_op() {
        let mut rig = Rig::new();
        let mut sm = machine();
        assert!(!sm.select_state(&StateId::home(), 0.0, &mut rig.stage()));
        assert!(!sm.is_locked());
        assert!(sm.drain_events().is_empty());
    }

    #[test]
    fn unknown_state_is_ignored() {
        let mut rig = Rig::new();
        let mut sm = machine();
        assert!(!sm.select_state(&StateId::new("Nowhere"), 0.0, &mut rig.stage()));
        assert!(!sm.is_locked());
    }

    #[test]
    fn lock_releases_when_fade_out_completes() {
        let mut rig = Rig::new();
        let mut sm = machine();
        sm.select_state(&StateId::about(), 0.0, &mut rig.stage());

        sm.update(1.5, &mut rig.stage());
        assert!(sm.is_locked());
        let home = sm.overlay(&StateId::home()).unwrap();
        assert!((home.opacity - 0.5).abs() < 1e-5);
        assert!(home.is_visible());

        sm.update(3.0, &mut rig.stage());
        assert!(!sm.is_locked());
        assert_eq!(sm.overlay(&StateId::home()), Some(OverlayState::HIDDEN));
        let about = sm.overlay(&StateId::about()).unwrap();
        assert!(about.is_visible());
        assert_eq!(about.opacity, 0.0);

        // Fade-in is still running but new requests are accepted again.
        assert!(sm.select_state(&StateId::work(), 3.1, &mut rig.stage()));
    }

    #[test]
    fn show_item_normalizes_rotation_and_disables_drag() {
        let mut rig = Rig::new();
        rig.planet.rotation.y = -7.0;
        let mut sm = machine();

        assert!(sm.show_item(1, &coral(), 0.0, &mut rig.stage()));
        assert!(!rig.drag.horizontal_enabled());
        assert!(sm.is_locked());
        assert!(sm.is_spinning());
        let start = rig.planet.rotation.y;
        assert!((0.0..TAU).contains(&start));
        assert!((start - (-7.0f32).rem_euclid(TAU)).abs() < 1e-6);
        assert_eq!(sm.overlay(&StateId::home()), Some(OverlayState::HIDDEN));

        sm.update(3.0, &mut rig.stage());
        assert_eq!(rig.planet.rotation.y, -0.4);
        assert_eq!(rig.camera.position, Vec3::new(1.0, 0.0, 4.0));
        assert_eq!(rig.camera.fov, 35.0);
        assert!(!sm.is_locked());
        assert!(!sm.is_spinning());
    }

    #[test]
    fn dismiss_restores_overlay_and_drag() {
        let mut rig = Rig::new();
        let mut sm = machine();
        sm.show_item(0, &coral(), 0.0, &mut rig.stage());
        assert!(!sm.dismiss_item(1.0, &mut rig.stage()), "locked while flying");
        sm.update(3.0, &mut rig.stage());

        assert!(sm.dismiss_item(3.0, &mut rig.stage()));
        assert!(rig.drag.horizontal_enabled());
        assert_eq!(sm.focused_item(), None);
        sm.update(6.0, &mut rig.stage());
        assert_eq!(sm.overlay(&StateId::home()), Some(OverlayState::SHOWN));
        assert_eq!(rig.camera.position, Vec3::new(0.0, 0.5, 6.0));
        assert!(!sm.is_locked());
    }

    #[test]
    fn labels_follow_the_home_overlay() {
        let mut rig = Rig::new();
        let mut sm = machine();
        assert_eq!(sm.label_opacity(), 1.0);

        sm.select_state(&StateId::about(), 0.0, &mut rig.stage());
        sm.update(1.5, &mut rig.stage());
        assert!((sm.label_opacity() - 0.5).abs() < 1e-5);
        sm.update(3.0, &mut rig.stage());
        assert_eq!(sm.label_opacity(), 0.0);

        assert!(sm.select_state(&StateId::home(), 3.0, &mut rig.stage()));
        sm.update(6.0, &mut rig.stage());
        sm.update(9.0, &mut rig.stage());
        assert_eq!(sm.label_opacity(), 1.0);

        assert!(sm.show_item(1, &coral(), 9.0, &mut rig.stage()));
        assert_eq!(sm.label_opacity(), 0.0);
    }

    #[test]
    fn touch_needs_two_taps() {
        let mut rig = Rig::new();
        let mut sm = machine();
        assert!(!sm.touch_label(1, &coral(), 0.0, &mut rig.stage()));
        assert_eq!(sm.hovered_item(), Some(1));
        assert_eq!(sm.focused_item(), None);

        sm.clear_hover();
        assert_eq!(sm.hovered_item(), None);

        sm.touch_label(1, &coral(), 0.0, &mut rig.stage());
        assert!(sm.touch_label(1, &coral(), 0.1, &mut rig.stage()));
        assert_eq!(sm.focused_item(), Some(1));
    }

    #[test]
    fn selecting_state_while_item_open_dismisses_it() {
        let mut rig = Rig::new();
        let mut sm = machine();
        sm.show_item(1, &coral(), 0.0, &mut rig.stage());
        sm.update(3.0, &mut rig.stage());
        sm.drain_events();

        assert!(sm.select_state(&StateId::about(), 3.0, &mut rig.stage()));
        assert!(rig.drag.horizontal_enabled());
        assert_eq!(sm.focused_item(), None);
        assert!(sm.drain_events().contains(&InteractionEvent::ItemDismissed(1)));
    }
}
