use glam::{Vec2, Vec3};

use crate::config::ControlsConfig;

/// Pointer travel (pixels) below which a press and release count as a click.
pub const CLICK_SLOP: f32 = 4.0;

/// Spins an object from pointer and touch drags, with damped inertia.
///
/// Input handlers only record the movement since the previous sample. Each
/// [`update`](Self::update) applies that delta to the target rotation and then decays it,
/// so the object keeps coasting after the pointer stops.
///
/// # Example
/// ```
/// use planetfolio::{DragController, Vec2, Vec3};
///
/// let mut drag = DragController::new().damping(0.25).rotation_speed(0.05);
/// let mut rotation = Vec3::ZERO;
///
/// drag.pointer_down(Vec2::new(100.0, 100.0));
/// drag.pointer_move(Vec2::new(110.0, 100.0));
/// drag.update(&mut rotation);
/// assert!((rotation.y - 0.5).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct DragController {
    /// Radians per pixel of drag.
    pub rotation_speed: f32,
    /// Fraction of the remaining delta removed per update.
    pub damping: f32,
    /// Deltas larger than this on either axis are discarded.
    pub spike_threshold: f32,
    horizontal: bool,
    vertical: bool,
    dragging: bool,
    travel: f32,
    previous: Vec2,
    delta: Vec2,
    touches: Vec<u64>,
    resync_touch: bool,
}

impl Default for DragController {
    fn default() -> Self {
        Self {
            rotation_speed: 0.05,
            damping: 0.25,
            spike_threshold: 400.0,
            horizontal: true,
            vertical: false,
            dragging: false,
            travel: 0.0,
            previous: Vec2::ZERO,
            delta: Vec2::ZERO,
            touches: Vec::new(),
            resync_touch: false,
        }
    }
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ControlsConfig) -> Self {
        Self::new()
            .rotation_speed(config.rotation_speed)
            .damping(config.damping)
            .spike_threshold(config.spike_threshold)
            .horizontal(config.horizontal)
            .vertical(config.vertical)
    }

    pub fn rotation_speed(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }

    /// Set the damping factor, clamped to `[0, 1]`.
    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    pub fn spike_threshold(mut self, threshold: f32) -> Self {
        self.spike_threshold = threshold;
        self
    }

    /// Enable Y-axis spin from horizontal drags.
    pub fn horizontal(mut self, enabled: bool) -> Self {
        self.horizontal = enabled;
        self
    }

    /// Enable X-axis tilt from vertical drags.
    pub fn vertical(mut self, enabled: bool) -> Self {
        self.vertical = enabled;
        self
    }

    pub fn set_horizontal_enabled(&mut self, enabled: bool) {
        self.horizontal = enabled;
    }

    pub fn horizontal_enabled(&self) -> bool {
        self.horizontal
    }

    /// Pending movement not yet fully decayed.
    pub fn delta(&self) -> Vec2 {
        self.delta
    }

    pub fn pointer_down(&mut self, position: Vec2) {
        self.dragging = true;
        self.travel = 0.0;
        self.previous = position;
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        if !self.dragging {
            return;
        }
        self.record(position);
    }

    /// End a mouse drag. Returns `true` when the press never travelled far enough
    /// to count as a drag, i.e. it was a click.
    pub fn pointer_up(&mut self) -> bool {
        let was_click = self.dragging && self.travel < CLICK_SLOP;
        self.dragging = false;
        was_click
    }

    pub fn touch_start(&mut self, id: u64, position: Vec2) {
        if !self.touches.contains(&id) {
            self.touches.push(id);
        }
        if self.touches.len() == 1 {
            self.travel = 0.0;
            self.previous = position;
            self.resync_touch = false;
        }
    }

    /// Track a finger. Ignored while two or more fingers are down.
    pub fn touch_move(&mut self, id: u64, position: Vec2) {
        if self.touches.len() != 1 || self.touches[0] != id {
            return;
        }
        if self.resync_touch {
            // First sample after a pinch: re-anchor without producing a jump.
            self.previous = position;
            self.resync_touch = false;
            return;
        }
        self.record(position);
    }

    /// Lift a finger. Returns `true` for a single-finger tap that did not drag.
    pub fn touch_end(&mut self, id: u64) -> bool {
        let was_single = self.touches.len() == 1;
        self.touches.retain(|&t| t != id);
        if !self.touches.is_empty() {
            self.resync_touch = true;
        }
        was_single && self.touches.is_empty() && self.travel < CLICK_SLOP
    }

    fn record(&mut self, position: Vec2) {
        self.delta = position - self.previous;
        self.travel += self.delta.length();
        self.previous = position;
    }

    /// Apply the pending delta to `rotation` (Euler radians) and decay it.
    ///
    /// Returns `false` when the delta was rejected as a spike; the spike is dropped so
    /// it cannot be applied on a later frame.
    pub fn update(&mut self, rotation: &mut Vec3) -> bool {
        if self.delta.x.abs() > self.spike_threshold || self.delta.y.abs() > self.spike_threshold {
            tracing::trace!(delta = ?self.delta, "discarding drag spike");
            self.delta = Vec2::ZERO;
            return false;
        }

        if self.horizontal && self.delta.x != 0.0 {
            rotation.y += self.delta.x * self.rotation_speed;
        }
        if self.vertical && self.delta.y != 0.0 {
            rotation.x += self.delta.y * self.rotation_speed;
        }

        self.delta *= 1.0 - self.damping;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag_by(controller: &mut DragController, dx: f32, dy: f32) {
        controller.pointer_down(Vec2::new(500.0, 500.0));
        controller.pointer_move(Vec2::new(500.0 + dx, 500.0 + dy));
    }

    #[test]
    fn damping_decays_delta_without_input() {
        let mut drag = DragController::new();
        drag_by(&mut drag, 100.0, 0.0);
        let mut rotation = Vec3::ZERO;
        for _ in 0..20 {
            drag.update(&mut rotation);
        }
        // 0.75^20 ~= 0.003
        assert!(drag.delta().x < 100.0 * 0.01);
        assert!(drag.delta().x > 0.0);
    }

    #[test]
    fn spike_is_rejected_and_discarded() {
        let mut drag = DragController::new();
        drag_by(&mut drag, 401.0, 0.0);
        let mut rotation = Vec3::ZERO;
        assert!(!drag.update(&mut rotation));
        assert_eq!(rotation, Vec3::ZERO);
        assert_eq!(drag.delta(), Vec2::ZERO);

        assert!(drag.update(&mut rotation));
        assert_eq!(rotation, Vec3::ZERO);
    }

    #[test]
    fn delta_just_under_threshold_applies() {
        let mut drag = DragController::new();
        drag_by(&mut drag, 399.0, 0.0);
        let mut rotation = Vec3::ZERO;
        assert!(drag.update(&mut rotation));
        assert!((rotation.y - 399.0 * 0.05).abs() < 1e-4);
    }

    #[test]
    fn vertical_axis_is_off_by_default() {
        let mut drag = DragController::new();
        drag_by(&mut drag, 0.0, 50.0);
        let mut rotation = Vec3::ZERO;
        drag.update(&mut rotation);
        assert_eq!(rotation, Vec3::ZERO);

        let mut tilt = DragController::new().vertical(true);
        drag_by(&mut tilt, 0.0, 50.0);
        tilt.update(&mut rotation);
        assert!((rotation.x - 2.5).abs() < 1e-5);
    }

    #[test]
    fn disabled_horizontal_ignores_drags() {
        let mut drag = DragController::new();
        drag.set_horizontal_enabled(false);
        drag_by(&mut drag, 30.0, 0.0);
        let mut rotation = Vec3::ZERO;
        drag.update(&mut rotation);
        assert_eq!(rotation.y, 0.0);
    }

    #[test]
    fn moves_without_press_are_ignored() {
        let mut drag = DragController::new();
        drag.pointer_move(Vec2::new(10.0, 10.0));
        assert_eq!(drag.delta(), Vec2::ZERO);
    }

    #[test]
    fn click_versus_drag() {
        let mut drag = DragController::new();
        drag.pointer_down(Vec2::new(10.0, 10.0));
        drag.pointer_move(Vec2::new(11.0, 10.0));
        assert!(drag.pointer_up());

        drag.pointer_down(Vec2::new(10.0, 10.0));
        drag.pointer_move(Vec2::new(40.0, 10.0));
        assert!(!drag.pointer_up());
    }

    #[test]
    fn two_fingers_suppress_moves() {
        let mut drag = DragController::new();
        drag.touch_start(1, Vec2::new(100.0, 100.0));
        drag.touch_start(2, Vec2::new(200.0, 100.0));
        drag.touch_move(1, Vec2::new(150.0, 100.0));
        assert_eq!(drag.delta(), Vec2::ZERO);

        // Lifting one finger re-anchors the other instead of jumping.
        drag.touch_end(2);
        drag.touch_move(1, Vec2::new(160.0, 100.0));
        assert_eq!(drag.delta(), Vec2::ZERO);
        drag.touch_move(1, Vec2::new(170.0, 100.0));
        assert_eq!(drag.delta(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn single_finger_tap_is_reported() {
        let mut drag = DragController::new();
        drag.touch_start(7, Vec2::new(100.0, 100.0));
        assert!(drag.touch_end(7));

        drag.touch_start(8, Vec2::new(100.0, 100.0));
        drag.touch_move(8, Vec2::new(160.0, 100.0));
        assert!(!drag.touch_end(8));
    }
}
