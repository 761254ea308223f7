use glam::Vec2;
use winit::event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::interaction::StateId;

/// A window event reduced to what the viewer reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum InputAction {
    PointerDown(Vec2),
    PointerMove(Vec2),
    /// Left button released at the given position.
    PointerUp(Vec2),
    TouchStart { id: u64, position: Vec2 },
    TouchMove { id: u64, position: Vec2 },
    TouchEnd { id: u64, position: Vec2 },
    SelectState(StateId),
    Dismiss,
}

/// Keyboard shortcut for a key, if it has one.
pub fn action_for_key(key: KeyCode) -> Option<InputAction> {
    match key {
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(InputAction::SelectState(StateId::home())),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(InputAction::SelectState(StateId::about())),
        KeyCode::Digit3 | KeyCode::Numpad3 => Some(InputAction::SelectState(StateId::work())),
        KeyCode::Escape => Some(InputAction::Dismiss),
        _ => None,
    }
}

/// Translates winit events into [`InputAction`]s.
///
/// Mouse button events carry no position in winit, so the last cursor position is
/// tracked here.
#[derive(Clone, Debug, Default)]
pub struct Input {
    cursor: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return None;
                }
                match event.physical_key {
                    PhysicalKey::Code(key) => action_for_key(key),
                    PhysicalKey::Unidentified(_) => None,
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => Some(match state {
                ElementState::Pressed => InputAction::PointerDown(self.cursor),
                ElementState::Released => InputAction::PointerUp(self.cursor),
            }),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                Some(InputAction::PointerMove(self.cursor))
            }
            WindowEvent::Touch(Touch {
                id,
                location,
                phase,
                ..
            }) => {
                let (id, position) = (*id, Vec2::new(location.x as f32, location.y as f32));
                Some(match phase {
                    TouchPhase::Started => InputAction::TouchStart { id, position },
                    TouchPhase::Moved => InputAction::TouchMove { id, position },
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        InputAction::TouchEnd { id, position }
                    }
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_select_states() {
        assert_eq!(
            action_for_key(KeyCode::Digit2),
            Some(InputAction::SelectState(StateId::about()))
        );
        assert_eq!(
            action_for_key(KeyCode::Numpad3),
            Some(InputAction::SelectState(StateId::work()))
        );
        assert_eq!(action_for_key(KeyCode::Escape), Some(InputAction::Dismiss));
        assert_eq!(action_for_key(KeyCode::KeyQ), None);
    }
}
