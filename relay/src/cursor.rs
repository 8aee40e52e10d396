//! In-memory cursor position for the movement demo endpoint.

use std::sync::Mutex;

use serde::Serialize;

/// Distance moved per step.
const CURSOR_SPEED: i64 = 10;

/// Current cursor coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CursorPosition {
    /// Horizontal offset, grows to the right.
    pub x: i64,
    /// Vertical offset, grows downward.
    pub y: i64,
}

/// Cursor position shared across requests.
///
/// Handlers run on a multi-threaded runtime, so the position lives behind a
/// lock owned by the application state rather than a module-level global.
/// Process-lifetime scoped; resets on restart.
#[derive(Debug, Default)]
pub struct CursorState {
    position: Mutex<CursorPosition>,
}

impl CursorState {
    /// Applies a movement and returns the new position.
    ///
    /// `direction` is matched by substring, so compound directions like
    /// `"up-left"` move on both axes. Unrecognized directions leave the
    /// position unchanged.
    pub fn apply(&self, direction: &str, steps: i64) -> CursorPosition {
        let dx = if direction.contains("right") {
            1
        } else if direction.contains("left") {
            -1
        } else {
            0
        };
        let dy = if direction.contains("down") {
            1
        } else if direction.contains("up") {
            -1
        } else {
            0
        };

        let mut position = self.position.lock().expect("cursor lock poisoned");
        position.x += dx * steps * CURSOR_SPEED;
        position.y += dy * steps * CURSOR_SPEED;
        *position
    }
}
