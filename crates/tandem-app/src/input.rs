//! Turning touch, tilt, or the autopilot into a paddle target.
//!
//! Every source produces a y in field coordinates and hands it to
//! [`SessionHandle::set_local_paddle_target`](crate::SessionHandle::set_local_paddle_target).
//! Targets are not clamped; a paddle may be driven partly off the field.

use tandem_physics::FIELD_Y;

use crate::render::RenderContext;
use crate::role::Role;
use crate::session::Snapshot;

/// Tilt reading (in g) that moves the paddle a full half-field.
pub const TILT_FULL_SCALE: i32 = 4;

/// Field units per g of tilt.
const TILT_STEP: i32 = (FIELD_Y / 2) / TILT_FULL_SCALE;

/// A touch at `screen_y` pixels.
pub fn touch_to_field_y(screen_y: f32, ctx: &RenderContext) -> f32 {
    ctx.from_screen_y(screen_y)
}

/// An accelerometer reading along the device's tilt axis. Level is the field
/// center.
pub fn tilt_to_field_y(reading: f32) -> f32 {
    (FIELD_Y / 2) as f32 + TILT_STEP as f32 * reading
}

/// Moves the local paddle toward the ball, at most `max_step` per frame.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    max_step: f32,
}

impl Autopilot {
    pub fn new(max_step: f32) -> Self {
        Self {
            max_step: max_step.abs(),
        }
    }

    /// The next target for the paddle that `role` controls.
    pub fn target(&self, role: Role, snapshot: &Snapshot) -> f32 {
        let current = match role {
            Role::Authority => snapshot.right_paddle_y,
            Role::Replica => snapshot.left_paddle_y,
        };
        let delta = (snapshot.ball.y - current).clamp(-self.max_step, self.max_step);
        current + delta
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new(8.0)
    }
}
