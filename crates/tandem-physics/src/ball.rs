//! The ball: position, direction, and serve bookkeeping.

use std::f64::consts::PI;

use glam::Vec2;

use crate::field::{FIELD_X, FIELD_Y};

/// The ball in virtual field coordinates.
///
/// `velocity` is a unit direction; the distance covered per step is stored
/// separately in `speed` because it depends on frame timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) speed: i32,
    rounds: u32,
}

impl Ball {
    /// A ball resting at the field center. Call [`serve`](Self::serve) before
    /// the first step.
    pub fn new() -> Self {
        Self {
            position: field_center(),
            velocity: Vec2::ZERO,
            speed: 0,
            rounds: 0,
        }
    }

    /// A ball at an arbitrary position and direction, with no serves played.
    pub fn at(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            speed: 0,
            rounds: 0,
        }
    }

    /// Reset to the field center and launch. The direction alternates
    /// right, left, right, ... starting with the very first serve.
    pub fn serve(&mut self) {
        self.position = field_center();
        let angle = PI * f64::from(self.rounds);
        self.velocity = Vec2::new(angle.cos() as f32, angle.sin() as f32);
        self.rounds += 1;
        tracing::debug!(rounds = self.rounds, vx = self.velocity.x, "ball served");
    }

    /// Overwrite the position with a value received from the authority.
    pub fn set_coord(&mut self, x: i32, y: i32) {
        self.position = Vec2::new(x as f32, y as f32);
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Distance covered by the most recent step.
    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Number of serves so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// X coordinate as sent on the wire (truncated toward zero).
    pub fn wire_x(&self) -> i32 {
        self.position.x as i32
    }

    /// Y coordinate as sent on the wire (truncated toward zero).
    pub fn wire_y(&self) -> i32 {
        self.position.y as i32
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}

fn field_center() -> Vec2 {
    Vec2::new((FIELD_X / 2) as f32, (FIELD_Y / 2) as f32)
}
