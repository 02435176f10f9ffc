//! Fixed field geometry. These values are part of the wire contract and are
//! never negotiated between peers.

use std::f64::consts::PI;

/// Width of the virtual field.
pub const FIELD_X: i32 = 1000;

/// Height of the virtual field.
pub const FIELD_Y: i32 = 500;

/// Paddle width in field units.
pub const PADDLE_WIDTH: i32 = 20;

/// Paddle height in field units.
pub const PADDLE_HEIGHT: i32 = 100;

/// Ball radius in field units.
pub const BALL_RADIUS: i32 = 10;

/// Distance of each paddle's center from its goal line.
pub const PADDLE_INSET: i32 = 20;

/// Width of the band in front of each goal line where the tighter speed cap
/// applies.
pub const GOAL_ZONE: i32 = 100;

/// Largest per-step displacement that cannot jump over a paddle's hit box.
pub const MAX_STEP_SPEED: i32 = PADDLE_WIDTH + 2 * BALL_RADIUS;

/// Steepest outgoing angle after a paddle hit: 75 degrees.
pub const MAX_BOUNCE_ANGLE: f64 = 5.0 * PI / 12.0;
