//! Authoritative ball physics for a two-paddle field.
//!
//! All arithmetic happens in fixed virtual field coordinates
//! ([`FIELD_X`] x [`FIELD_Y`]), independent of any display resolution. Only the
//! authority peer calls [`step`]; both peers call [`check_score`] once per
//! frame and hand the result to [`award_point`].

pub mod ball;
pub mod field;
pub mod paddle;
pub mod step;

pub use ball::Ball;
pub use field::{
    BALL_RADIUS, FIELD_X, FIELD_Y, GOAL_ZONE, MAX_BOUNCE_ANGLE, MAX_STEP_SPEED, PADDLE_HEIGHT,
    PADDLE_INSET, PADDLE_WIDTH,
};
pub use paddle::{HitBox, Paddle};
pub use step::{ScoreEvent, Side, award_point, bounce_angle, check_score, step, step_speed};
