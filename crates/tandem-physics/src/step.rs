//! Per-frame ball update: speed derivation, paddle and wall reflection, and
//! goal detection.
//!
//! The bounce model ignores the incoming direction entirely. The outgoing
//! angle depends only on where the ball meets the paddle: dead center sends it
//! back horizontally, the edges send it off at [`MAX_BOUNCE_ANGLE`].

use glam::Vec2;

use crate::ball::Ball;
use crate::field::{BALL_RADIUS, FIELD_X, FIELD_Y, GOAL_ZONE, MAX_BOUNCE_ANGLE, MAX_STEP_SPEED};
use crate::paddle::Paddle;

/// Which side of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// A point was won. `scorer` is the side whose paddle earns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    pub scorer: Side,
}

/// Distance the ball covers in one step of `dt_ms` milliseconds when it is at
/// horizontal position `x`.
///
/// Uncapped, the ball crosses the field in one second. Inside the goal zones
/// the step is capped at [`MAX_STEP_SPEED`] so the ball cannot jump over a
/// paddle's hit box; elsewhere it is capped at twice that.
pub fn step_speed(dt_ms: u32, x: f32) -> i32 {
    let raw = i64::from(FIELD_X) * i64::from(dt_ms) / 1000;
    let near_goal = x < GOAL_ZONE as f32 || x > (FIELD_X - GOAL_ZONE) as f32;
    let cap = if near_goal {
        MAX_STEP_SPEED
    } else {
        2 * MAX_STEP_SPEED
    };
    raw.min(i64::from(cap)) as i32
}

/// Outgoing angle for a contact point `normalized` in `[-1, 1]`, where 0 is the
/// paddle center and positive values are above it.
pub fn bounce_angle(normalized: f32) -> f64 {
    f64::from(normalized) * MAX_BOUNCE_ANGLE
}

/// Advance the ball by one frame of `dt_ms` milliseconds.
///
/// Returns the goal event, if the ball ended up behind a goal line. Scores are
/// not touched; pass the event to [`award_point`].
pub fn step(ball: &mut Ball, left: &Paddle, right: &Paddle, dt_ms: u32) -> Option<ScoreEvent> {
    ball.speed = step_speed(dt_ms, ball.position.x);

    let (paddle, side) = if ball.velocity.x > 0.0 {
        (right, Side::Right)
    } else {
        (left, Side::Left)
    };
    let hit_box = paddle.hit_box();

    if hit_box.contains(ball.position.x as i32, ball.position.y as i32) {
        let half = hit_box.height() / 2;
        let intersect = (hit_box.top + half) as f32 - ball.position.y;
        let angle = bounce_angle(intersect / half as f32);
        let mut velocity = Vec2::new(angle.cos() as f32, -(angle.sin() as f32));

        // Park the ball on the hit box edge so the next step does not
        // register the same paddle again.
        match side {
            Side::Right => {
                velocity.x = -velocity.x;
                ball.position.x = hit_box.left as f32;
            }
            Side::Left => ball.position.x = hit_box.right as f32,
        }
        ball.velocity = velocity;
        tracing::trace!(?side, angle, "paddle hit");
        return None;
    }

    ball.position += ball.velocity * ball.speed as f32;

    let radius = BALL_RADIUS as f32;
    if ball.position.y - radius <= 0.0 {
        ball.position.y = radius;
        ball.velocity.y = -ball.velocity.y;
    } else if ball.position.y + radius >= FIELD_Y as f32 {
        ball.position.y = (FIELD_Y - BALL_RADIUS) as f32;
        ball.velocity.y = -ball.velocity.y;
    }

    check_score(ball)
}

/// Goal detection on the truncated x coordinate, i.e. the same integer the
/// replica receives, so both peers reach the same verdict.
pub fn check_score(ball: &Ball) -> Option<ScoreEvent> {
    let x = ball.wire_x();
    if x < 0 {
        Some(ScoreEvent {
            scorer: Side::Right,
        })
    } else if x > FIELD_X {
        Some(ScoreEvent { scorer: Side::Left })
    } else {
        None
    }
}

/// Credit the scorer and serve the next round.
pub fn award_point(event: ScoreEvent, ball: &mut Ball, left: &mut Paddle, right: &mut Paddle) {
    match event.scorer {
        Side::Left => left.inc_score(),
        Side::Right => right.inc_score(),
    }
    tracing::info!(
        scorer = ?event.scorer,
        left = left.score(),
        right = right.score(),
        "point scored"
    );
    ball.serve();
}
