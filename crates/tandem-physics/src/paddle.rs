//! Paddles and their collision rectangles.

use crate::field::{BALL_RADIUS, FIELD_X, FIELD_Y, PADDLE_HEIGHT, PADDLE_INSET, PADDLE_WIDTH};

const HALF_WIDTH: i32 = PADDLE_WIDTH / 2;
const HALF_HEIGHT: i32 = PADDLE_HEIGHT / 2;

/// A paddle: fixed x, movable center y, and its owner's score.
///
/// The y position is deliberately unclamped; a value outside the field is
/// kept as-is and simply renders off-field.
#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    x: f32,
    y: f32,
    wins: u32,
}

impl Paddle {
    /// A paddle centered at `(x, y)` with no wins.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, wins: 0 }
    }

    /// The left paddle at its starting position.
    pub fn left() -> Self {
        Self::new(PADDLE_INSET as f32, (FIELD_Y / 2) as f32)
    }

    /// The right paddle at its starting position.
    pub fn right() -> Self {
        Self::new((FIELD_X - PADDLE_INSET) as f32, (FIELD_Y / 2) as f32)
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    /// Y coordinate as sent on the wire (truncated toward zero).
    pub fn wire_y(&self) -> i32 {
        self.y as i32
    }

    pub fn score(&self) -> u32 {
        self.wins
    }

    pub fn inc_score(&mut self) {
        self.wins += 1;
    }

    /// The region the ball's center must enter to count as a hit: the paddle
    /// rectangle grown by the ball radius on every side.
    ///
    /// Edges saturate at the `i32` range, so a paddle parked arbitrarily far
    /// off the field still yields a valid (unreachable) box.
    pub fn hit_box(&self) -> HitBox {
        let cx = self.x as i32;
        let cy = self.y as i32;
        HitBox {
            left: cx.saturating_sub(HALF_WIDTH + BALL_RADIUS),
            top: cy.saturating_sub(HALF_HEIGHT + BALL_RADIUS),
            right: cx.saturating_add(HALF_WIDTH + BALL_RADIUS),
            bottom: cy.saturating_add(HALF_HEIGHT + BALL_RADIUS),
        }
    }
}

/// Integer collision rectangle with half-open containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl HitBox {
    /// `left <= x < right && top <= y < bottom`.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.left <= x && x < self.right && self.top <= y && y < self.bottom
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }
}
