//! Field-to-screen mapping for whatever draws the session.
//!
//! All physics runs in field units; a [`RenderContext`] carries the one
//! display's size and is passed to every conversion.

use glam::Vec2;
use tandem_physics::{BALL_RADIUS, FIELD_X, FIELD_Y, PADDLE_HEIGHT, PADDLE_INSET, PADDLE_WIDTH};

use crate::session::Snapshot;

/// A display of `screen_width` x `screen_height` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    screen_width: u32,
    screen_height: u32,
}

/// Axis-aligned rectangle in screen pixels, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenFrame {
    pub ball: Vec2,
    pub ball_radius: f32,
    pub left: ScreenRect,
    pub right: ScreenRect,
    pub score_text: String,
}

impl RenderContext {
    /// Zero dimensions are treated as 1.
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            screen_width: screen_width.max(1),
            screen_height: screen_height.max(1),
        }
    }

    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    pub fn screen_height(&self) -> u32 {
        self.screen_height
    }

    fn scale_x(&self) -> f32 {
        self.screen_width as f32 / FIELD_X as f32
    }

    fn scale_y(&self) -> f32 {
        self.screen_height as f32 / FIELD_Y as f32
    }

    pub fn to_screen_x(&self, field_x: f32) -> f32 {
        field_x * self.scale_x()
    }

    pub fn to_screen_y(&self, field_y: f32) -> f32 {
        field_y * self.scale_y()
    }

    pub fn to_screen(&self, field: Vec2) -> Vec2 {
        Vec2::new(self.to_screen_x(field.x), self.to_screen_y(field.y))
    }

    /// Inverse of [`to_screen_y`](Self::to_screen_y), used for touch input.
    pub fn from_screen_y(&self, screen_y: f32) -> f32 {
        screen_y / self.scale_y()
    }

    /// Ball radius in pixels, scaled along x.
    pub fn ball_radius(&self) -> f32 {
        self.to_screen_x(BALL_RADIUS as f32)
    }

    fn paddle_rect(&self, center_x: f32, center_y: f32) -> ScreenRect {
        let width = self.to_screen_x(PADDLE_WIDTH as f32);
        let height = self.to_screen_y(PADDLE_HEIGHT as f32);
        ScreenRect {
            x: self.to_screen_x(center_x) - width / 2.0,
            y: self.to_screen_y(center_y) - height / 2.0,
            width,
            height,
        }
    }

    pub fn layout(&self, snapshot: &Snapshot) -> ScreenFrame {
        ScreenFrame {
            ball: self.to_screen(snapshot.ball),
            ball_radius: self.ball_radius(),
            left: self.paddle_rect(PADDLE_INSET as f32, snapshot.left_paddle_y),
            right: self.paddle_rect((FIELD_X - PADDLE_INSET) as f32, snapshot.right_paddle_y),
            score_text: format!("{} : {}", snapshot.scores.left, snapshot.scores.right),
        }
    }
}

/// Debug overlay line with the frame time and ball step.
pub fn stats_text(snapshot: &Snapshot) -> String {
    format!(
        "dt {} ms  speed {}  frame {}",
        snapshot.dt_ms, snapshot.speed, snapshot.frames
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Scores;

    #[test]
    fn test_field_maps_onto_screen() {
        let ctx = RenderContext::new(2000, 1000);
        assert_eq!(ctx.to_screen(Vec2::new(500.0, 250.0)), Vec2::new(1000.0, 500.0));
        assert_eq!(ctx.to_screen_x(FIELD_X as f32), 2000.0);
        assert_eq!(ctx.ball_radius(), 20.0);
    }

    #[test]
    fn test_screen_y_round_trips() {
        let ctx = RenderContext::new(1280, 720);
        let y = ctx.to_screen_y(310.0);
        assert!((ctx.from_screen_y(y) - 310.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let ctx = RenderContext::new(0, 0);
        assert_eq!(ctx.screen_width(), 1);
        assert_eq!(ctx.screen_height(), 1);
        assert!(ctx.from_screen_y(1.0).is_finite());
    }

    #[test]
    fn test_layout_places_paddles() {
        let ctx = RenderContext::new(1000, 500);
        let snapshot = Snapshot {
            left_paddle_y: 100.0,
            scores: Scores { left: 3, right: 1 },
            ..Snapshot::default()
        };
        let frame = ctx.layout(&snapshot);
        assert_eq!(
            frame.left,
            ScreenRect {
                x: 10.0,
                y: 50.0,
                width: 20.0,
                height: 100.0
            }
        );
        assert_eq!(frame.right.x, 970.0);
        assert_eq!(frame.right.y, 200.0);
        assert_eq!(frame.ball, Vec2::new(500.0, 250.0));
        assert_eq!(frame.score_text, "3 : 1");
    }

    #[test]
    fn test_stats_text() {
        let snapshot = Snapshot {
            dt_ms: 16,
            speed: 16,
            frames: 42,
            ..Snapshot::default()
        };
        assert_eq!(stats_text(&snapshot), "dt 16 ms  speed 16  frame 42");
    }
}
