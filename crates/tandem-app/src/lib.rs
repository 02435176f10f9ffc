//! Session orchestration for two-peer lockstep pong.
//!
//! Resolves which peer is the authority, establishes the connection, and runs
//! the frame loop that steps physics and exchanges state with the peer.
//! Presentation (drawing, touch and tilt capture) lives outside this crate and
//! talks to a running session through [`SessionHandle`].

pub mod game_loop;
pub mod input;
pub mod platform;
pub mod render;
pub mod role;
pub mod session;

pub use game_loop::{FrameClock, GameLoop, LoopState, SessionSummary, stop_on_interrupt};
pub use input::{Autopilot, TILT_FULL_SCALE, tilt_to_field_y, touch_to_field_y};
pub use platform::{PlatformDirs, PlatformError};
pub use render::{RenderContext, ScreenFrame, ScreenRect, stats_text};
pub use role::{
    AddressMembership, BindProbe, ExplicitRole, LocalAddresses, Role, RoleError, RoleStrategy,
    resolve_role, resolve_with, select_strategy,
};
pub use session::{
    Scores, Session, SessionConfig, SessionError, SessionHandle, Snapshot, create_session,
};
