//! The session state machine: Setup, Running, Stopped.
//!
//! Each Running iteration measures the frame time, ticks the session (physics
//! and the lockstep exchange), and optionally sleeps to a minimum frame
//! interval. A stop request is honored between iterations; an I/O fault ends
//! the loop immediately. Either way the transport is closed before `run`
//! returns.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::role::{Role, RoleStrategy};
use crate::session::{Scores, Session, SessionConfig, SessionError, SessionHandle, create_session};

/// Where a session is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Resolving the role and connecting.
    Setup,
    Running,
    /// Terminal. Nothing is scheduled after this.
    Stopped,
}

/// Outcome of a session that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub role: Role,
    pub frames: u64,
    pub scores: Scores,
}

/// Measures frame times in whole milliseconds, never less than 1.
///
/// Only whole milliseconds are consumed; the sub-millisecond remainder
/// carries into the next frame so long runs do not drift.
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { last: start }
    }

    /// Milliseconds since the previous call.
    pub fn tick(&mut self) -> u32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last).as_millis();
        if elapsed == 0 {
            return 1;
        }
        let whole = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.last += Duration::from_millis(u64::from(whole));
        whole
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one session from setup to teardown.
pub struct GameLoop {
    handle: SessionHandle,
    frame_interval: Duration,
}

impl GameLoop {
    /// `frame_interval` is the minimum time between iterations; zero runs as
    /// fast as the peer exchange allows.
    pub fn new(handle: SessionHandle, frame_interval: Duration) -> Self {
        Self {
            handle,
            frame_interval,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Set up a session and run it until stopped or faulted.
    pub async fn run(
        &self,
        config: &SessionConfig,
        strategy: &dyn RoleStrategy,
    ) -> Result<SessionSummary, SessionError> {
        self.handle.set_loop_state(LoopState::Setup);
        let mut session = match create_session(config, strategy, &self.handle).await {
            Ok(session) => session,
            Err(e) => {
                warn!("session setup failed: {e}");
                self.handle.set_loop_state(LoopState::Stopped);
                return Err(e);
            }
        };

        let result = self.run_session(&mut session).await;
        self.handle.set_loop_state(LoopState::Stopped);

        let summary = session.summary();
        session.close().await;
        info!(
            role = %summary.role,
            frames = summary.frames,
            left = summary.scores.left,
            right = summary.scores.right,
            "session stopped"
        );
        result.map(|()| summary)
    }

    /// The Running state over an already set-up session.
    pub async fn run_session(&self, session: &mut Session) -> Result<(), SessionError> {
        self.handle.set_loop_state(LoopState::Running);

        let mut pacing = (!self.frame_interval.is_zero()).then(|| {
            let mut interval = tokio::time::interval(self.frame_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut clock = FrameClock::new();

        loop {
            if let Some(interval) = pacing.as_mut() {
                interval.tick().await;
            }
            if self.handle.is_stopped() {
                return Ok(());
            }
            let dt_ms = clock.tick();
            if let Err(e) = session.tick(dt_ms).await {
                warn!("session fault: {e}");
                return Err(e);
            }
        }
    }
}

/// Stop `handle` on the first interrupt and return on the second.
///
/// A stop only takes effect between frames, and a frame waiting on a silent
/// peer never ends. Racing the session against this future lets a caller give
/// up on such a session. `interrupt` yields the next interrupt each time it is
/// called; an error from it leaves the future pending forever.
pub async fn stop_on_interrupt<F, Fut>(handle: SessionHandle, mut interrupt: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupt().await {
        warn!("cannot listen for interrupts: {e}");
        return std::future::pending().await;
    }
    handle.stop();

    if let Err(e) = interrupt().await {
        warn!("cannot listen for a second interrupt: {e}");
        return std::future::pending().await;
    }
    warn!("interrupted again, abandoning the session");
}
