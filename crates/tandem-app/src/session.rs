//! A running two-peer session: connection setup, the per-frame tick, and the
//! handle other tasks use to feed input, read state, and request a stop.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use tandem_config::Config;
use tandem_net::{
    AuthorityFrame, AuthorityLink, ConnectionError, DisplayInfo, PeerLink, PeerListener,
    ReplicaFrame, ReplicaLink, RetryConfig, SocketConfig, StreamError, connect_to_peer,
    exchange_as_authority, exchange_as_replica, exchange_display,
};
use tandem_physics::{
    Ball, FIELD_X, FIELD_Y, Paddle, ScoreEvent, award_point, check_score, step, step_speed,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::game_loop::{LoopState, SessionSummary};
use crate::role::{BindProbe, Role, RoleError, RoleStrategy, resolve_with, select_strategy};

/// Errors that end a session or prevent it from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("session ended: {0}")]
    Stream(#[from] StreamError),

    #[error("replica has no rendezvous address to connect to")]
    MissingRendezvous,
}

/// Everything needed to set up a session, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Explicit role flag; `None` defers to address membership.
    pub authority: Option<bool>,
    /// The authority's address: the replica connects here, and it drives
    /// role inference.
    pub rendezvous: Option<IpAddr>,
    /// Explicit set of local addresses. `None` probes the host.
    pub local_addresses: Option<HashSet<IpAddr>>,
    pub port: u16,
    /// Address the authority listens on.
    pub bind_ip: IpAddr,
    pub retry: RetryConfig,
    pub socket: SocketConfig,
    /// Local display for the one-time handshake, or `None` to skip it.
    pub display: Option<DisplayInfo>,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Result<Self, RoleError> {
        let network = &config.network;
        let rendezvous = network
            .rendezvous_address
            .as_deref()
            .map(parse_ip)
            .transpose()?;
        let local_addresses = if network.local_addresses.is_empty() {
            None
        } else {
            Some(
                network
                    .local_addresses
                    .iter()
                    .map(|a| parse_ip(a))
                    .collect::<Result<HashSet<_>, _>>()?,
            )
        };
        let display = network.exchange_display.then(|| DisplayInfo {
            width: i32::try_from(config.display.width).unwrap_or(i32::MAX),
            height: i32::try_from(config.display.height).unwrap_or(i32::MAX),
        });

        Ok(Self {
            authority: network.authority,
            rendezvous,
            local_addresses,
            port: network.port,
            bind_ip: parse_ip(&network.bind_address)?,
            retry: RetryConfig {
                delay: Duration::from_millis(network.connect_retry_ms),
                max_attempts: None,
            },
            socket: SocketConfig::default(),
            display,
        })
    }

    /// The strategy this configuration calls for: an explicit flag, else
    /// membership of the rendezvous address in the local address set.
    pub fn role_strategy(&self) -> Result<Box<dyn RoleStrategy>, RoleError> {
        match &self.local_addresses {
            Some(local) => select_strategy(local.clone(), self.authority, self.rendezvous),
            None => select_strategy(BindProbe, self.authority, self.rendezvous),
        }
    }
}

fn parse_ip(s: &str) -> Result<IpAddr, RoleError> {
    s.trim()
        .parse()
        .map_err(|_| RoleError::InvalidAddress(s.to_string()))
}

/// Points per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores {
    pub left: u32,
    pub right: u32,
}

/// Read-only copy of the session state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// `None` until the session is set up.
    pub role: Option<Role>,
    pub ball: Vec2,
    pub left_paddle_y: f32,
    pub right_paddle_y: f32,
    pub scores: Scores,
    /// Duration of the last frame in milliseconds.
    pub dt_ms: u32,
    /// Ball step length for the last frame.
    pub speed: i32,
    pub frames: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            role: None,
            ball: Vec2::new((FIELD_X / 2) as f32, (FIELD_Y / 2) as f32),
            left_paddle_y: (FIELD_Y / 2) as f32,
            right_paddle_y: (FIELD_Y / 2) as f32,
            scores: Scores::default(),
            dt_ms: 0,
            speed: 0,
            frames: 0,
        }
    }
}

struct Shared {
    target: watch::Sender<f32>,
    snapshot: watch::Sender<Snapshot>,
    shutdown: watch::Sender<bool>,
    state: watch::Sender<LoopState>,
}

/// Cloneable access to a session from other tasks.
///
/// Input producers write the paddle target, renderers subscribe to
/// snapshots, and anyone may request a stop.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                target: watch::Sender::new((FIELD_Y / 2) as f32),
                snapshot: watch::Sender::new(Snapshot::default()),
                shutdown: watch::Sender::new(false),
                state: watch::Sender::new(LoopState::Setup),
            }),
        }
    }

    /// Ask the session to stop. The current frame finishes first.
    pub fn stop(&self) {
        if !self.shared.shutdown.send_replace(true) {
            info!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    /// Latest target y for the local paddle, in field coordinates. Read once
    /// at the start of every frame; only the last value written counts.
    pub fn set_local_paddle_target(&self, y: f32) {
        self.shared.target.send_replace(y);
    }

    /// Snapshots published after every frame.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn loop_state(&self) -> LoopState {
        *self.shared.state.borrow()
    }

    /// Loop state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.shared.state.subscribe()
    }

    pub(crate) fn set_loop_state(&self, state: LoopState) {
        let previous = self.shared.state.send_replace(state);
        if previous != state {
            debug!("loop state {previous:?} -> {state:?}");
        }
    }

    pub(crate) fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shared.shutdown.subscribe()
    }

    fn input_receiver(&self) -> watch::Receiver<f32> {
        self.shared.target.subscribe()
    }

    fn publish(&self, snapshot: Snapshot) {
        self.shared.snapshot.send_replace(snapshot);
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

enum Link {
    Authority(AuthorityLink),
    Replica(ReplicaLink),
}

/// One side of a connected session.
pub struct Session {
    role: Role,
    ball: Ball,
    left: Paddle,
    right: Paddle,
    link: Link,
    input: watch::Receiver<f32>,
    handle: SessionHandle,
    peer_display: Option<DisplayInfo>,
    last_dt: u32,
    frames: u64,
}

/// Resolve the role, connect to the peer, run the optional handshake, and
/// serve the first ball.
///
/// A stop requested through `handle` while listening or retrying cancels
/// setup with [`ConnectionError::Cancelled`].
pub async fn create_session(
    config: &SessionConfig,
    strategy: &dyn RoleStrategy,
    handle: &SessionHandle,
) -> Result<Session, SessionError> {
    let role = resolve_with(strategy)?;
    let mut shutdown = handle.shutdown_receiver();

    let mut stream = match role {
        Role::Authority => {
            let addr = SocketAddr::new(config.bind_ip, config.port);
            let listener = PeerListener::bind(addr, config.socket.clone())?;
            listener.accept_one(&mut shutdown).await?
        }
        Role::Replica => {
            let rendezvous = config.rendezvous.ok_or(SessionError::MissingRendezvous)?;
            let addr = SocketAddr::new(rendezvous, config.port);
            connect_to_peer(addr, config.retry.clone(), &config.socket, &mut shutdown).await?
        }
    };

    let peer_display = match config.display {
        Some(local) => Some(exchange_display(&mut stream, local).await?),
        None => None,
    };

    Ok(Session::start(role, stream, peer_display, handle.clone()))
}

impl Session {
    /// Start a session over an already connected stream.
    pub fn start<S>(
        role: Role,
        stream: S,
        peer_display: Option<DisplayInfo>,
        handle: SessionHandle,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let link = match role {
            Role::Authority => Link::Authority(PeerLink::spawn(reader, writer)),
            Role::Replica => Link::Replica(PeerLink::spawn(reader, writer)),
        };

        let mut ball = Ball::new();
        ball.serve();

        let session = Self {
            role,
            ball,
            left: Paddle::left(),
            right: Paddle::right(),
            link,
            input: handle.input_receiver(),
            handle,
            peer_display,
            last_dt: 0,
            frames: 0,
        };
        session.handle.publish(session.current_state());
        session
    }

    /// Run one frame of `dt_ms` milliseconds (at least 1).
    ///
    /// The authority steps the ball, sends the result, and waits for the
    /// replica's paddle. The replica waits for the authority's frame, adopts
    /// it, and answers with its paddle. Both sides then check for a goal.
    pub async fn tick(&mut self, dt_ms: u32) -> Result<Option<ScoreEvent>, SessionError> {
        let dt_ms = dt_ms.max(1);
        self.last_dt = dt_ms;

        let target = *self.input.borrow_and_update();
        match self.role {
            Role::Authority => self.right.set_y(target),
            Role::Replica => self.left.set_y(target),
        }

        let event = match &mut self.link {
            Link::Authority(link) => {
                let event = step(&mut self.ball, &self.left, &self.right, dt_ms);
                let frame = AuthorityFrame {
                    ball_x: self.ball.wire_x(),
                    ball_y: self.ball.wire_y(),
                    paddle_y: self.right.wire_y(),
                };
                let reply = exchange_as_authority(link, frame).await?;
                self.left.set_y(reply.paddle_y as f32);
                event
            }
            Link::Replica(link) => {
                let reply = ReplicaFrame {
                    paddle_y: self.left.wire_y(),
                };
                let frame = exchange_as_replica(link, reply).await?;
                self.ball.set_coord(frame.ball_x, frame.ball_y);
                self.right.set_y(frame.paddle_y as f32);
                check_score(&self.ball)
            }
        };

        if let Some(event) = event {
            award_point(event, &mut self.ball, &mut self.left, &mut self.right);
        }
        self.frames += 1;
        self.handle.publish(self.current_state());
        Ok(event)
    }

    pub fn current_state(&self) -> Snapshot {
        let speed = match self.role {
            Role::Authority => self.ball.speed(),
            // The replica never steps; report what the authority would use.
            Role::Replica if self.last_dt > 0 => step_speed(self.last_dt, self.ball.position().x),
            Role::Replica => 0,
        };
        Snapshot {
            role: Some(self.role),
            ball: self.ball.position(),
            left_paddle_y: self.left.y(),
            right_paddle_y: self.right.y(),
            scores: Scores {
                left: self.left.score(),
                right: self.right.score(),
            },
            dt_ms: self.last_dt,
            speed,
            frames: self.frames,
        }
    }

    pub fn set_local_paddle_target(&self, y: f32) {
        self.handle.set_local_paddle_target(y);
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// The peer's display resolution, if the handshake ran.
    pub fn peer_display(&self) -> Option<DisplayInfo> {
        self.peer_display
    }

    pub fn summary(&self) -> SessionSummary {
        let state = self.current_state();
        SessionSummary {
            role: self.role,
            frames: self.frames,
            scores: state.scores,
        }
    }

    /// Shut the stream down and stop the link tasks.
    pub async fn close(self) {
        match self.link {
            Link::Authority(link) => link.close().await,
            Link::Replica(link) => link.close().await,
        }
        info!("transport closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_physics::Side;
    use tokio::io::duplex;

    fn pair() -> (Session, Session) {
        let (a, b) = duplex(256);
        let authority = Session::start(Role::Authority, a, None, SessionHandle::new());
        let replica = Session::start(Role::Replica, b, None, SessionHandle::new());
        (authority, replica)
    }

    async fn tick_both(
        authority: &mut Session,
        replica: &mut Session,
        dt_ms: u32,
    ) -> (Option<ScoreEvent>, Option<ScoreEvent>) {
        let (a, r) = tokio::join!(authority.tick(dt_ms), replica.tick(dt_ms));
        (a.unwrap(), r.unwrap())
    }

    #[tokio::test]
    async fn test_start_serves_ball_from_center() {
        let (authority, _replica) = pair();
        let state = authority.current_state();
        assert_eq!(state.role, Some(Role::Authority));
        assert_eq!(state.ball, Vec2::new(500.0, 250.0));
        assert_eq!(authority.ball.rounds(), 1);
        assert!(authority.ball.velocity().x > 0.0);
        assert_eq!(state.scores, Scores::default());
    }

    #[tokio::test]
    async fn test_replica_mirrors_authority_ball() {
        let (mut authority, mut replica) = pair();
        for _ in 0..5 {
            tick_both(&mut authority, &mut replica, 16).await;
            assert_eq!(replica.ball.wire_x(), authority.ball.wire_x());
            assert_eq!(replica.ball.wire_y(), authority.ball.wire_y());
        }
        assert_eq!(authority.current_state().ball.x, 580.0);
        assert_eq!(replica.current_state().frames, 5);
    }

    #[tokio::test]
    async fn test_paddle_targets_reach_the_peer() {
        let (mut authority, mut replica) = pair();
        authority.set_local_paddle_target(300.0);
        replica.set_local_paddle_target(120.0);
        tick_both(&mut authority, &mut replica, 16).await;

        assert_eq!(authority.right.y(), 300.0);
        assert_eq!(authority.left.y(), 120.0);
        assert_eq!(replica.left.y(), 120.0);
        assert_eq!(replica.right.y(), 300.0);
    }

    #[tokio::test]
    async fn test_goal_is_scored_on_both_peers() {
        let (mut authority, mut replica) = pair();
        authority.ball = Ball::at(Vec2::new(5.0, 100.0), Vec2::new(-1.0, 0.0));

        let (a, r) = tick_both(&mut authority, &mut replica, 33).await;
        let expected = Some(ScoreEvent {
            scorer: Side::Right,
        });
        assert_eq!(a, expected);
        assert_eq!(r, expected);
        assert_eq!(authority.current_state().scores.right, 1);
        assert_eq!(replica.current_state().scores.right, 1);
        assert_eq!(authority.ball.position(), Vec2::new(500.0, 250.0));
    }

    #[tokio::test]
    async fn test_zero_dt_counts_as_one_millisecond() {
        let (mut authority, mut replica) = pair();
        tick_both(&mut authority, &mut replica, 0).await;
        let state = authority.current_state();
        assert_eq!(state.dt_ms, 1);
        assert_eq!(state.speed, 1);
        assert_eq!(state.ball.x, 501.0);
    }

    #[tokio::test]
    async fn test_snapshots_are_published() {
        let (mut authority, mut replica) = pair();
        let mut rx = authority.handle().subscribe();
        assert!(!rx.has_changed().unwrap());
        tick_both(&mut authority, &mut replica, 16).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().frames, 1);
    }

    #[tokio::test]
    async fn test_peer_gone_ends_session() {
        let (mut authority, replica) = pair();
        replica.close().await;
        let result = authority.tick(16).await;
        assert!(matches!(result, Err(SessionError::Stream(_))));
    }

    #[test]
    fn test_stop_is_sticky() {
        let handle = SessionHandle::new();
        assert!(!handle.is_stopped());
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_config_resolves_addresses() {
        let mut config = Config::default();
        config.network.rendezvous_address = Some("10.0.0.7".into());
        config.network.local_addresses = vec!["10.0.0.7".into(), "127.0.0.1".into()];
        let session_config = SessionConfig::from_config(&config).unwrap();
        assert_eq!(session_config.port, 8080);
        assert!(session_config.display.is_none());
        let role = session_config.role_strategy().unwrap().resolve().unwrap();
        assert_eq!(role, Role::Authority);
    }

    #[test]
    fn test_config_explicit_flag_overrides_membership() {
        let mut config = Config::default();
        config.network.authority = Some(false);
        config.network.rendezvous_address = Some("10.0.0.7".into());
        config.network.local_addresses = vec!["10.0.0.7".into()];
        let session_config = SessionConfig::from_config(&config).unwrap();
        let role = resolve_with(session_config.role_strategy().unwrap().as_ref()).unwrap();
        assert_eq!(role, Role::Replica);
    }

    #[test]
    fn test_config_rejects_bad_address() {
        let mut config = Config::default();
        config.network.rendezvous_address = Some("not-an-ip".into());
        let result = SessionConfig::from_config(&config);
        assert!(matches!(result, Err(RoleError::InvalidAddress(_))));
    }

    #[test]
    fn test_config_without_role_or_rendezvous_is_unresolvable() {
        let session_config = SessionConfig::from_config(&Config::default()).unwrap();
        assert!(matches!(
            session_config.role_strategy(),
            Err(RoleError::Unresolvable)
        ));
    }

    #[tokio::test]
    async fn test_replica_without_rendezvous_fails() {
        let mut session_config = SessionConfig::from_config(&Config::default()).unwrap();
        session_config.authority = Some(false);
        let strategy = session_config.role_strategy().unwrap();
        let handle = SessionHandle::new();
        let result = create_session(&session_config, strategy.as_ref(), &handle).await;
        assert!(matches!(result, Err(SessionError::MissingRendezvous)));
    }
}
