//! The per-frame lockstep exchange.
//!
//! The authority sends first and then waits; the replica waits first and then
//! answers. Neither side can start its next frame until the peer's record for
//! this frame has arrived.

use crate::error::StreamError;
use crate::link::PeerLink;
use crate::wire::{AuthorityFrame, ReplicaFrame};

/// The authority's end: sends [`AuthorityFrame`], receives [`ReplicaFrame`].
pub type AuthorityLink = PeerLink<ReplicaFrame, AuthorityFrame>;

/// The replica's end: sends [`ReplicaFrame`], receives [`AuthorityFrame`].
pub type ReplicaLink = PeerLink<AuthorityFrame, ReplicaFrame>;

/// Send this frame's state, then wait for the replica's paddle.
pub async fn exchange_as_authority(
    link: &mut AuthorityLink,
    frame: AuthorityFrame,
) -> Result<ReplicaFrame, StreamError> {
    link.send(frame).await?;
    let reply = link.recv().await?;
    tracing::trace!(?frame, reply = reply.paddle_y, "authority exchange");
    Ok(reply)
}

/// Wait for the authority's state, then answer with our paddle.
///
/// `reply` is our own paddle position, which does not depend on what the
/// authority sends, so it is taken up front.
pub async fn exchange_as_replica(
    link: &mut ReplicaLink,
    reply: ReplicaFrame,
) -> Result<AuthorityFrame, StreamError> {
    let frame = link.recv().await?;
    link.send(reply).await?;
    tracing::trace!(?frame, reply = reply.paddle_y, "replica exchange");
    Ok(frame)
}
