//! Optional one-time handshake run before the first frame.
//!
//! Both peers announce their display resolution. Field arithmetic never uses
//! it; it is informational for the presentation layer. Both sides must agree
//! on whether the handshake runs at all, since nothing on the wire says so.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::StreamError;
use crate::wire::{DisplayInfo, read_record, write_record};

/// Send our display info, then read the peer's. Writing first on both sides
/// cannot deadlock: eight bytes always fit in the socket buffer.
pub async fn exchange_display<S>(
    stream: &mut S,
    local: DisplayInfo,
) -> Result<DisplayInfo, StreamError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_record(stream, &local).await?;
    let peer: DisplayInfo = read_record(stream).await?;
    tracing::info!(
        "peer display {}x{} (local {}x{})",
        peer.width,
        peer.height,
        local.width,
        local.height
    );
    Ok(peer)
}
