//! Background send and receive tasks for one peer connection.
//!
//! The stream is split and each half is driven by its own task. The frame loop
//! talks to the tasks through two channels of capacity 1, so at most one
//! record per direction is ever in flight; a slow peer stalls only the
//! frame waiting on it, never the reading or writing of unrelated work.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::StreamError;
use crate::wire::{WireRecord, read_record, write_record};

/// One end of an established connection that receives `In` records and sends
/// `Out` records.
pub struct PeerLink<In, Out> {
    outbound: Option<mpsc::Sender<Out>>,
    inbound: mpsc::Receiver<Result<In, StreamError>>,
    /// Write error left by the send task when it gave up.
    send_failure: oneshot::Receiver<StreamError>,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
    _records: PhantomData<fn(In) -> Out>,
}

impl<In: WireRecord, Out: WireRecord + Sync> PeerLink<In, Out> {
    /// Spawn the send and receive tasks over the two halves of a stream.
    pub fn spawn<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel::<Out>(1);
        let (in_tx, in_rx) = mpsc::channel::<Result<In, StreamError>>(1);
        let (failure_tx, failure_rx) = oneshot::channel();

        let recv_task = tokio::spawn(Self::recv_loop(reader, in_tx.clone()));
        let send_task = tokio::spawn(Self::send_loop(writer, out_rx, in_tx, failure_tx));

        Self {
            outbound: Some(out_tx),
            inbound: in_rx,
            send_failure: failure_rx,
            send_task,
            recv_task,
            _records: PhantomData,
        }
    }

    /// Queue a record for sending. Waits while the previous record is still
    /// being written.
    pub async fn send(&mut self, record: Out) -> Result<(), StreamError> {
        let Some(outbound) = &self.outbound else {
            return Err(StreamError::LinkDown);
        };
        if outbound.send(record).await.is_err() {
            return Err(self.failure_cause());
        }
        Ok(())
    }

    /// Wait for the next record from the peer.
    pub async fn recv(&mut self) -> Result<In, StreamError> {
        match self.inbound.recv().await {
            Some(Err(StreamError::LinkDown)) | None => Err(self.failure_cause()),
            Some(result) => result,
        }
    }

    /// Stop both tasks and shut the stream down in both directions.
    pub async fn close(mut self) {
        self.inbound.close();
        self.outbound = None;
        if let Err(e) = (&mut self.send_task).await {
            tracing::debug!("send task ended abnormally: {e}");
        }
        self.recv_task.abort();
        tracing::debug!("peer link closed");
    }

    /// The error the send task reported before exiting, if it left one.
    fn failure_cause(&mut self) -> StreamError {
        self.send_failure
            .try_recv()
            .unwrap_or(StreamError::LinkDown)
    }

    async fn recv_loop<R>(mut reader: R, inbound: mpsc::Sender<Result<In, StreamError>>)
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let result = read_record::<In, _>(&mut reader).await;
            let failed = result.is_err();
            if inbound.send(result).await.is_err() || failed {
                break;
            }
        }
        tracing::trace!("receive task exiting");
    }

    async fn send_loop<W>(
        mut writer: W,
        mut outbound: mpsc::Receiver<Out>,
        inbound: mpsc::Sender<Result<In, StreamError>>,
        failure: oneshot::Sender<StreamError>,
    ) where
        W: AsyncWrite + Unpin,
    {
        while let Some(record) = outbound.recv().await {
            if let Err(e) = write_record(&mut writer, &record).await {
                tracing::warn!("write to peer failed: {e}");
                let _ = failure.send(e);
                // Wake a pending `recv`. A queued record keeps its slot; the
                // cause is read from `failure` either way.
                let _ = inbound.try_send(Err(StreamError::LinkDown));
                return;
            }
        }
        if let Err(e) = writer.shutdown().await {
            tracing::debug!("stream shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{AuthorityFrame, ReplicaFrame};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, duplex, split};

    /// A write half whose every write fails.
    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    type AuthoritySide = PeerLink<ReplicaFrame, AuthorityFrame>;
    type ReplicaSide = PeerLink<AuthorityFrame, ReplicaFrame>;

    fn linked_pair() -> (AuthoritySide, ReplicaSide) {
        let (a, b) = duplex(256);
        let (ar, aw) = split(a);
        let (br, bw) = split(b);
        (PeerLink::spawn(ar, aw), PeerLink::spawn(br, bw))
    }

    #[tokio::test]
    async fn test_records_flow_both_ways() {
        let (mut authority, mut replica) = linked_pair();
        let frame = AuthorityFrame {
            ball_x: 500,
            ball_y: 250,
            paddle_y: 250,
        };

        authority.send(frame).await.unwrap();
        assert_eq!(replica.recv().await.unwrap(), frame);

        replica.send(ReplicaFrame { paddle_y: 77 }).await.unwrap();
        assert_eq!(authority.recv().await.unwrap().paddle_y, 77);
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let (mut authority, mut replica) = linked_pair();
        let sender = tokio::spawn(async move {
            for x in 0..20 {
                authority
                    .send(AuthorityFrame {
                        ball_x: x,
                        ball_y: 0,
                        paddle_y: 0,
                    })
                    .await
                    .unwrap();
            }
            authority
        });
        for x in 0..20 {
            assert_eq!(replica.recv().await.unwrap().ball_x, x);
        }
        sender.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_close_surfaces_as_error() {
        let (mut authority, replica) = linked_pair();
        replica.close().await;
        let result = authority.recv().await;
        assert!(
            matches!(result, Err(StreamError::Closed)),
            "expected Closed, got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_close_shuts_down_write_half() {
        let (a, mut b) = duplex(64);
        let (ar, aw) = split(a);
        let link: AuthoritySide = PeerLink::spawn(ar, aw);
        link.close().await;

        let mut buf = [0u8; 8];
        let n = b.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "peer should observe EOF after close");
    }

    #[tokio::test]
    async fn test_exchange_after_peer_gone_fails() {
        let (a, b) = duplex(64);
        let (ar, aw) = split(a);
        let mut link: AuthoritySide = PeerLink::spawn(ar, aw);
        drop(b);

        let frame = AuthorityFrame {
            ball_x: 1,
            ball_y: 2,
            paddle_y: 3,
        };
        let _ = link.send(frame).await;
        let result = link.recv().await;
        assert!(result.is_err(), "a vanished peer must surface as a stream error");
    }

    #[tokio::test]
    async fn test_write_error_kept_while_record_is_queued() {
        let (reader, mut peer) = duplex(64);
        peer.write_all(&77i32.to_be_bytes()).await.unwrap();
        let mut link: AuthoritySide = PeerLink::spawn(reader, BrokenWriter);
        // Let the receive task queue the peer's record.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let frame = AuthorityFrame {
            ball_x: 1,
            ball_y: 2,
            paddle_y: 3,
        };
        let error = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Err(e) = link.send(frame).await {
                    break e;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(
            matches!(&error, StreamError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe),
            "expected the write error, got {error:?}"
        );

        // The record that was already queued is still delivered.
        assert_eq!(link.recv().await.unwrap().paddle_y, 77);
    }
}
