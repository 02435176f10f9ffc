//! Establishing the single peer connection.
//!
//! The authority binds, accepts exactly one peer, and closes the listening
//! socket. The replica connects, retrying on a fixed delay until the authority
//! is up. Either side can be cancelled through the shutdown watch while it
//! waits.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::error::ConnectionError;
use crate::platform::{SocketConfig, configure_stream, create_listener};
use crate::retry::{RetryConfig, RetryState};

/// Port both peers use unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// The authority's listening socket, waiting for its one peer.
pub struct PeerListener {
    listener: TcpListener,
    addr: SocketAddr,
    socket_config: SocketConfig,
}

impl PeerListener {
    /// Bind the listening socket.
    pub fn bind(addr: SocketAddr, socket_config: SocketConfig) -> Result<Self, ConnectionError> {
        let listener = create_listener(addr, &socket_config)
            .map_err(|source| ConnectionError::Bind { addr, source })?;
        let addr = listener.local_addr().unwrap_or(addr);
        tracing::info!("waiting for peer on {addr}");
        Ok(Self {
            listener,
            addr,
            socket_config,
        })
    }

    /// The bound address (with the real port when bound to port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept one peer, then drop the listening socket.
    pub async fn accept_one(
        self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<TcpStream, ConnectionError> {
        let addr = self.addr;
        if *shutdown.borrow() {
            return Err(ConnectionError::Cancelled);
        }
        let stream = loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, peer) = result
                        .map_err(|source| ConnectionError::Accept { addr, source })?;
                    tracing::info!("accepted peer {peer}");
                    break stream;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("stopped while waiting for peer");
                        return Err(ConnectionError::Cancelled);
                    }
                }
            }
        };
        configure_stream(&stream, &self.socket_config)
            .map_err(|source| ConnectionError::Accept { addr, source })?;
        drop(self.listener);
        tracing::debug!("listening socket on {addr} closed");
        Ok(stream)
    }
}

/// Connect to the authority at `addr`, pausing `retry.delay` between failed
/// attempts.
pub async fn connect_to_peer(
    addr: SocketAddr,
    retry: RetryConfig,
    socket_config: &SocketConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<TcpStream, ConnectionError> {
    let mut state = RetryState::new(retry);
    loop {
        if *shutdown.borrow() {
            return Err(ConnectionError::Cancelled);
        }
        tracing::info!("connecting to {addr} (attempt {})", state.attempts() + 1);

        let source = match TcpStream::connect(addr).await {
            Ok(stream) => match configure_stream(&stream, socket_config) {
                Ok(()) => {
                    tracing::info!("connected to {addr}");
                    return Ok(stream);
                }
                Err(e) => e,
            },
            Err(e) => e,
        };
        tracing::warn!("connect to {addr} failed: {source}");

        let Some(delay) = state.next_delay() else {
            return Err(ConnectionError::Connect {
                addr,
                attempts: state.attempts(),
                source,
            });
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Err(ConnectionError::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            delay: Duration::from_millis(20),
            max_attempts: None,
        }
    }

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 8080);
    }

    #[tokio::test]
    async fn test_listener_accepts_one_peer() {
        let listener = PeerListener::bind(loopback(), SocketConfig::default()).unwrap();
        let addr = listener.local_addr();
        let (_tx, mut rx) = watch::channel(false);

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let server = listener.accept_one(&mut rx).await.unwrap();
        let client = client.await.unwrap();

        assert!(server.nodelay().unwrap());
        assert_eq!(server.peer_addr().unwrap(), client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_listening_socket_closed_after_accept() {
        let listener = PeerListener::bind(loopback(), SocketConfig::default()).unwrap();
        let addr = listener.local_addr();
        let (_tx, mut rx) = watch::channel(false);

        let first = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let _server = listener.accept_one(&mut rx).await.unwrap();
        let _first = first.await.unwrap();

        assert!(
            TcpStream::connect(addr).await.is_err(),
            "a second peer must be refused"
        );
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let config = SocketConfig {
            reuse_addr: false,
            ..Default::default()
        };
        let result = PeerListener::bind(addr, config);
        assert!(matches!(result, Err(ConnectionError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_connect_retries_until_listener_appears() {
        // Reserve a port, then free it so the first attempts are refused.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let (_tx, mut rx) = watch::channel(false);

        let late_listener = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let listener = PeerListener::bind(addr, SocketConfig::default()).unwrap();
            let (_tx, mut rx) = watch::channel(false);
            listener.accept_one(&mut rx).await.unwrap()
        });

        let stream = connect_to_peer(addr, fast_retry(), &SocketConfig::default(), &mut rx)
            .await
            .unwrap();
        let server = late_listener.await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), server.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_bounded_retry_gives_up() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let (_tx, mut rx) = watch::channel(false);
        let retry = RetryConfig {
            delay: Duration::from_millis(5),
            max_attempts: Some(2),
        };
        let result = connect_to_peer(addr, retry, &SocketConfig::default(), &mut rx).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Connect { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_cancels_connect_loop() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let (tx, mut rx) = watch::channel(false);
        let retry = RetryConfig {
            delay: Duration::from_secs(60),
            max_attempts: None,
        };

        let connecting = tokio::spawn(async move {
            connect_to_peer(addr, retry, &SocketConfig::default(), &mut rx).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), connecting)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ConnectionError::Cancelled)));
    }

    #[tokio::test]
    async fn test_stop_cancels_accept() {
        let listener = PeerListener::bind(loopback(), SocketConfig::default()).unwrap();
        let (tx, mut rx) = watch::channel(false);
        let waiting = tokio::spawn(async move { listener.accept_one(&mut rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        let result = waiting.await.unwrap();
        assert!(matches!(result, Err(ConnectionError::Cancelled)));
    }
}
