//! Socket options and local-address probing.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::{TcpListener, TcpStream};

/// Options applied to the session's sockets.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm: every frame record goes out immediately.
    /// Default: true.
    pub tcp_nodelay: bool,
    /// TCP keepalive idle time, or `None` to leave keepalive off. Keepalive
    /// only detects a dead host; it is not a read timeout. Default: `None`.
    pub keepalive: Option<Duration>,
    /// `SO_REUSEADDR` on the listening socket, so a new session can rebind
    /// the fixed port right after the previous one closed. Default: true
    /// except on Windows.
    pub reuse_addr: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive: None,
            reuse_addr: !cfg!(target_os = "windows"),
        }
    }
}

/// Apply the per-connection options to an established stream.
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> std::io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;
    if let Some(idle) = config.keepalive {
        SockRef::from(stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
    }
    Ok(())
}

/// Create a listening socket on `addr`. The backlog is 1: exactly one peer is
/// ever accepted.
pub fn create_listener(addr: SocketAddr, config: &SocketConfig) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    if config.reuse_addr {
        socket.set_reuse_address(true)?;
    }
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Whether `ip` is assigned to an interface on this host, tested by binding
/// an ephemeral socket to it. The kernel only allows the bind for local
/// addresses.
pub fn is_local_address(ip: IpAddr) -> bool {
    if ip.is_unspecified() {
        return false;
    }
    let Ok(socket) = Socket::new(Domain::for_address(SocketAddr::new(ip, 0)), Type::STREAM, None)
    else {
        return false;
    };
    socket.bind(&SocketAddr::new(ip, 0).into()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_nodelay_is_set() {
        let config = SocketConfig::default();
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), &config).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        configure_stream(&client, &config).unwrap();
        assert!(client.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_keepalive_opt_in() {
        let config = SocketConfig {
            keepalive: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), &config).unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        configure_stream(&client, &config).unwrap();
        assert!(SockRef::from(&client).keepalive().unwrap());
    }

    #[tokio::test]
    async fn test_listener_rebinds_after_close() {
        let config = SocketConfig::default();
        let first = create_listener("127.0.0.1:0".parse().unwrap(), &config).unwrap();
        let addr = first.local_addr().unwrap();
        drop(first);
        if !config.reuse_addr {
            return;
        }
        assert!(create_listener(addr, &config).is_ok());
    }

    #[test]
    fn test_loopback_is_local() {
        assert!(is_local_address(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn test_foreign_address_is_not_local() {
        // TEST-NET-3, reserved for documentation and never assigned.
        assert!(!is_local_address(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 77))));
    }

    #[test]
    fn test_unspecified_is_not_local() {
        assert!(!is_local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
    }
}
