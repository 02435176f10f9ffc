//! Peer-to-peer replication: the fixed-size wire records, the lockstep frame
//! exchange, and the TCP plumbing that carries it.

pub mod error;
pub mod exchange;
pub mod handshake;
pub mod link;
pub mod platform;
pub mod retry;
pub mod transport;
pub mod wire;

pub use error::{ConnectionError, StreamError};
pub use exchange::{AuthorityLink, ReplicaLink, exchange_as_authority, exchange_as_replica};
pub use handshake::exchange_display;
pub use link::PeerLink;
pub use platform::{SocketConfig, configure_stream, create_listener, is_local_address};
pub use retry::{RetryConfig, RetryState};
pub use transport::{DEFAULT_PORT, PeerListener, connect_to_peer};
pub use wire::{AuthorityFrame, DisplayInfo, ReplicaFrame, WireRecord, read_record, write_record};
