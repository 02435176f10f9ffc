//! Fixed-size wire records.
//!
//! Every record is a short run of signed 32-bit integers in network byte
//! order. There is no length prefix, type tag, or version: each side knows
//! exactly which record comes next from its role and the lockstep order.
//!
//! ```text
//! authority -> replica   +--------+--------+----------+
//!                        | ball_x | ball_y | paddle_y |   12 bytes
//!                        +--------+--------+----------+
//! replica -> authority   +----------+
//!                        | paddle_y |                     4 bytes
//!                        +----------+
//! ```

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::StreamError;

/// A record with a fixed encoded size.
pub trait WireRecord: Sized + Send + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Append exactly [`SIZE`](Self::SIZE) bytes to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Decode from exactly [`SIZE`](Self::SIZE) bytes.
    fn decode(bytes: &[u8]) -> Self;
}

/// Authority to replica, once per authority frame. All values are field
/// coordinates truncated to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityFrame {
    pub ball_x: i32,
    pub ball_y: i32,
    /// Center y of the authority's own paddle.
    pub paddle_y: i32,
}

/// Replica to authority, once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaFrame {
    /// Center y of the replica's own paddle.
    pub paddle_y: i32,
}

/// Display resolution announced in the optional session-start handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub width: i32,
    pub height: i32,
}

fn word(bytes: &[u8], index: usize) -> i32 {
    let mut be = [0u8; 4];
    be.copy_from_slice(&bytes[index * 4..index * 4 + 4]);
    i32::from_be_bytes(be)
}

impl WireRecord for AuthorityFrame {
    const SIZE: usize = 12;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.ball_x.to_be_bytes());
        buf.extend_from_slice(&self.ball_y.to_be_bytes());
        buf.extend_from_slice(&self.paddle_y.to_be_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            ball_x: word(bytes, 0),
            ball_y: word(bytes, 1),
            paddle_y: word(bytes, 2),
        }
    }
}

impl WireRecord for ReplicaFrame {
    const SIZE: usize = 4;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.paddle_y.to_be_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            paddle_y: word(bytes, 0),
        }
    }
}

impl WireRecord for DisplayInfo {
    const SIZE: usize = 8;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.width.to_be_bytes());
        buf.extend_from_slice(&self.height.to_be_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            width: word(bytes, 0),
            height: word(bytes, 1),
        }
    }
}

/// Read one record, waiting as long as it takes. There is no timeout: a
/// silent peer blocks the caller indefinitely.
pub async fn read_record<T, R>(reader: &mut R) -> Result<T, StreamError>
where
    T: WireRecord,
    R: AsyncReadExt + Unpin,
{
    let mut bytes = vec![0u8; T::SIZE];
    reader
        .read_exact(&mut bytes)
        .await
        .map_err(StreamError::from_read)?;
    Ok(T::decode(&bytes))
}

/// Write one record and flush it.
pub async fn write_record<T, W>(writer: &mut W, record: &T) -> Result<(), StreamError>
where
    T: WireRecord,
    W: AsyncWriteExt + Unpin,
{
    let mut buf = Vec::with_capacity(T::SIZE);
    record.encode(&mut buf);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}
