//! Frame reading over a TCP read half.
//!
//! `FramedRead` ends its stream on the first decoder error, but a malformed
//! frame must not end the connection, so reads are driven by hand.

use bytes::BytesMut;
use std::sync::Arc;
use swarmlink_protocol::{decode, Message, ProtocolResult, SwarmCodec};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;

/// Write half of a connection, shared by every task that sends on it
pub type SharedWriter = Arc<Mutex<FramedWrite<OwnedWriteHalf, SwarmCodec>>>;

pub fn shared_writer(half: OwnedWriteHalf) -> SharedWriter {
    Arc::new(Mutex::new(FramedWrite::new(half, SwarmCodec)))
}

/// Buffered frame reader.
#[derive(Debug)]
pub struct FrameReader {
    half: OwnedReadHalf,
    buffer: BytesMut,
}

impl FrameReader {
    pub fn new(half: OwnedReadHalf) -> Self {
        Self {
            half,
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Wait for the next frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. A malformed
    /// frame is returned as an inner error and reading may continue.
    /// Cancel safe: bytes already read stay buffered.
    pub async fn next_frame(&mut self) -> std::io::Result<Option<ProtocolResult<Message>>> {
        loop {
            match decode(&mut self.buffer) {
                Ok(Some(message)) => return Ok(Some(Ok(message))),
                Ok(None) => {}
                Err(e) => return Ok(Some(Err(e))),
            }
            if self.half.read_buf(&mut self.buffer).await? == 0 {
                return Ok(None);
            }
        }
    }
}
