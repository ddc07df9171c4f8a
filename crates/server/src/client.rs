//! Client side of the swarm control protocol.

use futures_util::SinkExt;
use std::net::SocketAddr;
use swarmlink_core::SwarmOperation;
use swarmlink_protocol::{Message, OperationMap, SwarmNotification, TargetMap};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ServerError, ServerResult};
use crate::framing::{shared_writer, FrameReader, SharedWriter};

/// Connection to a swarm control server.
///
/// A background task reads every frame the server sends. Notifications
/// overwrite one another, so only the most recent is ever held; everything
/// else is queued for [`SwarmClient::next_reply`].
pub struct SwarmClient {
    writer: SharedWriter,
    replies: mpsc::UnboundedReceiver<Message>,
    notifications: watch::Receiver<Option<SwarmNotification>>,
    reader: JoinHandle<()>,
}

impl SwarmClient {
    pub async fn connect(address: SocketAddr) -> ServerResult<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| ServerError::Connect { address, source })?;
        let (read_half, write_half) = stream.into_split();

        let (reply_tx, replies) = mpsc::unbounded_channel();
        let (note_tx, notifications) = watch::channel(None);
        let reader = tokio::spawn(read_loop(FrameReader::new(read_half), reply_tx, note_tx));

        Ok(Self {
            writer: shared_writer(write_half),
            replies,
            notifications,
            reader,
        })
    }

    pub async fn send(&self, message: Message) -> ServerResult<()> {
        self.writer.lock().await.send(message).await?;
        Ok(())
    }

    /// Write raw bytes, bypassing the encoder.
    pub async fn send_raw(&self, bytes: &[u8]) -> ServerResult<()> {
        let mut writer = self.writer.lock().await;
        let stream = writer.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    pub async fn register_notification(&self, interval_ms: u16) -> ServerResult<()> {
        self.send(Message::RegisterNotification { interval_ms }).await
    }

    pub async fn set_targets(&self, targets: TargetMap) -> ServerResult<()> {
        self.send(Message::SetTargets(targets)).await
    }

    pub async fn drone_operations(&self, operations: OperationMap) -> ServerResult<()> {
        self.send(Message::DroneOperations(operations)).await
    }

    pub async fn swarm_operation(&self, operation: SwarmOperation) -> ServerResult<()> {
        self.send(Message::SwarmOperation(operation)).await
    }

    /// Most recent notification received, if any
    pub fn latest_notification(&self) -> Option<SwarmNotification> {
        self.notifications.borrow().clone()
    }

    /// Wait for a notification newer than the last one returned here.
    ///
    /// Notifications that arrive while nobody is waiting are replaced by
    /// later ones.
    pub async fn next_notification(&mut self) -> ServerResult<SwarmNotification> {
        self.notifications
            .changed()
            .await
            .map_err(|_| ServerError::Closed)?;
        self.notifications
            .borrow_and_update()
            .clone()
            .ok_or(ServerError::Closed)
    }

    /// Wait for the next message that is not a notification.
    pub async fn next_reply(&mut self) -> ServerResult<Message> {
        self.replies.recv().await.ok_or(ServerError::Closed)
    }
}

impl Drop for SwarmClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut reader: FrameReader,
    replies: mpsc::UnboundedSender<Message>,
    notifications: watch::Sender<Option<SwarmNotification>>,
) {
    loop {
        match reader.next_frame().await {
            Ok(Some(Ok(Message::SwarmNotification(note)))) => {
                if notifications.send(Some(note)).is_err() {
                    break;
                }
            }
            Ok(Some(Ok(message))) => {
                if replies.send(message).is_err() {
                    break;
                }
            }
            Ok(Some(Err(e))) => warn!("Malformed frame from server: {}", e),
            Ok(None) => {
                debug!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!("Swarm client read error: {}", e);
                break;
            }
        }
    }
}
