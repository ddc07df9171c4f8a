//! TCP server for remote swarm clients
//!
//! One listener task accepts connections. Each connection gets a receive task
//! that decodes frames and applies them to the [`SharedSnapshot`], and, once
//! the client registers, a notify task that pushes the snapshot at the
//! requested cadence. Both write through the same per-connection writer lock
//! so an ack never interleaves with a notification.

use futures_util::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use swarmlink_protocol::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::framing::{shared_writer, FrameReader, SharedWriter};
use crate::snapshot::SharedSnapshot;

/// Swarm control server
pub struct SwarmServer {
    listener: TcpListener,
    snapshot: Arc<SharedSnapshot>,
    cancel: CancellationToken,
}

impl SwarmServer {
    /// Bind the listening socket.
    pub async fn bind(
        address: &str,
        snapshot: Arc<SharedSnapshot>,
        cancel: CancellationToken,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            snapshot,
            cancel,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until cancelled.
    pub async fn run(self) -> ServerResult<()> {
        info!("Swarm server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Swarm server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        info!("New swarm client connection from {}", peer_addr);
                        let connection = Connection {
                            peer_addr,
                            snapshot: Arc::clone(&self.snapshot),
                            cancel: self.cancel.child_token(),
                        };
                        tokio::spawn(async move {
                            if let Err(e) = connection.run(stream).await {
                                error!("Swarm client {} connection error: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }
    }
}

struct NotifyTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Connection {
    peer_addr: SocketAddr,
    snapshot: Arc<SharedSnapshot>,
    cancel: CancellationToken,
}

impl Connection {
    async fn run(self, stream: TcpStream) -> ServerResult<()> {
        let (read_half, write_half) = stream.into_split();
        let mut reader = FrameReader::new(read_half);
        let writer = shared_writer(write_half);
        let mut notify: Option<NotifyTask> = None;

        let result = loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => break Ok(()),
                frame = reader.next_frame() => frame,
            };
            match frame {
                Ok(Some(Ok(message))) => {
                    // A peer that stops reading can hold the writer forever.
                    let dispatched = tokio::select! {
                        _ = self.cancel.cancelled() => break Ok(()),
                        dispatched = self.dispatch(message, &writer, &mut notify) => dispatched,
                    };
                    if let Err(e) = dispatched {
                        break Err(e);
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Malformed frame from {}: {}", self.peer_addr, e);
                }
                Ok(None) => {
                    info!("Swarm client {} disconnected", self.peer_addr);
                    break Ok(());
                }
                Err(e) => break Err(ServerError::Io(e)),
            }
        };

        self.cancel.cancel();
        if let Some(task) = notify {
            let _ = task.handle.await;
        }
        result
    }

    async fn dispatch(
        &self,
        message: Message,
        writer: &SharedWriter,
        notify: &mut Option<NotifyTask>,
    ) -> ServerResult<()> {
        match message {
            Message::RegisterNotification { interval_ms } => {
                info!(peer = %self.peer_addr, interval_ms, "Notification registration");
                writer.lock().await.send(Message::RegisterNotificationAck).await?;

                if let Some(previous) = notify.take() {
                    debug!(peer = %self.peer_addr, "Replacing notification task");
                    previous.cancel.cancel();
                    let _ = previous.handle.await;
                }
                let cancel = self.cancel.child_token();
                let handle = tokio::spawn(notify_loop(
                    self.peer_addr,
                    Arc::clone(&self.snapshot),
                    Arc::clone(writer),
                    Duration::from_millis(u64::from(interval_ms.max(1))),
                    cancel.clone(),
                ));
                *notify = Some(NotifyTask { cancel, handle });
            }
            Message::SetTargets(targets) => {
                info!(peer = %self.peer_addr, count = targets.len(), "Received targets");
                self.snapshot.replace_targets(targets);
            }
            Message::DroneOperations(operations) => {
                info!(peer = %self.peer_addr, ?operations, "Received vehicle operations");
                self.snapshot.replace_operations(operations);
            }
            Message::SwarmOperation(command) => {
                info!(peer = %self.peer_addr, ?command, "Received swarm operation");
                self.snapshot.fan_out(command.vehicle_operation());
                writer.lock().await.send(Message::SwarmOperationAck).await?;
            }
            other => {
                warn!(peer = %self.peer_addr, id = ?other.id(), "Unexpected message from client");
            }
        }
        Ok(())
    }
}

async fn notify_loop(
    peer_addr: SocketAddr,
    snapshot: Arc<SharedSnapshot>,
    writer: SharedWriter,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let message = Message::SwarmNotification(snapshot.notification());
                let sent = tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = async { writer.lock().await.send(message).await } => sent,
                };
                if let Err(e) = sent {
                    debug!("Notification to {} stopped: {}", peer_addr, e);
                    cancel.cancel();
                    break;
                }
            }
        }
    }
}
