//! WebSocket Relay Server
//!
//! Accepts sockets, enforces the origin policy and connection ceiling, and
//! bridges each connection to the relay hub. The hub is the only owner of
//! session state; connection tasks just decode frames and forward events.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header::ORIGIN, StatusCode};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::network::config::{AllowedOrigin, ConfigError, ServerConfig};
use crate::network::lifecycle::{Relay, RelayEvent};
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::presence::participant::ConnectionId;

/// Capacity of the transport -> hub event queue.
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// How long shutdown waits for writers and the hub to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Socket-level failure (bind, local address).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// The relay server.
pub struct RelayServer {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Bound listener.
    listener: TcpListener,
    /// Connection ceiling.
    permits: Arc<Semaphore>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Bind the listener. Use port 0 for an ephemeral port.
    pub async fn bind(config: ServerConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_connections)),
            config: Arc::new(config),
            listener,
            shutdown_tx,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run until `shutdown` is called.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), RelayError> {
        info!(
            "Relay server v{} listening on {} (origin: {})",
            self.config.version,
            self.local_addr()?,
            self.config.allowed_origin,
        );

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let hub = tokio::spawn(Relay::new(self.config.guard).run(event_rx));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let Ok(permit) = self.permits.clone().try_acquire_owned() else {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            };
                            debug!("New connection from {}", addr);
                            tokio::spawn(handle_connection(
                                stream,
                                addr,
                                event_tx.clone(),
                                self.config.clone(),
                                self.shutdown_tx.subscribe(),
                                permit,
                            ));
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // The hub exits once every connection task has dropped its sender.
        drop(event_tx);
        if tokio::time::timeout(DRAIN_TIMEOUT, hub).await.is_err() {
            warn!("Relay hub did not drain within {:?}", DRAIN_TIMEOUT);
        }

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.config.max_connections - self.permits.available_permits()
    }
}

/// Handshake rejection for a disallowed origin.
fn forbidden_origin() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Origin not allowed".to_string()));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
}

/// Drive one socket from handshake to disconnect.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::Sender<RelayEvent>,
    config: Arc<ServerConfig>,
    mut shutdown_rx: broadcast::Receiver<()>,
    _permit: OwnedSemaphorePermit,
) {
    let allowed: AllowedOrigin = config.allowed_origin.clone();
    let check_origin = move |request: &Request, response: Response| {
        let origin = request.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
        if allowed.permits(origin) {
            Ok(response)
        } else {
            warn!("Rejected handshake from {} with origin {:?}", addr, origin);
            Err(forbidden_origin())
        }
    };

    let handshake = tokio::time::timeout(config.handshake_timeout, accept_hdr_async(stream, check_origin));
    let ws_stream = match handshake.await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
        Err(_) => {
            warn!("WebSocket handshake from {} timed out after {:?}", addr, config.handshake_timeout);
            return;
        }
    };

    let id = ConnectionId::new_v4();
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<ServerMessage>(config.outbox_capacity);

    if events.send(RelayEvent::Connected { id, outbox: outbox_tx }).await.is_err() {
        return;
    }

    // Ends when the hub detaches the outbox.
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    error!("Failed to serialize {}: {}", msg.event_name(), e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let message = match ClientMessage::from_json(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                debug!("Dropped invalid frame from {}: {}", id.short(), e);
                                continue;
                            }
                        };
                        if events.send(RelayEvent::Message { id, message }).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {}", id.short());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client {} closed", id.short());
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error for {}: {}", id.short(), e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    let _ = events.send(RelayEvent::Disconnected { id }).await;
    drop(events);

    let abort = writer.abort_handle();
    if tokio::time::timeout(DRAIN_TIMEOUT, writer).await.is_err() {
        abort.abort();
    }

    debug!("Connection {} from {} cleaned up", id.short(), addr);
}
