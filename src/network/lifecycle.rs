//! Connection Lifecycle
//!
//! The relay hub. Owns the session registry, guard, router and identity RNG,
//! and applies connection events strictly one at a time. Every handler is
//! synchronous and runs to completion, so registry mutations never
//! interleave. Transport tasks feed it through a single mpsc channel, which
//! keeps per-connection FIFO order.

use std::time::Instant;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::router::{BroadcastRouter, Outbox};
use crate::presence::guard::{GuardConfig, RateGuard};
use crate::presence::identity::generate_participant;
use crate::presence::participant::{ConnectionId, Participant};
use crate::presence::registry::SessionRegistry;

/// Events delivered from transport tasks to the hub.
#[derive(Debug)]
pub enum RelayEvent {
    /// Transport accepted a connection.
    Connected {
        /// Identity allocated by the transport.
        id: ConnectionId,
        /// Queue drained by the connection's writer task.
        outbox: Outbox,
    },
    /// Decoded inbound message.
    Message {
        /// Originating connection.
        id: ConnectionId,
        /// The message.
        message: ClientMessage,
    },
    /// Transport closed or failed.
    Disconnected {
        /// The closed connection.
        id: ConnectionId,
    },
}

/// Relay state machine over all connections.
pub struct Relay {
    registry: SessionRegistry,
    guard: RateGuard,
    router: BroadcastRouter,
    rng: StdRng,
}

impl Relay {
    /// Create a relay with an entropy-seeded identity generator.
    pub fn new(guard: GuardConfig) -> Self {
        Self::with_rng(guard, StdRng::from_entropy())
    }

    /// Create a relay with a caller-supplied RNG.
    pub fn with_rng(guard: GuardConfig, rng: StdRng) -> Self {
        Self {
            registry: SessionRegistry::new(),
            guard: RateGuard::new(guard),
            router: BroadcastRouter::new(),
            rng,
        }
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Get participant count.
    pub fn participant_count(&self) -> usize {
        self.registry.len()
    }

    /// Apply one transport event.
    pub fn apply(&mut self, event: RelayEvent, now: Instant) {
        match event {
            RelayEvent::Connected { id, outbox } => {
                self.connect(id, outbox);
            }
            RelayEvent::Message { id, message } => self.handle(id, message, now),
            RelayEvent::Disconnected { id } => {
                self.disconnect(&id);
            }
        }
    }

    /// Activate a new connection.
    ///
    /// The participant is fully built and registered first, then the new
    /// connection gets its own record, then the roster of everyone else, and
    /// only then is the join announced to the others.
    pub fn connect(&mut self, id: ConnectionId, outbox: Outbox) -> Option<Participant> {
        let participant = generate_participant(&mut self.rng, id);

        if let Err(e) = self.registry.insert(participant.clone()) {
            warn!("Refusing connection: {}", e);
            return None;
        }
        self.router.attach(id, outbox);

        let roster: Vec<Participant> = self.registry
            .all_except(&id)
            .into_iter()
            .cloned()
            .collect();

        self.router.send_to(&id, ServerMessage::UserData(participant.clone()));
        self.router.send_to(&id, ServerMessage::ExistingUsers(roster));
        self.router.announce_join(&self.registry, &participant);

        info!("User connected: {} as {} ({} online)", id, participant.username, self.registry.len());
        self.evict_stalled();
        Some(participant)
    }

    /// Process an inbound message from an active connection.
    /// Messages from unknown or terminated connections are ignored.
    pub fn handle(&mut self, id: ConnectionId, message: ClientMessage, now: Instant) {
        if !self.registry.contains(&id) {
            debug!("Ignoring message from inactive connection {}", id.short());
            return;
        }

        match message {
            ClientMessage::UpdatePosition(raw) => {
                match self.guard.admit(&mut self.registry, &id, &raw, now) {
                    Ok(position) => self.router.announce_move(&self.registry, &id, position),
                    Err(rejection) => {
                        debug!("Dropped position from {}: {:?}", id.short(), rejection);
                    }
                }
            }
            signal => {
                if let Some(req) = signal.into_signal() {
                    self.router.relay_signal(&self.registry, req.kind, &req.target, req.payload, id);
                }
            }
        }
        self.evict_stalled();
    }

    /// Terminate a connection. Returns whether it was active.
    ///
    /// Graceful closes and transport errors take the same path; repeating
    /// it for the same id is a no-op.
    pub fn disconnect(&mut self, id: &ConnectionId) -> bool {
        let was_active = self.terminate(id);
        self.evict_stalled();
        was_active
    }

    fn terminate(&mut self, id: &ConnectionId) -> bool {
        self.router.detach(id);
        let Some(participant) = self.registry.remove(id) else {
            return false;
        };
        self.router.announce_leave(&self.registry, id);

        info!("User disconnected: {} ({}) ({} online)", id, participant.username, self.registry.len());
        true
    }

    /// Terminate every connection whose outbox overflowed on a membership or
    /// signaling event. Dropping the outbox ends its writer, which closes
    /// the socket.
    fn evict_stalled(&mut self) {
        loop {
            let stalled = self.router.take_stalled();
            if stalled.is_empty() {
                break;
            }
            for id in stalled {
                warn!("Evicting slow consumer {}", id);
                self.terminate(&id);
            }
        }
    }

    /// Drain events until every sender is gone.
    pub async fn run(mut self, mut events: mpsc::Receiver<RelayEvent>) {
        while let Some(event) = events.recv().await {
            self.apply(event, Instant::now());
        }
        debug!("Relay hub stopped with {} participants", self.registry.len());
    }
}
