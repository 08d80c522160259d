//! Broadcast Router
//!
//! Fans presence events out to every other connection and routes signaling
//! point-to-point. Sends never wait. Position updates are disposable: once
//! an outbox is down to its reserved headroom, further `user-moved` events
//! for it are dropped. Membership and signaling events use the headroom; if
//! even that is exhausted the connection is marked stalled and the hub
//! evicts it, so a peer never silently misses a join or leave.

use std::collections::{BTreeMap, BTreeSet};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::core::vec3::Vec3;
use crate::network::protocol::{ServerMessage, SignalKind, UserMoved};
use crate::presence::participant::{ConnectionId, Participant};
use crate::presence::registry::SessionRegistry;

/// Fraction (1/N) of each outbox that position updates may not fill.
const MOVE_HEADROOM_DIVISOR: usize = 8;

/// Outbound queue of one connection.
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Per-connection outboxes plus the routing rules over the registry.
#[derive(Debug, Default)]
pub struct BroadcastRouter {
    outboxes: BTreeMap<ConnectionId, Outbox>,
    stalled: BTreeSet<ConnectionId>,
}

impl BroadcastRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbox of a freshly accepted connection.
    pub fn attach(&mut self, id: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(id, outbox);
    }

    /// Forget a connection's outbox.
    pub fn detach(&mut self, id: &ConnectionId) {
        self.outboxes.remove(id);
        self.stalled.remove(id);
    }

    /// Get attached outbox count.
    pub fn outbox_count(&self) -> usize {
        self.outboxes.len()
    }

    /// Connections whose outbox overflowed on a non-disposable event since
    /// the last call.
    pub fn take_stalled(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.stalled).into_iter().collect()
    }

    /// Queue a message for one connection without waiting.
    /// Returns whether the message was queued.
    pub fn send_to(&mut self, id: &ConnectionId, message: ServerMessage) -> bool {
        let Some(outbox) = self.outboxes.get(id) else {
            return false;
        };

        if message.is_disposable() && outbox.capacity() <= outbox.max_capacity() / MOVE_HEADROOM_DIVISOR {
            debug!("Dropped {} for {}: outbox backlogged", message.event_name(), id.short());
            return false;
        }

        match outbox.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(m)) => {
                warn!("Outbox of {} overflowed on {}, marking stalled", id.short(), m.event_name());
                self.stalled.insert(*id);
                false
            }
            Err(TrySendError::Closed(m)) => {
                debug!("Dropped {} for {}: outbox closed", m.event_name(), id.short());
                false
            }
        }
    }

    /// Send the full record of a new participant to everyone else.
    pub fn announce_join(&mut self, registry: &SessionRegistry, participant: &Participant) {
        self.fan_out(registry, &participant.id, ServerMessage::UserJoined(participant.clone()));
    }

    /// Send an accepted position to everyone else.
    pub fn announce_move(&mut self, registry: &SessionRegistry, id: &ConnectionId, position: Vec3) {
        self.fan_out(registry, id, ServerMessage::UserMoved(UserMoved { id: *id, position }));
    }

    /// Tell everyone else that a participant is gone.
    pub fn announce_leave(&mut self, registry: &SessionRegistry, id: &ConnectionId) {
        self.fan_out(registry, id, ServerMessage::UserLeft(*id));
    }

    /// Deliver a signaling payload to `target` if it is connected.
    ///
    /// Unknown or malformed targets are silently dropped; the return value
    /// is only for logging and tests.
    pub fn relay_signal(
        &mut self,
        registry: &SessionRegistry,
        kind: SignalKind,
        target: &str,
        payload: Value,
        sender: ConnectionId,
    ) -> bool {
        let Some(target_id) = ConnectionId::parse(target) else {
            debug!("Dropped {} from {}: unparseable target", kind.event_name(), sender.short());
            return false;
        };
        if !registry.contains(&target_id) {
            debug!("Dropped {} from {}: target {} not connected", kind.event_name(), sender.short(), target_id.short());
            return false;
        }
        self.send_to(&target_id, kind.into_delivery(payload, sender))
    }

    fn fan_out(&mut self, registry: &SessionRegistry, origin: &ConnectionId, message: ServerMessage) {
        for id in registry.ids_except(origin) {
            self.send_to(&id, message.clone());
        }
    }
}
