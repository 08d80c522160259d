//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is one JSON text frame: `{"event": "<name>", "data": <payload>}`
//! with the event names the browser front-end already speaks.

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::core::vec3::Vec3;
use crate::presence::participant::{ConnectionId, Participant};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Position report. Kept raw; the guard validates its shape.
    UpdatePosition(Value),

    /// WebRTC offer for another participant.
    Offer(OfferRequest),

    /// WebRTC answer for another participant.
    Answer(AnswerRequest),

    /// ICE candidate for another participant.
    IceCandidate(IceCandidateRequest),
}

/// Offer addressed to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRequest {
    /// Target connection id (as sent by the browser).
    pub target: String,
    /// Opaque session description.
    #[serde(default)]
    pub offer: Value,
}

/// Answer addressed to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// Target connection id.
    pub target: String,
    /// Opaque session description.
    #[serde(default)]
    pub answer: Value,
}

/// ICE candidate addressed to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidateRequest {
    /// Target connection id.
    pub target: String,
    /// Opaque candidate.
    #[serde(default)]
    pub candidate: Value,
}

/// Signaling message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Session offer
    Offer,
    /// Session answer
    Answer,
    /// ICE candidate
    IceCandidate,
}

impl SignalKind {
    /// Wire event name.
    pub fn event_name(self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }

    /// Build the message delivered to the target.
    pub fn into_delivery(self, payload: Value, sender: ConnectionId) -> ServerMessage {
        match self {
            SignalKind::Offer => ServerMessage::Offer(RelayedOffer { offer: payload, sender }),
            SignalKind::Answer => ServerMessage::Answer(RelayedAnswer { answer: payload, sender }),
            SignalKind::IceCandidate => {
                ServerMessage::IceCandidate(RelayedIceCandidate { candidate: payload, sender })
            }
        }
    }
}

/// A decoded signaling request: kind, raw target, opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRequest {
    /// Message kind.
    pub kind: SignalKind,
    /// Target id as sent by the client.
    pub target: String,
    /// Opaque payload.
    pub payload: Value,
}

impl ClientMessage {
    /// Split a signaling message into its routing parts.
    /// Returns `None` for position reports.
    pub fn into_signal(self) -> Option<SignalRequest> {
        let (kind, target, payload) = match self {
            ClientMessage::UpdatePosition(_) => return None,
            ClientMessage::Offer(r) => (SignalKind::Offer, r.target, r.offer),
            ClientMessage::Answer(r) => (SignalKind::Answer, r.target, r.answer),
            ClientMessage::IceCandidate(r) => (SignalKind::IceCandidate, r.target, r.candidate),
        };
        Some(SignalRequest { kind, target, payload })
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// The receiving connection's own record.
    UserData(Participant),

    /// Every other participant at connect time.
    ExistingUsers(Vec<Participant>),

    /// Another participant connected.
    UserJoined(Participant),

    /// Another participant moved.
    UserMoved(UserMoved),

    /// Another participant disconnected (bare id).
    UserLeft(ConnectionId),

    /// Relayed offer.
    Offer(RelayedOffer),

    /// Relayed answer.
    Answer(RelayedAnswer),

    /// Relayed ICE candidate.
    IceCandidate(RelayedIceCandidate),
}

/// Accepted movement of one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMoved {
    /// Who moved.
    pub id: ConnectionId,
    /// Clamped position.
    pub position: Vec3,
}

/// Offer as delivered to its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedOffer {
    /// Opaque session description.
    pub offer: Value,
    /// Originating connection.
    pub sender: ConnectionId,
}

/// Answer as delivered to its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedAnswer {
    /// Opaque session description.
    pub answer: Value,
    /// Originating connection.
    pub sender: ConnectionId,
}

/// ICE candidate as delivered to its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedIceCandidate {
    /// Opaque candidate.
    pub candidate: Value,
    /// Originating connection.
    pub sender: ConnectionId,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether a later message supersedes this one, so it may be dropped
    /// under backpressure.
    pub fn is_disposable(&self) -> bool {
        matches!(self, ServerMessage::UserMoved(_))
    }

    /// Wire event name, for logs.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::UserData(_) => "user-data",
            ServerMessage::ExistingUsers(_) => "existing-users",
            ServerMessage::UserJoined(_) => "user-joined",
            ServerMessage::UserMoved(_) => "user-moved",
            ServerMessage::UserLeft(_) => "user-left",
            ServerMessage::Offer(_) => SignalKind::Offer.event_name(),
            ServerMessage::Answer(_) => SignalKind::Answer.event_name(),
            ServerMessage::IceCandidate(_) => SignalKind::IceCandidate.event_name(),
        }
    }
}
