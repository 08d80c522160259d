//! # Copresence Relay
//!
//! Real-time state-synchronization server for shared 3D scenes.
//! Tracks connected participants, relays position updates under rate and
//! bounds constraints, and brokers WebRTC signaling between browsers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    COPRESENCE RELAY                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Shared primitives                       │
//! │  └── vec3.rs       - World-space position, clamping          │
//! │                                                              │
//! │  presence/         - Session state (pure, no I/O)            │
//! │  ├── participant.rs- Connection id and participant record    │
//! │  ├── registry.rs   - Session registry                        │
//! │  ├── identity.rs   - Username / color / avatar generation    │
//! │  └── guard.rs      - Update throttle and bounds clamp        │
//! │                                                              │
//! │  network/          - Transport and routing                   │
//! │  ├── protocol.rs   - Message types                           │
//! │  ├── router.rs     - Broadcast and signaling routes          │
//! │  ├── lifecycle.rs  - Relay hub (connection state machine)    │
//! │  ├── config.rs     - Environment configuration               │
//! │  └── server.rs     - WebSocket server                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! A single hub task owns all session state and applies connect, message
//! and disconnect events one at a time. Sends to clients never block the
//! hub: a full or closed outbox simply drops the message.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod presence;
pub mod network;

// Re-export commonly used types
pub use crate::core::vec3::Vec3;
pub use presence::{ConnectionId, Participant, SessionRegistry, RateGuard, GuardConfig};
pub use network::{Relay, RelayServer, ServerConfig, ClientMessage, ServerMessage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
