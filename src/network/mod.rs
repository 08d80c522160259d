//! Network Layer
//!
//! WebSocket transport, wire protocol, routing and the relay hub.
//! All session state lives in the hub; see `lifecycle`.

pub mod config;
pub mod protocol;
pub mod router;
pub mod lifecycle;
pub mod server;

pub use config::{ServerConfig, AllowedOrigin, ConfigError};
pub use protocol::{ClientMessage, ServerMessage, SignalKind, UserMoved};
pub use router::{BroadcastRouter, Outbox};
pub use lifecycle::{Relay, RelayEvent};
pub use server::{RelayServer, RelayError};
